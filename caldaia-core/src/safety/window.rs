//! Rolling temperature sample window
//!
//! Retains the last 60 seconds of time-stamped readings and classifies
//! short- and long-term rate of change. Rate thresholds are fixed
//! policy, not configuration.

use heapless::Deque;

/// Retention horizon relative to the newest sample
pub const RETENTION_MS: u64 = 60_000;

/// Long-term rate below which the system counts as stable (°C/min)
pub const STABLE_RATE_C_PER_MIN: f32 = 5.0;

/// Epsilon added to rate denominators so two samples sharing a
/// timestamp never divide by zero (seconds)
const RATE_EPSILON_S: f32 = 0.001;

/// Capacity: 60 s of history at the 100 ms control tick, with margin
const SAMPLE_CAPACITY: usize = 640;

/// One time-stamped temperature reading, immutable once recorded
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureSample {
    /// Monotonic timestamp in milliseconds
    pub at_ms: u64,
    /// Reading in °C
    pub celsius: f32,
}

/// Stability classification over the retained history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stability {
    /// Fewer than two samples; callers must not assume either way
    Unknown,
    /// Long-term rate below [`STABLE_RATE_C_PER_MIN`]
    Stable,
    /// Long-term rate at or above [`STABLE_RATE_C_PER_MIN`]
    Unstable,
}

/// Rolling time-stamped history of temperature readings
#[derive(Debug, Default)]
pub struct SampleWindow {
    samples: Deque<TemperatureSample, SAMPLE_CAPACITY>,
    /// Largest timestamp ever recorded; regressing clocks are clamped
    /// to this so the deque stays time-ordered
    newest_ms: u64,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and evict everything older than the retention
    /// horizon relative to the newest timestamp
    pub fn record(&mut self, at_ms: u64, celsius: f32) {
        let at_ms = at_ms.max(self.newest_ms);
        self.newest_ms = at_ms;

        if self.samples.is_full() {
            self.samples.pop_front();
        }
        // Cannot fail: a slot was just freed if the deque was full
        let _ = self.samples.push_back(TemperatureSample { at_ms, celsius });

        while let Some(front) = self.samples.front() {
            if at_ms - front.at_ms > RETENTION_MS {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest retained sample
    pub fn newest(&self) -> Option<&TemperatureSample> {
        self.samples.back()
    }

    /// Oldest retained sample
    pub fn oldest(&self) -> Option<&TemperatureSample> {
        self.samples.front()
    }

    /// Drop all history (e.g. after a probe swap)
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Absolute rate of change across the whole window, in °C/min
    ///
    /// `None` with fewer than two samples: rate unknown, not an error.
    pub fn long_term_rate_c_per_min(&self) -> Option<f32> {
        if self.samples.len() < 2 {
            return None;
        }
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;
        Some(rate_c_per_min(oldest, newest))
    }

    /// Absolute rate of change across the two most recent samples, in °C/min
    pub fn short_term_rate_c_per_min(&self) -> Option<f32> {
        if self.samples.len() < 2 {
            return None;
        }
        let mut iter = self.samples.iter().rev();
        let newest = iter.next()?;
        let previous = iter.next()?;
        Some(rate_c_per_min(previous, newest))
    }

    /// Classify stability from the long-term rate
    pub fn stability(&self) -> Stability {
        match self.long_term_rate_c_per_min() {
            None => Stability::Unknown,
            Some(rate) if rate < STABLE_RATE_C_PER_MIN => Stability::Stable,
            Some(_) => Stability::Unstable,
        }
    }
}

fn rate_c_per_min(earlier: &TemperatureSample, later: &TemperatureSample) -> f32 {
    let dt_s = (later.at_ms - earlier.at_ms) as f32 / 1000.0 + RATE_EPSILON_S;
    libm::fabsf(later.celsius - earlier.celsius) / dt_s * 60.0
}

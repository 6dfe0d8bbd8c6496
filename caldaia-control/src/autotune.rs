//! Relay-feedback autotune
//!
//! Drives the heater with a two-level square wave, measures the induced
//! oscillation, and derives PID gains via the classic Ziegler-Nichols
//! relations. The experiment is a state machine advanced by the control
//! tick, so safety supervision keeps running underneath it.

use core::f32::consts::PI;

use caldaia_core::config::PidGains;

/// Autotune configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutotuneConfig {
    /// Experiment duration in seconds
    pub duration_s: f32,
    /// High relay level as duty percent; the low level is 0
    pub relay_percent: f32,
    /// Minimum time between relay toggles in milliseconds
    pub toggle_interval_ms: u64,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            relay_percent: 20.0,
            toggle_interval_ms: 1000,
        }
    }
}

/// Autotune error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutotuneError {
    /// Fewer than two relay toggles, or no measurable amplitude;
    /// no tuning performed, previous gains untouched
    InsufficientOscillation,
    /// Experiment cancelled (user request or safety trip)
    Cancelled,
}

/// Autotune state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutotuneState {
    /// Not running
    Idle,
    /// Relay experiment in progress
    Running,
    /// Successfully completed, result available
    Complete,
    /// Failed; previous gains untouched
    Failed(AutotuneError),
}

/// Identified plant response and the gains derived from it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutotuneResult {
    /// Ziegler-Nichols classic PID gains
    pub gains: PidGains,
    /// Ultimate gain Ku
    pub ultimate_gain: f32,
    /// Ultimate period Pu in seconds
    pub ultimate_period_s: f32,
    /// Measured oscillation amplitude in °C
    pub amplitude_c: f32,
}

impl AutotuneResult {
    /// Derive a result from a measured oscillation
    ///
    /// `Ku = 4·d / (π·a)`, `Pu = period`, then the classic mapping
    /// `Kp = 0.6·Ku`, `Ki = 1.2·Ku/Pu`, `Kd = 0.075·Ku·Pu`.
    ///
    /// Returns `None` when the amplitude or period is too small to
    /// yield finite gains.
    pub fn derive(relay_percent: f32, amplitude_c: f32, period_s: f32) -> Option<Self> {
        if amplitude_c <= f32::EPSILON || period_s <= f32::EPSILON {
            return None;
        }
        let ku = 4.0 * relay_percent / (PI * amplitude_c);
        let gains = PidGains {
            kp: 0.6 * ku,
            ki: 1.2 * ku / period_s,
            kd: 0.075 * ku * period_s,
        };
        if !gains.is_finite() {
            return None;
        }
        Some(Self {
            gains,
            ultimate_gain: ku,
            ultimate_period_s: period_s,
            amplitude_c,
        })
    }
}

/// Tick-driven relay-feedback autotuner
#[derive(Debug, Clone)]
pub struct RelayAutotuner {
    config: AutotuneConfig,
    state: AutotuneState,
    started_ms: u64,
    /// Relay currently at the high level
    level_high: bool,
    last_toggle_ms: u64,
    first_recorded_toggle_ms: Option<u64>,
    last_recorded_toggle_ms: u64,
    toggle_count: u32,
    min_c: f32,
    max_c: f32,
    sample_count: u32,
    result: Option<AutotuneResult>,
}

impl RelayAutotuner {
    pub fn new(config: AutotuneConfig) -> Self {
        Self {
            config,
            state: AutotuneState::Idle,
            started_ms: 0,
            level_high: false,
            last_toggle_ms: 0,
            first_recorded_toggle_ms: None,
            last_recorded_toggle_ms: 0,
            toggle_count: 0,
            min_c: 0.0,
            max_c: 0.0,
            sample_count: 0,
            result: None,
        }
    }

    pub fn config(&self) -> &AutotuneConfig {
        &self.config
    }

    pub fn state(&self) -> AutotuneState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AutotuneState::Running
    }

    /// Result of the last completed run, kept until the next start
    pub fn result(&self) -> Option<&AutotuneResult> {
        self.result.as_ref()
    }

    /// Number of relay toggles so far
    pub fn toggle_count(&self) -> u32 {
        self.toggle_count
    }

    /// Begin the experiment at the high relay level
    pub fn start(&mut self, now_ms: u64) {
        self.state = AutotuneState::Running;
        self.started_ms = now_ms;
        self.level_high = true;
        self.last_toggle_ms = now_ms;
        self.first_recorded_toggle_ms = None;
        self.last_recorded_toggle_ms = 0;
        self.toggle_count = 0;
        self.min_c = f32::INFINITY;
        self.max_c = f32::NEG_INFINITY;
        self.sample_count = 0;
        self.result = None;
    }

    /// Abort a running experiment; previous gains stay untouched
    pub fn cancel(&mut self) {
        if self.is_running() {
            self.state = AutotuneState::Failed(AutotuneError::Cancelled);
        }
    }

    /// Advance the experiment by one control tick
    ///
    /// Records the measurement, toggles the relay when due, and closes
    /// the experiment once the duration has elapsed. Returns the duty
    /// level to drive while running, `None` otherwise.
    pub fn tick(&mut self, now_ms: u64, measured_c: f32) -> Option<f32> {
        if !self.is_running() {
            return None;
        }

        self.min_c = self.min_c.min(measured_c);
        self.max_c = self.max_c.max(measured_c);
        self.sample_count += 1;

        let duration_ms = (self.config.duration_s * 1000.0) as u64;
        if now_ms.saturating_sub(self.started_ms) >= duration_ms {
            self.finish();
            return None;
        }

        if now_ms.saturating_sub(self.last_toggle_ms) > self.config.toggle_interval_ms {
            self.level_high = !self.level_high;
            self.last_toggle_ms = now_ms;
            if self.first_recorded_toggle_ms.is_none() {
                self.first_recorded_toggle_ms = Some(now_ms);
            }
            self.last_recorded_toggle_ms = now_ms;
            self.toggle_count += 1;
        }

        Some(if self.level_high {
            self.config.relay_percent
        } else {
            0.0
        })
    }

    fn finish(&mut self) {
        let first = match self.first_recorded_toggle_ms {
            Some(first) if self.toggle_count >= 2 => first,
            _ => {
                self.state = AutotuneState::Failed(AutotuneError::InsufficientOscillation);
                return;
            }
        };

        let span_ms = self.last_recorded_toggle_ms - first;
        let period_s = span_ms as f32 / 1000.0 / (self.toggle_count - 1) as f32;
        let amplitude = (self.max_c - self.min_c) / 2.0;

        match AutotuneResult::derive(self.config.relay_percent, amplitude, period_s) {
            Some(result) => {
                self.result = Some(result);
                self.state = AutotuneState::Complete;
            }
            None => {
                self.state = AutotuneState::Failed(AutotuneError::InsufficientOscillation);
            }
        }
    }
}

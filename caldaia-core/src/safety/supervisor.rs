//! Safety supervisor
//!
//! Evaluated once per control tick while the heater is enabled. The
//! first rule that fires forces the heater off and is terminal for
//! that tick.

use libm::fabsf;

use super::window::{SampleWindow, Stability};
use crate::config::SafetyPolicy;

/// Short-term rate above which a previously-unstable system counts as
/// running away (°C/min)
pub const RUNAWAY_RATE_C_PER_MIN: f32 = 10.0;

/// Why the supervisor forced the heater off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TripReason {
    /// Reading below the minimum plausible boiler temperature
    BelowMinimum,
    /// Short-term rate exceeded the runaway threshold while unstable
    ThermalRunaway,
    /// No activity for longer than the configured timeout
    InactivityTimeout,
    /// Auxiliary probe deviates too far from the primary
    ProbeDivergence,
    /// Primary sensor unreadable while heating
    SensorFault,
}

/// Outcome of a supervision pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// Heater must be disabled
    Trip(TripReason),
}

/// Per-tick safety rule evaluation
///
/// Holds only the policy; all measured state is passed in so the
/// supervisor itself stays stateless and trivially testable.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    policy: SafetyPolicy,
}

impl SafetySupervisor {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Replace the whole policy atomically
    pub fn set_policy(&mut self, policy: SafetyPolicy) {
        self.policy = policy;
    }

    /// Evaluate all rules in priority order
    ///
    /// # Arguments
    /// - `now_ms`: monotonic time of this tick
    /// - `temp_c`: current primary reading
    /// - `window`: sample history including `temp_c`
    /// - `enabled_since_ms`: timestamp of the last enable transition
    /// - `aux_temp_c`: latest auxiliary probe reading, if any
    pub fn check(
        &self,
        now_ms: u64,
        temp_c: f32,
        window: &SampleWindow,
        enabled_since_ms: u64,
        aux_temp_c: Option<f32>,
    ) -> SafetyStatus {
        // 1. Minimum bound: below this the probe is detached or the
        //    boiler is dry; heating blind is never safe.
        if temp_c < self.policy.min_temp_c {
            return SafetyStatus::Trip(TripReason::BelowMinimum);
        }

        // 2. Runaway rate: only meaningful once the window can classify
        //    stability at all.
        if window.stability() == Stability::Unstable {
            if let Some(rate) = window.short_term_rate_c_per_min() {
                if rate > RUNAWAY_RATE_C_PER_MIN {
                    return SafetyStatus::Trip(TripReason::ThermalRunaway);
                }
            }
        }

        // 3. Inactivity timeout
        if self.policy.timeout_min > 0 {
            let limit_ms = self.policy.timeout_min as u64 * 60_000;
            if now_ms.saturating_sub(enabled_since_ms) > limit_ms {
                return SafetyStatus::Trip(TripReason::InactivityTimeout);
            }
        }

        // 4. Auxiliary probe deviation
        if self.policy.use_second_probe {
            if let Some(aux) = aux_temp_c {
                if fabsf(temp_c - aux) > self.policy.max_probe_delta_c {
                    return SafetyStatus::Trip(TripReason::ProbeDivergence);
                }
            }
        }

        SafetyStatus::Ok
    }
}

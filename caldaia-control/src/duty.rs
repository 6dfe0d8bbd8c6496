//! Duty-cycle realization
//!
//! Converts a commanded duty percentage into physical actuation. The
//! slow time-proportioning strategy is a state machine advanced by the
//! control tick; it never sleeps, so safety checks keep running while
//! a cycle plays out.

use caldaia_core::config::{ActuatorConfig, PwmStrategy};
use caldaia_core::traits::DutyOutput;

use crate::pid::{DUTY_MAX, DUTY_MIN};

/// Tick-driven duty cycler
///
/// For `Continuous`, every command is forwarded to the output
/// immediately. For `SlowProportioning`, the command latched at a cycle
/// boundary determines the on-phase length for the whole period; new
/// commands are accepted only when the next cycle starts.
#[derive(Debug, Clone)]
pub struct DutyCycler {
    config: ActuatorConfig,
    /// Duty latched for the running cycle
    latched: f32,
    cycle_start_ms: Option<u64>,
    on_ms: u64,
}

impl DutyCycler {
    pub fn new(config: ActuatorConfig) -> Self {
        Self {
            config,
            latched: 0.0,
            cycle_start_ms: None,
            on_ms: 0,
        }
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    /// Replace the actuator configuration atomically
    ///
    /// The running slow-PWM cycle is abandoned; the next apply starts
    /// a fresh cycle under the new configuration.
    pub fn set_config(&mut self, config: ActuatorConfig) {
        self.config = config;
        self.reset();
    }

    /// Duty latched for the cycle currently playing out
    pub fn latched_duty(&self) -> f32 {
        self.latched
    }

    /// Abandon the current cycle and force the output off
    pub fn reset_with<O: DutyOutput>(&mut self, out: &mut O) {
        self.reset();
        out.set_duty(0.0);
    }

    fn reset(&mut self) {
        self.latched = 0.0;
        self.cycle_start_ms = None;
        self.on_ms = 0;
    }

    /// Drive the output for this tick
    ///
    /// `duty_percent` outside [0, 100] is clamped silently.
    pub fn apply<O: DutyOutput>(&mut self, now_ms: u64, duty_percent: f32, out: &mut O) {
        let duty = duty_percent.clamp(DUTY_MIN, DUTY_MAX);

        match self.config.strategy {
            PwmStrategy::Continuous => {
                self.latched = duty;
                out.set_duty(duty);
            }
            PwmStrategy::SlowProportioning => {
                let period_ms = self.config.period_ms();
                let start_new_cycle = match self.cycle_start_ms {
                    None => true,
                    Some(start) => now_ms.saturating_sub(start) >= period_ms,
                };
                if start_new_cycle {
                    self.cycle_start_ms = Some(now_ms);
                    self.latched = duty;
                    self.on_ms = (period_ms as f32 * duty / 100.0) as u64;
                }
                // Within the cycle the output is fully on, then fully off
                let elapsed = now_ms.saturating_sub(self.cycle_start_ms.unwrap_or(now_ms));
                if elapsed < self.on_ms {
                    out.set_duty(100.0);
                } else {
                    out.set_duty(0.0);
                }
            }
        }
    }
}

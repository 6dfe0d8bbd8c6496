//! PID controller
//!
//! Computes a duty-percent command from setpoint and measurement.
//! Controller state is never reset implicitly; [`PidController::reset`]
//! must be called explicitly (the control loop does so on re-enable).

use caldaia_core::config::PidGains;

/// Lower output clamp (duty percent)
pub const DUTY_MIN: f32 = 0.0;

/// Upper output clamp (duty percent)
pub const DUTY_MAX: f32 = 100.0;

/// Proportional-integral-derivative controller with output clamping
/// and conditional-integration anti-windup
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    setpoint_c: f32,
    integral: f32,
    last_error: f32,
    last_update_ms: Option<u64>,
    last_output: f32,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            setpoint_c: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_update_ms: None,
            last_output: 0.0,
        }
    }

    /// Replace the gains atomically
    ///
    /// Takes effect on the next update with no smoothing. Accumulated
    /// state is kept; call [`reset`](Self::reset) as well if the new
    /// gains make the old integral meaningless.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Change the target temperature; effective on the next update
    pub fn set_setpoint(&mut self, setpoint_c: f32) {
        self.setpoint_c = setpoint_c;
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint_c
    }

    /// Most recent clamped output
    pub fn output(&self) -> f32 {
        self.last_output
    }

    /// Clear the integral accumulator, derivative history and timing
    ///
    /// Equivalent to constructing a fresh controller with the same
    /// gains and setpoint.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_update_ms = None;
        self.last_output = 0.0;
    }

    /// Run one control step
    ///
    /// Returns the clamped duty command, or `None` for a stale tick
    /// (`dt <= 0`), in which case no state is mutated. The first update
    /// after construction or reset has no usable `dt` and produces a
    /// proportional-only output.
    pub fn update(&mut self, now_ms: u64, measured_c: f32) -> Option<f32> {
        let dt_s = match self.last_update_ms {
            None => 0.0,
            Some(last_ms) => {
                if now_ms <= last_ms {
                    // Duplicate or reordered tick
                    return None;
                }
                (now_ms - last_ms) as f32 / 1000.0
            }
        };

        let error = self.setpoint_c - measured_c;
        let accumulated = self.integral + error * dt_s;
        let derivative = if dt_s > 0.0 {
            (error - self.last_error) / dt_s
        } else {
            0.0
        };

        let raw = self.gains.kp * error + self.gains.ki * accumulated + self.gains.kd * derivative;

        // Conditional integration: freeze the accumulator while the
        // output is pinned and the error would push it further out.
        let pushing_high = raw > DUTY_MAX && error > 0.0;
        let pushing_low = raw < DUTY_MIN && error < 0.0;
        if !(pushing_high || pushing_low) {
            self.integral = accumulated;
        }

        self.last_error = error;
        self.last_update_ms = Some(now_ms);
        self.last_output = raw.clamp(DUTY_MIN, DUTY_MAX);
        Some(self.last_output)
    }
}

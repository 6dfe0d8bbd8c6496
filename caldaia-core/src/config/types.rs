//! Configuration type definitions
//!
//! These types represent the persisted machine configuration. Updates
//! are applied by replacing whole structs, never field-by-field, so a
//! control tick can never observe a torn edit.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// PID gains
///
/// Shared between the controller and the persistence collaborator.
/// No sign constraint is enforced; negative gains are a configuration
/// mistake but not structurally invalid. All values must be finite.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.5,
            kd: 0.1,
        }
    }
}

impl PidGains {
    /// Check that every gain is a finite number
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }

    /// Check if any gain is non-zero
    pub fn is_configured(&self) -> bool {
        self.kp != 0.0 || self.ki != 0.0 || self.kd != 0.0
    }
}

/// Duty-cycle realization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PwmStrategy {
    /// Fixed carrier-frequency duty output (MOSFET/triac drive)
    Continuous,
    /// Slow time-proportioning over a multi-second period (relay/SSR drive)
    #[default]
    SlowProportioning,
}

/// Actuator configuration, fixed for the actuator's lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActuatorConfig {
    /// Output strategy
    pub strategy: PwmStrategy,
    /// Slow-proportioning cycle period in seconds
    pub period_s: f32,
    /// Carrier frequency in Hz for the continuous strategy
    pub carrier_hz: u32,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            strategy: PwmStrategy::SlowProportioning,
            period_s: 2.0,
            carrier_hz: 1000,
        }
    }
}

impl ActuatorConfig {
    /// Cycle period in whole milliseconds (minimum 1 ms)
    pub fn period_ms(&self) -> u64 {
        let ms = self.period_s * 1000.0;
        if ms < 1.0 {
            1
        } else {
            ms as u64
        }
    }
}

/// Safety supervision policy, read-only during a control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SafetyPolicy {
    /// Minimum plausible boiler temperature (°C); readings below this
    /// while heating indicate a detached or failed probe
    pub min_temp_c: f32,
    /// Maximum selectable target temperature (°C)
    pub max_temp_c: f32,
    /// Inactivity timeout in minutes; 0 disables the timeout
    pub timeout_min: u16,
    /// Compare the auxiliary probe against the primary each tick
    pub use_second_probe: bool,
    /// Maximum tolerated deviation between the probes (°C)
    pub max_probe_delta_c: f32,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            min_temp_c: 20.0,
            max_temp_c: 150.0,
            timeout_min: 0,
            use_second_probe: false,
            max_probe_delta_c: 5.0,
        }
    }
}

/// Complete boiler configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoilerConfig {
    /// PID gains
    pub gains: PidGains,
    /// Safety policy
    pub safety: SafetyPolicy,
    /// Actuator configuration
    pub actuator: ActuatorConfig,
    /// Quick-preset target: brew (°C)
    pub preset_low_c: f32,
    /// Quick-preset target: steam (°C)
    pub preset_high_c: f32,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self::factory()
    }
}

impl BoilerConfig {
    /// Boot-time defaults matching the factory configuration document
    pub fn factory() -> Self {
        Self {
            gains: PidGains::default(),
            safety: SafetyPolicy::default(),
            actuator: ActuatorConfig::default(),
            preset_low_c: 40.0,
            preset_high_c: 80.0,
        }
    }

    /// Check structural invariants
    ///
    /// Gains must be finite and the temperature bounds ordered. A config
    /// failing this check must not be applied to a live controller.
    pub fn is_valid(&self) -> bool {
        self.gains.is_finite()
            && self.safety.min_temp_c < self.safety.max_temp_c
            && self.safety.max_probe_delta_c >= 0.0
            && self.actuator.period_s > 0.0
    }

    /// Clamp a requested setpoint to the configured temperature range
    pub fn clamp_setpoint(&self, target_c: f32) -> f32 {
        target_c.clamp(self.safety.min_temp_c, self.safety.max_temp_c)
    }
}

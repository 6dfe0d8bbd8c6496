//! Editable settings model
//!
//! Each user-editable configuration field is an explicit enum variant
//! carrying its own step size, validation and apply logic. The menu
//! adapter iterates [`Setting::ALL`] and calls [`Setting::adjust`] on
//! encoder turns; it never indexes into an implicit value list.

use super::types::BoilerConfig;

/// Smallest representable gain step on the encoder
const GAIN_STEP: f32 = 0.1;

/// Temperature step in °C
const TEMP_STEP: f32 = 1.0;

/// A single editable configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    MinTemp,
    MaxTemp,
    Kp,
    Ki,
    Kd,
    TimeoutMinutes,
    UseSecondProbe,
    MaxProbeDelta,
    SlowPwm,
    PresetLow,
    PresetHigh,
}

/// Current value of a setting, typed for display formatting
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingValue {
    /// Temperature in °C
    Celsius(f32),
    /// Dimensionless PID gain
    Gain(f32),
    /// Whole minutes
    Minutes(u16),
    /// On/off flag
    Flag(bool),
}

impl Setting {
    /// Every editable setting, in menu order
    pub const ALL: &'static [Setting] = &[
        Setting::MinTemp,
        Setting::MaxTemp,
        Setting::Kp,
        Setting::Ki,
        Setting::Kd,
        Setting::TimeoutMinutes,
        Setting::UseSecondProbe,
        Setting::MaxProbeDelta,
        Setting::SlowPwm,
        Setting::PresetLow,
        Setting::PresetHigh,
    ];

    /// Menu label
    pub fn label(&self) -> &'static str {
        match self {
            Setting::MinTemp => "Min Temp",
            Setting::MaxTemp => "Max Temp",
            Setting::Kp => "Kp",
            Setting::Ki => "Ki",
            Setting::Kd => "Kd",
            Setting::TimeoutMinutes => "Timeout",
            Setting::UseSecondProbe => "2nd Probe",
            Setting::MaxProbeDelta => "Probe Delta",
            Setting::SlowPwm => "Slow PWM",
            Setting::PresetLow => "Brew Preset",
            Setting::PresetHigh => "Steam Preset",
        }
    }

    /// Read the current value out of a config
    pub fn value(&self, config: &BoilerConfig) -> SettingValue {
        use super::types::PwmStrategy;
        match self {
            Setting::MinTemp => SettingValue::Celsius(config.safety.min_temp_c),
            Setting::MaxTemp => SettingValue::Celsius(config.safety.max_temp_c),
            Setting::Kp => SettingValue::Gain(config.gains.kp),
            Setting::Ki => SettingValue::Gain(config.gains.ki),
            Setting::Kd => SettingValue::Gain(config.gains.kd),
            Setting::TimeoutMinutes => SettingValue::Minutes(config.safety.timeout_min),
            Setting::UseSecondProbe => SettingValue::Flag(config.safety.use_second_probe),
            Setting::MaxProbeDelta => SettingValue::Celsius(config.safety.max_probe_delta_c),
            Setting::SlowPwm => SettingValue::Flag(
                config.actuator.strategy == PwmStrategy::SlowProportioning,
            ),
            Setting::PresetLow => SettingValue::Celsius(config.preset_low_c),
            Setting::PresetHigh => SettingValue::Celsius(config.preset_high_c),
        }
    }

    /// Apply `steps` encoder detents to this setting
    ///
    /// Each variant validates its own range; the temperature bounds can
    /// never cross and counters never go negative. Flag settings toggle
    /// on any non-zero step count.
    pub fn adjust(&self, config: &mut BoilerConfig, steps: i32) {
        use super::types::PwmStrategy;
        let delta = steps as f32;
        match self {
            Setting::MinTemp => {
                let next = config.safety.min_temp_c + delta * TEMP_STEP;
                // Keep at least one degree of usable range
                config.safety.min_temp_c = next.clamp(0.0, config.safety.max_temp_c - TEMP_STEP);
            }
            Setting::MaxTemp => {
                let next = config.safety.max_temp_c + delta * TEMP_STEP;
                config.safety.max_temp_c = next.max(config.safety.min_temp_c + TEMP_STEP);
            }
            Setting::Kp => config.gains.kp += delta * GAIN_STEP,
            Setting::Ki => config.gains.ki += delta * GAIN_STEP,
            Setting::Kd => config.gains.kd += delta * GAIN_STEP,
            Setting::TimeoutMinutes => {
                config.safety.timeout_min = (config.safety.timeout_min as i32 + steps).max(0) as u16;
            }
            Setting::UseSecondProbe => {
                if steps != 0 {
                    config.safety.use_second_probe = !config.safety.use_second_probe;
                }
            }
            Setting::MaxProbeDelta => {
                let next = config.safety.max_probe_delta_c + delta * TEMP_STEP;
                config.safety.max_probe_delta_c = next.max(0.0);
            }
            Setting::SlowPwm => {
                if steps != 0 {
                    config.actuator.strategy = match config.actuator.strategy {
                        PwmStrategy::SlowProportioning => PwmStrategy::Continuous,
                        PwmStrategy::Continuous => PwmStrategy::SlowProportioning,
                    };
                }
            }
            Setting::PresetLow => {
                let next = config.preset_low_c + delta * TEMP_STEP;
                config.preset_low_c = next.clamp(config.safety.min_temp_c, config.safety.max_temp_c);
            }
            Setting::PresetHigh => {
                let next = config.preset_high_c + delta * TEMP_STEP;
                config.preset_high_c =
                    next.clamp(config.safety.min_temp_c, config.safety.max_temp_c);
            }
        }
        debug_assert!(config.is_valid());
    }
}

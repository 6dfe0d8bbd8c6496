//! Heater output and temperature sensor traits

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor disconnected (open circuit)
    OpenCircuit,
    /// Sensor shorted to ground
    ShortCircuit,
    /// Reading out of expected range
    OutOfRange,
    /// ADC conversion error
    ConversionError,
}

/// Trait for temperature sensors
///
/// Implementations handle the specific probe type (NTC thermistor,
/// thermocouple, PT100, etc.) including voltage-to-temperature
/// conversion; the control core only ever sees degrees Celsius.
pub trait TemperatureSensor {
    /// Read the current temperature in degrees Celsius
    ///
    /// Takes `&mut self` because ADC reads typically require mutable access.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;

    /// Check if the sensor reading is valid
    fn is_valid(&mut self) -> bool {
        self.read_celsius().is_ok()
    }
}

/// Trait for the modulated heater output
///
/// Implementations drive the heating element via a carrier-frequency
/// PWM pin or a solid-state relay. The commanded duty is a percentage
/// in [0, 100]; implementations may quantize it but must treat 0 as
/// fully off and 100 as fully on.
pub trait DutyOutput {
    /// Set the output duty cycle as a percentage (0-100)
    fn set_duty(&mut self, percent: f32);

    /// Get the most recently commanded duty percentage
    fn duty(&self) -> f32;
}

/// Trait for the heater enable relay
///
/// Some machines gate the heating element behind a mechanical relay in
/// addition to the modulated output. The relay is only switched on
/// heater Enabled/Disabled transitions, never per tick.
pub trait HeaterOutput {
    /// Close or open the relay
    fn set_on(&mut self, on: bool);

    /// Check if the relay is currently closed
    fn is_on(&self) -> bool;
}

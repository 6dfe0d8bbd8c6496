//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic and
//! hardware-specific implementations.

pub mod heater;

pub use heater::{DutyOutput, HeaterOutput, SensorError, TemperatureSensor};

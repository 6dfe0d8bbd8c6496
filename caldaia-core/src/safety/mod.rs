//! Safety monitoring
//!
//! Rolling temperature history plus the supervisor that decides when
//! the heater must be forced off.

pub mod supervisor;
pub mod window;

pub use supervisor::{SafetyStatus, SafetySupervisor, TripReason, RUNAWAY_RATE_C_PER_MIN};
pub use window::{SampleWindow, Stability, TemperatureSample, STABLE_RATE_C_PER_MIN};

//! Board-agnostic thermal control core for the Caldaia boiler controller
//!
//! This crate contains all control-loop logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (temperature sensor, duty output, relay)
//! - Configuration type definitions and the editable-settings model
//! - Rolling temperature history and rate-of-change classification
//! - Safety supervision (bounds, runaway rate, inactivity timeout)
//! - Heater enable/disable state

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod safety;
pub mod state;
pub mod traits;

//! Control strategy implementations for the Caldaia boiler controller
//!
//! This crate provides the concrete control machinery behind the traits
//! defined in caldaia-core:
//!
//! - PID controller with bounded integral windup
//! - Duty-cycle realization (continuous carrier or slow time-proportioning)
//! - Relay-feedback autotuner (Ziegler-Nichols)
//! - embedded-hal output adapters
//! - The per-tick control loop orchestrator

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod autotune;
pub mod boiler;
pub mod duty;
pub mod output;
pub mod pid;

pub use autotune::{AutotuneConfig, AutotuneError, AutotuneResult, AutotuneState, RelayAutotuner};
pub use boiler::{BoilerController, BoilerStatus};
pub use duty::DutyCycler;
pub use pid::PidController;

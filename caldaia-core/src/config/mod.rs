//! Configuration types
//!
//! Board-agnostic configuration structures. The persistence collaborator
//! stores them as postcard binary data; the core never performs file I/O.

pub mod settings;
pub mod types;

pub use settings::{Setting, SettingValue};
pub use types::*;

//! Heater enable state
//!
//! The only two states the heater can be in. Relay/output-enable side
//! effects happen exclusively on transitions between them.

/// Heater state with the activation timestamp needed by the
/// inactivity-timeout rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaterState {
    /// Output forced off; requires an explicit enable request to leave
    #[default]
    Disabled,
    /// Closed-loop regulation active since `since_ms`
    Enabled {
        /// Monotonic time of the enable transition
        since_ms: u64,
    },
}

impl HeaterState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, HeaterState::Enabled { .. })
    }

    /// Timestamp of the last enable transition, if enabled
    pub fn enabled_since_ms(&self) -> Option<u64> {
        match self {
            HeaterState::Disabled => None,
            HeaterState::Enabled { since_ms } => Some(*since_ms),
        }
    }
}

//! Device state snapshot types
//!
//! The controller is the only writer of `DeviceState`; observers receive
//! cloned snapshots through change notifications.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a controlled device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// Device is not reachable (initial state, or after connection loss)
    #[default]
    Unavailable,
    /// Device is connected and accepting commands
    On,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Unavailable"),
            Self::On => write!(f, "On"),
        }
    }
}

/// Aggregate device state emitted to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Lifecycle state
    pub power: PowerState,
    /// Last source selected through the controller, if any
    pub current_source: Option<String>,
    /// Human-readable headline ("Ready", "Connection Error", "Connection Lost")
    pub title: String,
    /// Human-readable detail line
    pub subtitle: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: PowerState::Unavailable,
            current_source: None,
            title: "Ready".to_string(),
            subtitle: String::new(),
        }
    }
}

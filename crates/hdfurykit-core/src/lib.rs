//! # HDFuryKit Core
//!
//! Core types, errors, and traits for HDFuryKit.
//! Provides the fundamental abstractions shared by the communication layer
//! and hosting integrations: the error taxonomy, caller-facing status
//! codes, device state snapshots, and the listener interface.

pub mod error;
pub mod listener;
pub mod state;
pub mod status;

pub use error::{ConnectionError, Error, Result, SessionError};
pub use listener::{DeviceListener, DeviceListenerHandle};
pub use state::{DeviceState, PowerState};
pub use status::StatusCode;

//! Status codes returned to the hosting integration layer
//!
//! Command failures never cross the controller boundary as raw errors;
//! they are folded into one of these codes.

use serde::{Deserialize, Serialize};

/// Result of a caller-facing command execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Command completed successfully
    Ok,
    /// Request was malformed (e.g. missing the command payload)
    BadRequest,
    /// Command identifier is not part of the grammar
    NotImplemented,
    /// Command failed on the device or timed out
    ServerError,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::BadRequest => write!(f, "Bad Request"),
            Self::NotImplemented => write!(f, "Not Implemented"),
            Self::ServerError => write!(f, "Server Error"),
        }
    }
}

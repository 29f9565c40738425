//! Error handling for HDFuryKit
//!
//! Provides error types for the two layers of the adapter:
//! - Connection errors (socket open/close, link loss)
//! - Session errors (command exchange, response framing)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to the TCP link to an HDFury unit.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Session is not connected
    #[error("Session not connected")]
    NotConnected,

    /// Connect attempt exceeded its budget
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Failed to open the socket
    #[error("Failed to connect to {host}:{port}: {reason}")]
    FailedToConnect {
        /// The device hostname or IP.
        host: String,
        /// The device port.
        port: u16,
        /// The reason the connect failed.
        reason: String,
    },

    /// Connection dropped mid-exchange
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },
}

/// Session error type
///
/// Represents errors in the command/response exchange with an HDFury unit.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// No response arrived within the per-command budget
    #[error("Command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout {
        /// The command that timed out.
        command: String,
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Response framing was not what the line protocol promises
    #[error("Protocol error: {reason}")]
    Protocol {
        /// The reason the response could not be used.
        reason: String,
    },
}

/// Main error type for HDFuryKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError::ConnectTimeout { .. })
                | Error::Session(SessionError::CommandTimeout { .. })
        )
    }

    /// Check if this is a connection-class error
    ///
    /// Raw I/O errors count as connection-class: resets and broken pipes
    /// surface through `std::io::Error` on the stream.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classification() {
        let e: Error = SessionError::CommandTimeout {
            command: "get ver".to_string(),
            timeout_ms: 5000,
        }
        .into();
        assert!(e.is_timeout());
        assert!(!e.is_connection_error());

        let e: Error = ConnectionError::ConnectTimeout { timeout_ms: 10000 }.into();
        assert!(e.is_timeout());
        assert!(e.is_connection_error());
    }

    #[test]
    fn protocol_errors_are_not_retryable() {
        let e: Error = SessionError::Protocol {
            reason: "unexpected framing".to_string(),
        }
        .into();
        assert!(!e.is_timeout());
        assert!(!e.is_connection_error());
    }

    #[test]
    fn io_errors_are_connection_class() {
        let e: Error = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(e.is_connection_error());
        assert!(!e.is_timeout());
    }
}

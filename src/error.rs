//! Error types for the socket session layer.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use socket_session::{CommandId, Result};
//!
//! fn login(session: &mut Session<WebSocketTransport, JsonCodec>) -> Result<()> {
//!     session.send(CommandId::new(1001), "GetUserInfo", json!({}), false)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Argument | [`Error::Config`], [`Error::InvalidArgument`] |
//! | State | [`Error::InvalidState`], [`Error::NotConnected`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Codec | [`Error::Codec`], [`Error::Json`] |
//! | Callback | [`Error::Callback`] |
//! | External | [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;
use crate::session::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session or connect options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    ///
    /// Returned when a timer or listener registration is rejected.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Operation not legal in the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: ConnectionState,
    },

    /// The transport has no open socket.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be opened.
    ///
    /// Returned when the transport fails synchronously on open.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Encoding or decoding a message failed.
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// No message name is known for an inbound command.
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// The unrecognized command id.
        command: CommandId,
    },

    // ========================================================================
    // Callback Errors
    // ========================================================================
    /// A timer callback or listener reported a failure.
    #[error("Callback failed: {message}")]
    Callback {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(operation: &'static str, state: ConnectionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    #[inline]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(command: CommandId) -> Self {
        Self::UnknownCommand { command }
    }

    /// Creates a callback error.
    #[inline]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is an encode/decode error.
    #[inline]
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Self::Codec { .. } | Self::UnknownCommand { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if the operation was rejected without side effects.
    ///
    /// Rejected operations may succeed once the session reaches another state.
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::InvalidState { .. } | Self::NotConnected
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::invalid_state("connect", ConnectionState::Working);
        assert_eq!(err.to_string(), "Cannot connect while working");
    }

    #[test]
    fn test_unknown_command_display() {
        let err = Error::unknown_command(CommandId::new(1001));
        assert_eq!(err.to_string(), "Unknown command: 1001");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(!Error::codec("x").is_connection_error());
    }

    #[test]
    fn test_is_codec_error() {
        assert!(Error::codec("bad frame").is_codec_error());
        assert!(Error::unknown_command(CommandId::new(7)).is_codec_error());
        assert!(!Error::config("x").is_codec_error());
    }

    #[test]
    fn test_is_rejected() {
        assert!(Error::invalid_argument("interval").is_rejected());
        assert!(Error::invalid_state("send", ConnectionState::Closed).is_rejected());
        assert!(!Error::ConnectionClosed.is_rejected());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}

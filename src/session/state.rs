//! Connection state of a session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Session`](crate::Session).
///
/// ```text
/// Closed ──connect──► Connecting ──opened──► Working
///   ▲                     │  ▲                  │
///   └──── closed, ────────┘  └──── closed, ─────┘
///       no budget              budget remains
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket. Initial state.
    #[default]
    Closed,
    /// Opening a socket or waiting to reconnect. Sends are buffered.
    Connecting,
    /// Socket open. Sends go out immediately.
    Working,
}

impl ConnectionState {
    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Working => "working",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_closed() {
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Working.to_string(), "working");
    }
}

//! Inbox messages of a session.

// ============================================================================
// Imports
// ============================================================================

use crate::transport::TransportEvent;

// ============================================================================
// SessionTimer
// ============================================================================

/// Timers a session arms on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionTimer {
    /// Idle period elapsed, send a heartbeat.
    Heartbeat,
    /// Silence window elapsed, presume the socket dead.
    ReceiveTimeout,
    /// Reconnect delay elapsed.
    Reconnect,
}

// ============================================================================
// Signal
// ============================================================================

/// Everything that reaches a session from outside a method call.
///
/// Drained by [`Session::poll`](crate::Session::poll).
#[derive(Debug)]
pub(crate) enum Signal {
    /// Event from the transport.
    Transport(TransportEvent),
    /// A session timer fired. `epoch` identifies the arming it belongs to.
    Timer { kind: SessionTimer, epoch: u64 },
}

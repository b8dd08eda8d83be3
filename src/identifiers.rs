//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing timer ids, request ids, command ids and
//! listener targets at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerId
// ============================================================================

/// Process-wide counter backing [`TimerId::next`].
static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a timer registered with a [`TimerScheduler`](crate::TimerScheduler).
///
/// Ids are unique for the lifetime of the process and never reused, even
/// across schedulers or after [`clear`](crate::TimerScheduler::clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Allocates the next timer id.
    #[inline]
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Request id stamped on every outgoing envelope.
///
/// Allocated per session, monotonically increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the id following this one.
    #[inline]
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CommandId
// ============================================================================

/// Numeric protocol command.
///
/// A request and its response share the same command id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u32);

impl CommandId {
    /// Creates a command id.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for CommandId {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TargetId
// ============================================================================

/// Owner identity of a push listener.
///
/// At most one listener exists per `(CommandId, TargetId)` pair.
/// [`TargetId::default`] is the anonymous target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Creates a target id.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_ids_are_monotonic() {
        let a = TimerId::next();
        let b = TimerId::next();
        assert!(b > a);
    }

    #[test]
    fn test_request_id_successor() {
        let id = RequestId::new(41);
        assert_eq!(id.successor(), RequestId::new(42));
        assert_eq!(RequestId::new(u64::MAX).successor(), RequestId::new(0));
    }

    #[test]
    fn test_command_id_serde_transparent() {
        let json = serde_json::to_string(&CommandId::new(1001)).unwrap();
        assert_eq!(json, "1001");
    }

    #[test]
    fn test_display() {
        assert_eq!(CommandId::new(7).to_string(), "7");
        assert_eq!(TargetId::new(3).to_string(), "3");
        assert_eq!(TargetId::default().as_u64(), 0);
    }
}

//! Session, connect and request options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use socket_session::{ConnectOptions, FrameKind, ReconnectBudget, SessionConfig};
//!
//! let config = SessionConfig::new()
//!     .with_heartbeat_interval(Duration::from_secs(5))
//!     .with_receive_timeout(Duration::from_secs(30));
//!
//! let options = ConnectOptions::new()
//!     .with_frame_kind(FrameKind::Text)
//!     .with_open_timeout(Duration::from_secs(10))
//!     .with_auto_reconnect(ReconnectBudget::Limited(3));
//! ```
//!
//! Both structs deserialize from host configuration files; durations are
//! given in milliseconds:
//!
//! ```json
//! { "heartbeat_interval_ms": 3000, "receive_timeout_ms": 6000000 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default delay between heartbeats while the connection is idle.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default silence window after which the connection is presumed dead.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(6_000_000);

/// Default delay before an automatic reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

// ============================================================================
// Serde Helpers
// ============================================================================

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn optional_millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Timing configuration of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time before a heartbeat is sent.
    #[serde(rename = "heartbeat_interval_ms", deserialize_with = "millis")]
    pub heartbeat_interval: Duration,

    /// Silence window before the socket is force-closed.
    #[serde(rename = "receive_timeout_ms", deserialize_with = "millis")]
    pub receive_timeout: Duration,

    /// Delay before each automatic reconnect attempt.
    #[serde(rename = "reconnect_delay_ms", deserialize_with = "millis")]
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Creates a configuration with default timings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the receive timeout.
    #[inline]
    #[must_use]
    pub const fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Checks that every duration is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first zero duration.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("heartbeat interval", self.heartbeat_interval),
            ("receive timeout", self.receive_timeout),
            ("reconnect delay", self.reconnect_delay),
        ];
        for (name, value) in fields {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// FrameKind
// ============================================================================

/// WebSocket frame type used for outgoing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// UTF-8 text frames.
    Text,
    /// Binary frames.
    #[default]
    Binary,
}

// ============================================================================
// ReconnectBudget
// ============================================================================

/// How many automatic reconnect attempts remain.
///
/// Deserializes from the integer convention `-1` (unlimited), `0`
/// (disabled) and `N > 0` (N attempts).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "i32")]
pub enum ReconnectBudget {
    /// Never reconnect.
    #[default]
    Disabled,
    /// Reconnect at most this many more times.
    Limited(u32),
    /// Reconnect forever.
    Unlimited,
}

impl ReconnectBudget {
    /// Maps the integer convention onto a budget.
    ///
    /// Any negative count means unlimited.
    #[inline]
    #[must_use]
    pub const fn from_count(count: i32) -> Self {
        match count {
            0 => Self::Disabled,
            n if n < 0 => Self::Unlimited,
            n => Self::Limited(n.unsigned_abs()),
        }
    }

    /// Returns `true` if another attempt is allowed.
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        match self {
            Self::Disabled | Self::Limited(0) => false,
            Self::Limited(_) | Self::Unlimited => true,
        }
    }

    /// Spends one attempt.
    ///
    /// Returns `true` if this spent the last attempt of a limited budget.
    pub fn consume(&mut self) -> bool {
        match *self {
            Self::Limited(n) if n <= 1 => {
                *self = Self::Disabled;
                true
            }
            Self::Limited(n) => {
                *self = Self::Limited(n - 1);
                false
            }
            Self::Disabled | Self::Unlimited => false,
        }
    }
}

impl From<i32> for ReconnectBudget {
    #[inline]
    fn from(count: i32) -> Self {
        Self::from_count(count)
    }
}

// ============================================================================
// ConnectOptions
// ============================================================================

/// Options for [`Session::connect`](crate::Session::connect).
///
/// Remembered by the session and reused for every automatic reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// WebSocket subprotocols offered in the handshake.
    pub protocols: Vec<String>,

    /// Upper bound for the opening handshake.
    #[serde(rename = "open_timeout_ms", deserialize_with = "optional_millis")]
    pub open_timeout: Option<Duration>,

    /// Outgoing frame type.
    pub frame_kind: FrameKind,

    /// Automatic reconnect budget.
    ///
    /// Only taken from the first `connect` call of a session.
    pub auto_reconnect: ReconnectBudget,
}

impl ConnectOptions {
    /// Creates options with no subprotocols, no open timeout, binary frames
    /// and reconnection disabled.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subprotocol.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    /// Sets the outgoing frame type.
    #[inline]
    #[must_use]
    pub fn with_frame_kind(mut self, kind: FrameKind) -> Self {
        self.frame_kind = kind;
        self
    }

    /// Sets the automatic reconnect budget.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, budget: ReconnectBudget) -> Self {
        self.auto_reconnect = budget;
        self
    }
}

// ============================================================================
// RequestOptions
// ============================================================================

/// Per-call options for [`Session::request`](crate::Session::request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Raise the "requests pending" hint.
    pub show_hint: bool,
    /// Write even when the session is not working.
    pub force: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestOptions {
    /// Creates options with the hint shown and no forcing.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            show_hint: true,
            force: false,
        }
    }

    /// Shows or hides the pending hint for this request.
    #[inline]
    #[must_use]
    pub const fn with_hint(mut self, show: bool) -> Self {
        self.show_hint = show;
        self
    }

    /// Forces the write regardless of state.
    #[inline]
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

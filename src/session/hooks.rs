//! Caller lifecycle hooks and network hints.

// ============================================================================
// SessionHooks
// ============================================================================

/// Lifecycle callbacks supplied to [`Session::connect_with_hooks`](crate::Session::connect_with_hooks).
///
/// Only `on_connected` is required.
pub trait SessionHooks {
    /// The first connection opened.
    fn on_connected(&mut self);

    /// The transport reported an error.
    fn on_error(&mut self, _message: &str) {}

    /// The socket closed with `code`.
    fn on_close(&mut self, _code: u16) {}

    /// An automatic reconnect attempt is starting.
    fn on_reconnecting(&mut self) {}

    /// An automatic reconnect attempt succeeded.
    fn on_reconnected(&mut self) {}
}

// ============================================================================
// NetworkTips
// ============================================================================

/// Host-side indicators for network activity.
///
/// The session only toggles them; presentation is up to the host.
pub trait NetworkTips {
    /// Shows or hides the "connecting" indicator.
    fn show_connecting(&mut self, visible: bool);

    /// Shows or hides the "reconnecting" indicator.
    fn show_reconnecting(&mut self, visible: bool);

    /// Shows or hides the "requests pending" indicator.
    fn show_request_pending(&mut self, visible: bool);
}

// ============================================================================
// Hint
// ============================================================================

/// One of the three indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Connecting,
    Reconnecting,
    RequestPending,
}

impl Hint {
    pub(crate) fn apply(self, tips: &mut dyn NetworkTips, visible: bool) {
        match self {
            Self::Connecting => tips.show_connecting(visible),
            Self::Reconnecting => tips.show_reconnecting(visible),
            Self::RequestPending => tips.show_request_pending(visible),
        }
    }
}

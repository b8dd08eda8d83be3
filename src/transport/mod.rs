//! Transport layer.
//!
//! A [`Transport`] opens, writes and closes one byte-oriented duplex
//! channel and reports what happens on it as [`TransportEvent`]s through an
//! [`EventSink`]. The session owns exactly one transport.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   open/send/close   ┌───────────────────┐
//! │                   │────────────────────►│                   │
//! │      Session      │                     │     Transport     │
//! │                   │◄────────────────────│                   │
//! └───────────────────┘  EventSink (inbox)  └───────────────────┘
//!        ▲ poll()                                   │ socket I/O
//!        │                                          ▼
//!   host frame tick                          remote server
//! ```
//!
//! # Event Ordering
//!
//! Events are delivered in the order the transport emits them. A caller
//! initiated [`Transport::close`] detaches the sink: no event is reported
//! for it, and events of the old socket are never mixed with a new one.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite transport and its socket task |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::error::Result;
use crate::session::{ConnectOptions, Signal};

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketTransport;

// ============================================================================
// Close Codes
// ============================================================================

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Closed without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Abnormal closure: handshake failure or lost socket.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Closed by the session after the receive-timeout elapsed.
pub const CLOSE_RECEIVE_TIMEOUT: u16 = 4000;

// ============================================================================
// TransportEvent
// ============================================================================

/// Notification from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open and writable.
    Opened,
    /// A complete inbound message.
    Message(Vec<u8>),
    /// A transport error. Does not by itself close the connection.
    Error(String),
    /// The socket closed.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

// ============================================================================
// SendStatus
// ============================================================================

/// Outcome of a write that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Handed to the socket.
    Sent,
    /// Queued by the session until the connection opens.
    Buffered,
    /// The socket is not writable yet; nothing was written.
    Busy,
}

// ============================================================================
// EventSink
// ============================================================================

/// Where a transport reports its events.
///
/// Cloneable and `Send`, so a transport may emit from its own I/O task.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { tx }
    }

    /// Reports an event. Returns `false` if the session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send(Signal::Transport(event)).is_ok()
    }

    /// Returns `true` if the session is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A byte-oriented duplex channel.
pub trait Transport {
    /// Installs the sink events are reported to.
    ///
    /// Called once, before the first [`open`](Transport::open).
    fn bind(&mut self, sink: EventSink);

    /// Starts opening a connection.
    ///
    /// Success means the attempt started; [`TransportEvent::Opened`] or
    /// [`TransportEvent::Closed`] reports how it ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot start at all.
    fn open(&mut self, url: &str, options: &ConnectOptions) -> Result<()>;

    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) if there is
    /// no socket to write to.
    fn send(&mut self, frame: Vec<u8>) -> Result<SendStatus>;

    /// Closes the socket and detaches it from the sink.
    fn close(&mut self, code: Option<u16>, reason: Option<&str>);
}

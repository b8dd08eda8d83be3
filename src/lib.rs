//! Socket Session - Client-side persistent connection layer.
//!
//! This library keeps one logical socket connection to a game or app server
//! alive and multiplexes request/response exchanges and server pushes over
//! it, driven by a single coarse host tick.
//!
//! # Architecture
//!
//! - **[`TimerScheduler`]**: priority-queue timers advanced by the host's
//!   frame delta, fired in deterministic `(expire_at, order)` order
//! - **[`Session`]**: connection state machine with heartbeats,
//!   receive-timeout, automatic reconnection and a pending-request queue
//! - **[`Transport`]** / **[`Codec`]**: swappable collaborators for socket
//!   I/O and message encoding
//!
//! Key design principles:
//!
//! - Single-threaded: timers and transport events are queued in the session
//!   inbox and handled in [`Session::poll`], never re-entrantly
//! - Nothing is fatal: failures are logged and degrade to "drop the message"
//!   or "move toward closed and maybe retry"
//! - Callbacks return [`Result`]; a failing callback never stops its siblings
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use socket_session::{
//!     CommandId, ConnectOptions, JsonCodec, ReconnectBudget, RequestOptions, Result, Session,
//!     TimerScheduler, WebSocketTransport,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let scheduler = TimerScheduler::new();
//!     let mut session =
//!         Session::new(WebSocketTransport::new(), JsonCodec::new(), scheduler.clone());
//!
//!     session.connect(
//!         "ws://127.0.0.1:8800",
//!         ConnectOptions::new().with_auto_reconnect(ReconnectBudget::Limited(3)),
//!     )?;
//!
//!     session.request(
//!         CommandId::new(1001),
//!         "GetUserInfo",
//!         json!({ "uid": "111" }),
//!         |_, user| {
//!             println!("user: {user}");
//!             Ok(())
//!         },
//!         RequestOptions::new(),
//!     )?;
//!
//!     let mut frame = tokio::time::interval(std::time::Duration::from_millis(16));
//!     loop {
//!         frame.tick().await;
//!         scheduler.update(0.016);
//!         session.poll();
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Codec contract and JSON codec |
//! | [`session`] | Session connection manager |
//! | [`timer`] | Tick-driven timer scheduler |
//! | [`transport`] | Transport contract and WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for timers, requests, commands and listeners.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Message encoding.
///
/// The [`Codec`] contract and the JSON implementation.
pub mod protocol;

/// Connection manager.
///
/// Use [`Session::new`] with a transport, codec and scheduler.
pub mod session;

/// Timer scheduler driven by the host tick.
pub mod timer;

/// Socket transport.
///
/// The [`Transport`] contract and the WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, RequestId, TargetId, TimerId};

// Protocol types
pub use protocol::{Codec, Envelope, JsonCodec};

// Session types
pub use session::{
    ConnectOptions, ConnectionState, FrameKind, ListenerScope, NetworkTips, ReconnectBudget,
    RequestOptions, ResponseCallback, Session, SessionConfig, SessionHooks,
};

// Timer types
pub use timer::{Repeat, TimerCallback, TimerScheduler};

// Transport types
pub use transport::{EventSink, SendStatus, Transport, TransportEvent, WebSocketTransport};

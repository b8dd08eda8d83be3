//! Session connection manager.
//!
//! A [`Session`] owns one logical connection and moves it through
//! [`ConnectionState`]s:
//!
//! - `connect` opens the transport and enters `Connecting`
//! - the first open enters `Working`, arms heartbeat and receive-timeout
//!   timers and flushes everything queued while connecting
//! - a close with reconnect budget left waits `reconnect_delay`, then opens
//!   again; without budget the session ends up `Closed`
//!
//! # Messaging
//!
//! | Operation | Queued | Response |
//! |-----------|--------|----------|
//! | [`Session::send`] | only while connecting | not awaited |
//! | [`Session::request`] | always, until answered | listener called once |
//! | [`Session::request_unique`] | unless already pending | listener called once |
//! | [`Session::set_response_handler`] | no | listener called for every push |
//!
//! Responses match pending requests by command id, oldest first.
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use socket_session::{
//!     CommandId, ConnectOptions, JsonCodec, ReconnectBudget, RequestOptions, Session,
//!     TimerScheduler, WebSocketTransport,
//! };
//!
//! let scheduler = TimerScheduler::new();
//! let mut session = Session::new(WebSocketTransport::new(), JsonCodec::new(), scheduler.clone());
//!
//! session.connect(
//!     "ws://127.0.0.1:8800",
//!     ConnectOptions::new().with_auto_reconnect(ReconnectBudget::Unlimited),
//! )?;
//!
//! session.request(
//!     CommandId::new(1001),
//!     "GetUserInfo",
//!     json!({ "uid": "111" }),
//!     |_, user| {
//!         println!("user: {user}");
//!         Ok(())
//!     },
//!     RequestOptions::new(),
//! )?;
//!
//! // Once per frame
//! scheduler.update(dt);
//! session.poll();
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Session struct and lifecycle.
pub mod core;

/// Lifecycle hooks and network hints.
pub mod hooks;

/// Transport event handlers and session timers.
mod liveness;

/// Send, request and listener operations.
pub mod messaging;

/// Session, connect and request options.
pub mod options;

/// Pending requests and push listeners.
pub mod registry;

/// Inbox messages.
mod signal;

/// Connection state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Session;
pub use hooks::{NetworkTips, SessionHooks};
pub use messaging::ListenerScope;
pub use options::{ConnectOptions, FrameKind, ReconnectBudget, RequestOptions, SessionConfig};
pub use registry::ResponseCallback;
pub use state::ConnectionState;

pub(crate) use signal::Signal;

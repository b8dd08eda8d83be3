//! WebSocket transport and its socket task.
//!
//! # Socket Task
//!
//! Every [`Transport::open`] spawns a tokio task that:
//!
//! - Performs the client handshake (bounded by the open timeout)
//! - Forwards inbound text/binary frames as [`TransportEvent::Message`]
//! - Writes outgoing frames queued by [`Transport::send`]
//! - Reports the end of the socket as [`TransportEvent::Closed`]
//!
//! The task only talks to the session through the [`EventSink`], so the
//! session itself stays single-threaded.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::session::{ConnectOptions, FrameKind};

use super::{
    CLOSE_ABNORMAL, CLOSE_NO_STATUS, EventSink, SendStatus, Transport, TransportEvent,
};

// ============================================================================
// LinkPhase
// ============================================================================

/// Lifecycle of one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkPhase {
    Connecting,
    Open,
    Closed,
}

// ============================================================================
// LinkState
// ============================================================================

/// State shared between the transport and its socket task.
struct LinkState {
    phase: Mutex<LinkPhase>,
    /// Set by a caller-initiated close; silences the task.
    detached: AtomicBool,
}

impl LinkState {
    fn new() -> Self {
        Self {
            phase: Mutex::new(LinkPhase::Connecting),
            detached: AtomicBool::new(false),
        }
    }

    fn phase(&self) -> LinkPhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: LinkPhase) {
        *self.phase.lock() = phase;
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn emit(&self, sink: &EventSink, event: TransportEvent) {
        if !self.is_detached() {
            sink.emit(event);
        }
    }
}

// ============================================================================
// LinkCommand
// ============================================================================

/// Internal commands for the socket task.
enum LinkCommand {
    /// Write a frame.
    Send(Message),
    /// Send a close frame and stop.
    Close(Option<CloseFrame>),
}

/// Handle to the socket task of the current connection.
struct Link {
    command_tx: mpsc::UnboundedSender<LinkCommand>,
    state: Arc<LinkState>,
    frame_kind: FrameKind,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// [`Transport`] over a WebSocket client connection.
///
/// Needs a tokio runtime: either the one current when `open` is called or
/// one supplied with [`WebSocketTransport::with_runtime`].
///
/// # Example
///
/// ```ignore
/// let transport = WebSocketTransport::new();
/// let mut session = Session::new(transport, JsonCodec::new(), scheduler);
/// session.connect("ws://127.0.0.1:8800", ConnectOptions::new())?;
/// ```
#[derive(Default)]
pub struct WebSocketTransport {
    runtime: Option<Handle>,
    sink: Option<EventSink>,
    link: Option<Link>,
}

impl WebSocketTransport {
    /// Creates a transport that spawns on the current tokio runtime.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that spawns its socket tasks on `runtime`.
    ///
    /// Lets a host without an ambient runtime (a frame loop on the main
    /// thread) drive the transport.
    #[inline]
    #[must_use]
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::default()
        }
    }

    /// Returns `true` if the current socket is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.state.phase() == LinkPhase::Open)
    }

    fn runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current()
                .map_err(|e| Error::connection(format!("no tokio runtime: {e}"))),
        }
    }

    fn build_request(url: &str, options: &ConnectOptions) -> Result<Request> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "unsupported scheme '{}', expected ws or wss",
                parsed.scheme()
            )));
        }

        let mut request = parsed.as_str().into_client_request()?;
        if !options.protocols.is_empty() {
            let protocols = HeaderValue::from_str(&options.protocols.join(", "))
                .map_err(|e| Error::config(format!("invalid subprotocol list: {e}")))?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocols);
        }
        Ok(request)
    }
}

// ============================================================================
// WebSocketTransport - Transport
// ============================================================================

impl Transport for WebSocketTransport {
    fn bind(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn open(&mut self, url: &str, options: &ConnectOptions) -> Result<()> {
        let Some(sink) = self.sink.clone() else {
            return Err(Error::config("transport opened before an event sink was bound"));
        };

        if let Some(link) = &self.link
            && link.state.phase() == LinkPhase::Connecting
        {
            warn!(url, "WebSocket handshake in progress, open rejected");
            return Err(Error::connection("handshake already in progress"));
        }

        let request = Self::build_request(url, options)?;
        let runtime = self.runtime()?;

        self.close(None, None);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(LinkState::new());

        runtime.spawn(run_link(
            request,
            options.open_timeout,
            command_rx,
            Arc::clone(&state),
            sink,
        ));

        self.link = Some(Link {
            command_tx,
            state,
            frame_kind: options.frame_kind,
        });

        debug!(url, "WebSocket opening");
        Ok(())
    }

    fn send(&mut self, frame: Vec<u8>) -> Result<SendStatus> {
        let Some(link) = &self.link else {
            return Err(Error::NotConnected);
        };

        match link.state.phase() {
            LinkPhase::Connecting => return Ok(SendStatus::Busy),
            LinkPhase::Closed => return Err(Error::NotConnected),
            LinkPhase::Open => {}
        }

        let message = match link.frame_kind {
            FrameKind::Binary => Message::Binary(frame.into()),
            FrameKind::Text => {
                let text = String::from_utf8(frame)
                    .map_err(|e| Error::codec(format!("text frame is not UTF-8: {e}")))?;
                Message::Text(text.into())
            }
        };

        link.command_tx
            .send(LinkCommand::Send(message))
            .map_err(|_| Error::ConnectionClosed)?;

        Ok(SendStatus::Sent)
    }

    fn close(&mut self, code: Option<u16>, reason: Option<&str>) {
        let Some(link) = self.link.take() else {
            return;
        };

        link.state.detach();
        let frame = code.map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: reason.unwrap_or_default().to_string().into(),
        });
        let _ = link.command_tx.send(LinkCommand::Close(frame));

        debug!(?code, "WebSocket closed by caller");
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Runs one socket from handshake to close.
async fn run_link(
    request: Request,
    open_timeout: Option<Duration>,
    mut command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    state: Arc<LinkState>,
    sink: EventSink,
) {
    let handshake = async { connect_async(request).await.map_err(Error::from) };
    let outcome = match open_timeout {
        Some(limit) => timeout(limit, handshake).await.unwrap_or_else(|_| {
            Err(Error::connection(format!(
                "handshake timed out after {}ms",
                limit.as_millis()
            )))
        }),
        None => handshake.await,
    };

    let mut ws_stream = match outcome {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake failed");
            state.set_phase(LinkPhase::Closed);
            state.emit(
                &sink,
                TransportEvent::Closed {
                    code: CLOSE_ABNORMAL,
                    reason: e.to_string(),
                },
            );
            return;
        }
    };

    if state.is_detached() {
        let _ = ws_stream.close(None).await;
        state.set_phase(LinkPhase::Closed);
        return;
    }

    state.set_phase(LinkPhase::Open);
    info!("WebSocket connection established");
    state.emit(&sink, TransportEvent::Opened);

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        state.emit(&sink, TransportEvent::Message(text.as_bytes().to_vec()));
                    }

                    Some(Ok(Message::Binary(data))) => {
                        state.emit(&sink, TransportEvent::Message(data.to_vec()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        debug!(code, reason = %reason, "WebSocket closed by remote");
                        state.emit(&sink, TransportEvent::Closed { code, reason });
                        break;
                    }

                    Some(Err(e)) => {
                        report_failure(&state, &sink, "read", &e);
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        state.emit(&sink, TransportEvent::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: "stream ended".to_string(),
                        });
                        break;
                    }

                    // Ignore Ping, Pong and raw frames
                    _ => {}
                }
            }

            // Commands from the transport
            command = command_rx.recv() => {
                match command {
                    Some(LinkCommand::Send(message)) => {
                        if let Err(e) = ws_write.send(message).await {
                            report_failure(&state, &sink, "write", &e);
                            break;
                        }
                        trace!("Frame written");
                    }

                    Some(LinkCommand::Close(frame)) => {
                        let _ = ws_write.send(Message::Close(frame)).await;
                        let _ = ws_write.close().await;
                        break;
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    state.set_phase(LinkPhase::Closed);
    debug!("Socket task terminated");
}

/// Reports a failed socket read or write and the close that follows.
///
/// A lost peer is reported as a plain close so the session may reconnect;
/// anything else is reported as an error first.
fn report_failure(state: &LinkState, sink: &EventSink, op: &'static str, e: &WsError) {
    if is_connection_loss(e) {
        debug!(op, error = %e, "WebSocket connection lost");
    } else {
        error!(op, error = %e, "WebSocket error");
        state.emit(sink, TransportEvent::Error(e.to_string()));
    }
    state.emit(
        sink,
        TransportEvent::Closed {
            code: CLOSE_ABNORMAL,
            reason: e.to_string(),
        },
    );
}

/// Returns `true` for socket errors that only mean the peer went away.
///
/// Those are reported as a plain close, not as a transport error.
fn is_connection_loss(error: &WsError) -> bool {
    matches!(
        error,
        WsError::Io(_)
            | WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

// ============================================================================
// Tests
// ============================================================================

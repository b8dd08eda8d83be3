//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};
use socket_session::{
    ConnectOptions, EventSink, JsonCodec, NetworkTips, Result, SendStatus, Session,
    SessionConfig, SessionHooks, TimerScheduler, Transport, TransportEvent,
};

pub const URL: &str = "ws://127.0.0.1:8800";

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockTransport
// ============================================================================

#[derive(Default)]
struct MockLog {
    opens: Vec<String>,
    sent: Vec<Vec<u8>>,
    closes: Vec<(Option<u16>, Option<String>)>,
    fail_open: bool,
    sink: Option<EventSink>,
}

/// Scripted in-memory transport.
///
/// Clones share one log, so a test keeps a clone to drive and inspect the
/// transport owned by the session.
#[derive(Clone, Default)]
pub struct MockTransport {
    log: Rc<RefCell<MockLog>>,
}

impl MockTransport {
    /// Makes every following `open` fail synchronously.
    pub fn fail_open(&self, fail: bool) {
        self.log.borrow_mut().fail_open = fail;
    }

    /// Reports an event as the socket would.
    pub fn emit(&self, event: TransportEvent) {
        let log = self.log.borrow();
        let sink = log.sink.as_ref().expect("transport not bound");
        assert!(sink.emit(event), "session inbox closed");
    }

    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    pub fn closed(&self, code: u16) {
        self.emit(TransportEvent::Closed {
            code,
            reason: String::new(),
        });
    }

    /// Delivers a server frame for `cmd` carrying `data`.
    pub fn deliver(&self, cmd: u32, data: Value) {
        self.emit(TransportEvent::Message(server_frame(cmd, data)));
    }

    pub fn open_count(&self) -> usize {
        self.log.borrow().opens.len()
    }

    /// Written frames, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.log
            .borrow()
            .sent
            .iter()
            .map(|frame| serde_json::from_slice(frame).expect("frame is JSON"))
            .collect()
    }

    pub fn closes(&self) -> Vec<(Option<u16>, Option<String>)> {
        self.log.borrow().closes.clone()
    }
}

impl Transport for MockTransport {
    fn bind(&mut self, sink: EventSink) {
        self.log.borrow_mut().sink = Some(sink);
    }

    fn open(&mut self, url: &str, _options: &ConnectOptions) -> Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_open {
            return Err(socket_session::Error::connection("refused"));
        }
        log.opens.push(url.to_string());
        Ok(())
    }

    fn send(&mut self, frame: Vec<u8>) -> Result<SendStatus> {
        self.log.borrow_mut().sent.push(frame);
        Ok(SendStatus::Sent)
    }

    fn close(&mut self, code: Option<u16>, reason: Option<&str>) {
        self.log
            .borrow_mut()
            .closes
            .push((code, reason.map(str::to_string)));
    }
}

// ============================================================================
// Hooks & Tips
// ============================================================================

/// Records lifecycle hooks as short strings.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub events: Rc<RefCell<Vec<String>>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }
}

impl SessionHooks for RecordingHooks {
    fn on_connected(&mut self) {
        self.push("connected");
    }

    fn on_error(&mut self, message: &str) {
        self.push(format!("error:{message}"));
    }

    fn on_close(&mut self, code: u16) {
        self.push(format!("close:{code}"));
    }

    fn on_reconnecting(&mut self) {
        self.push("reconnecting");
    }

    fn on_reconnected(&mut self) {
        self.push("reconnected");
    }
}

/// Records the last visibility of every hint.
#[derive(Clone, Default)]
pub struct RecordingTips {
    pub calls: Rc<RefCell<Vec<(&'static str, bool)>>>,
}

impl RecordingTips {
    pub fn calls(&self) -> Vec<(&'static str, bool)> {
        self.calls.borrow().clone()
    }

    /// Last visibility set for `hint`, if ever set.
    pub fn last(&self, hint: &str) -> Option<bool> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(name, _)| *name == hint)
            .map(|(_, visible)| *visible)
    }
}

impl NetworkTips for RecordingTips {
    fn show_connecting(&mut self, visible: bool) {
        self.calls.borrow_mut().push(("connecting", visible));
    }

    fn show_reconnecting(&mut self, visible: bool) {
        self.calls.borrow_mut().push(("reconnecting", visible));
    }

    fn show_request_pending(&mut self, visible: bool) {
        self.calls.borrow_mut().push(("pending", visible));
    }
}

// ============================================================================
// Builders
// ============================================================================

pub type TestSession = Session<MockTransport, JsonCodec>;

/// Fresh session over a mock transport, with recording tips.
pub fn session() -> (TestSession, MockTransport, TimerScheduler, RecordingTips) {
    session_with_config(SessionConfig::default())
}

pub fn session_with_config(
    config: SessionConfig,
) -> (TestSession, MockTransport, TimerScheduler, RecordingTips) {
    init_tracing();
    let transport = MockTransport::default();
    let scheduler = TimerScheduler::new();
    let tips = RecordingTips::default();
    let session = Session::with_config(
        transport.clone(),
        JsonCodec::new(),
        scheduler.clone(),
        config,
    )
    .expect("valid config")
    .with_tips(tips.clone());
    (session, transport, scheduler, tips)
}

/// Advances the scheduler and drains the session inbox.
pub fn tick(session: &mut TestSession, scheduler: &TimerScheduler, dt: f64) {
    scheduler.update(dt);
    session.poll();
}

/// A frame as the development server sends it.
pub fn server_frame(cmd: u32, data: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({ "cmd": cmd, "data": data, "reqId": 0, "code": 0, "msg": "success" }))
        .expect("serializable")
}

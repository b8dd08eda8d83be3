//! Session struct, construction and lifecycle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, RequestId, TimerId};
use crate::protocol::{Codec, response_name};
use crate::timer::TimerScheduler;
use crate::transport::{EventSink, Transport, TransportEvent};

use super::hooks::{Hint, NetworkTips, SessionHooks};
use super::options::{ConnectOptions, ReconnectBudget, SessionConfig};
use super::registry::{CommandNameMap, ListenerRegistry, PendingQueue};
use super::signal::{SessionTimer, Signal};
use super::state::ConnectionState;

// ============================================================================
// SessionTimers
// ============================================================================

/// A session timer currently registered on the scheduler.
#[derive(Debug, Clone, Copy)]
pub(super) struct ArmedTimer {
    pub id: TimerId,
    pub epoch: u64,
}

/// The three timers a session may have armed.
#[derive(Debug, Default)]
pub(super) struct SessionTimers {
    pub heartbeat: Option<ArmedTimer>,
    pub receive: Option<ArmedTimer>,
    pub reconnect: Option<ArmedTimer>,
    /// Bumped on every arming, so a late fire of a replaced timer is ignored.
    pub epoch: u64,
}

impl SessionTimers {
    pub fn slot_mut(&mut self, kind: SessionTimer) -> &mut Option<ArmedTimer> {
        match kind {
            SessionTimer::Heartbeat => &mut self.heartbeat,
            SessionTimer::ReceiveTimeout => &mut self.receive,
            SessionTimer::Reconnect => &mut self.reconnect,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Client side of one logical socket connection.
///
/// Owns a [`Transport`] and a [`Codec`], multiplexes request/response
/// exchanges and push listeners over them, keeps the connection alive with
/// heartbeats and reconnects automatically within a budget.
///
/// # Driving a Session
///
/// Nothing happens in the background. Once per host tick, advance the
/// shared scheduler and then drain the session inbox:
///
/// ```ignore
/// scheduler.update(dt);
/// session.poll();
/// ```
///
/// Transport events and timer fires are queued in the inbox and handled in
/// arrival order by [`Session::poll`].
pub struct Session<T: Transport, C: Codec> {
    pub(super) transport: T,
    pub(super) codec: C,
    pub(super) scheduler: TimerScheduler,
    pub(super) config: SessionConfig,
    pub(super) tips: Option<Box<dyn NetworkTips>>,
    pub(super) hooks: Option<Box<dyn SessionHooks>>,

    pub(super) state: ConnectionState,
    pub(super) sink_bound: bool,
    pub(super) inbox_tx: mpsc::UnboundedSender<Signal>,
    pub(super) inbox_rx: mpsc::UnboundedReceiver<Signal>,

    // Reconnect bookkeeping
    pub(super) url: Option<String>,
    pub(super) options: Option<ConnectOptions>,
    pub(super) budget: ReconnectBudget,
    pub(super) reconnecting: bool,
    pub(super) suppress_reconnect: bool,

    pub(super) last_request_id: RequestId,
    pub(super) timers: SessionTimers,
    pub(super) pending: PendingQueue<C::Payload>,
    pub(super) listeners: ListenerRegistry<C::Payload>,
    pub(super) names: CommandNameMap,
}

impl<T: Transport, C: Codec> fmt::Debug for Session<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("url", &self.url)
            .field("budget", &self.budget)
            .field("pending", &self.pending.len())
            .field("listeners", &self.listeners.total())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructors
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Creates a closed session with the default [`SessionConfig`].
    ///
    /// `scheduler` is the host's scheduler; the session arms its heartbeat,
    /// receive-timeout and reconnect timers on it.
    pub fn new(transport: T, codec: C, scheduler: TimerScheduler) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let mut names = CommandNameMap::default();
        names.insert(codec.heartbeat_command(), response_name(codec.heartbeat_name()));

        Self {
            transport,
            codec,
            scheduler,
            config: SessionConfig::default(),
            tips: None,
            hooks: None,
            state: ConnectionState::Closed,
            sink_bound: false,
            inbox_tx,
            inbox_rx,
            url: None,
            options: None,
            budget: ReconnectBudget::Disabled,
            reconnecting: false,
            suppress_reconnect: false,
            last_request_id: RequestId::default(),
            timers: SessionTimers::default(),
            pending: PendingQueue::default(),
            listeners: ListenerRegistry::default(),
            names,
        }
    }

    /// Creates a closed session with custom timings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation.
    pub fn with_config(
        transport: T,
        codec: C,
        scheduler: TimerScheduler,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut session = Self::new(transport, codec, scheduler);
        session.config = config;
        Ok(session)
    }

    /// Installs host network indicators.
    #[must_use]
    pub fn with_tips(mut self, tips: impl NetworkTips + 'static) -> Self {
        self.tips = Some(Box::new(tips));
        self
    }
}

// ============================================================================
// Session - Connection
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Starts connecting to `url`, keeping previously installed hooks.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the session is closed
    /// - Any error the transport reports while starting to open
    pub fn connect(&mut self, url: &str, options: ConnectOptions) -> Result<()> {
        if self.state != ConnectionState::Closed {
            warn!(state = %self.state, url, "Connect rejected");
            return Err(Error::invalid_state("connect", self.state));
        }

        self.reconnecting = false;
        self.suppress_reconnect = false;
        self.open_transport(url, &options)?;

        // The budget belongs to the first connect of a session.
        if self.options.is_none() {
            self.budget = options.auto_reconnect;
        }
        self.url = Some(url.to_string());
        self.options = Some(options);

        info!(url, budget = ?self.budget, "Connecting");
        Ok(())
    }

    /// Starts connecting to `url` and installs lifecycle hooks.
    ///
    /// # Errors
    ///
    /// Same as [`Session::connect`]. The hooks are installed either way.
    pub fn connect_with_hooks(
        &mut self,
        url: &str,
        options: ConnectOptions,
        hooks: impl SessionHooks + 'static,
    ) -> Result<()> {
        self.hooks = Some(Box::new(hooks));
        self.connect(url, options)
    }

    /// Closes the session for good.
    ///
    /// Stops every timer, drops all push listeners and pending requests,
    /// hides every hint and closes the transport. No reconnect follows.
    pub fn close(&mut self, code: Option<u16>, reason: Option<&str>) {
        info!(?code, ?reason, "Session closed by caller");

        self.disarm_all();
        self.listeners.clear();
        self.pending.clear();
        self.hint(Hint::Connecting, false);
        self.hint(Hint::Reconnecting, false);
        self.hint(Hint::RequestPending, false);

        self.transport.close(code, reason);
        self.state = ConnectionState::Closed;
        self.reconnecting = false;
    }

    /// Closes only the socket.
    ///
    /// Pending requests and push listeners stay registered, so a later
    /// [`Session::connect`] resumes where this connection left off.
    pub fn close_socket(&mut self, code: Option<u16>, reason: Option<&str>) {
        debug!(?code, ?reason, pending = self.pending.len(), "Socket closed by caller");

        self.disarm_all();
        self.hint(Hint::Connecting, false);
        self.hint(Hint::Reconnecting, false);

        self.transport.close(code, reason);
        self.state = ConnectionState::Closed;
        self.reconnecting = false;
    }

    /// Binds the sink if needed and asks the transport to open.
    pub(super) fn open_transport(&mut self, url: &str, options: &ConnectOptions) -> Result<()> {
        if !self.sink_bound {
            self.transport.bind(EventSink::new(self.inbox_tx.clone()));
            self.sink_bound = true;
        }

        self.hint(Hint::Connecting, true);
        if let Err(e) = self.transport.open(url, options) {
            warn!(url, error = %e, "Transport failed to open");
            self.hint(Hint::Connecting, false);
            self.state = ConnectionState::Closed;
            return Err(e);
        }

        self.state = ConnectionState::Connecting;
        Ok(())
    }
}

// ============================================================================
// Session - Event Loop
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Handles every queued transport event and timer fire.
    ///
    /// Returns the number of signals handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.inbox_rx.try_recv() {
            handled += 1;
            match signal {
                Signal::Transport(event) => self.handle_event(event),
                Signal::Timer { kind, epoch } => {
                    self.suppress_reconnect = false;
                    self.handle_timer(kind, epoch);
                }
            }
        }
        handled
    }

    /// Handles one transport event right away.
    ///
    /// Transports normally report through their [`EventSink`]; this entry
    /// point serves hosts that pump a transport themselves.
    pub fn handle_event(&mut self, event: TransportEvent) {
        // An error only suppresses the close that directly follows it.
        if !matches!(event, TransportEvent::Error(_) | TransportEvent::Closed { .. }) {
            self.suppress_reconnect = false;
        }
        match event {
            TransportEvent::Opened => self.handle_opened(),
            TransportEvent::Message(bytes) => self.handle_message(&bytes),
            TransportEvent::Error(message) => self.handle_error(&message),
            TransportEvent::Closed { code, reason } => self.handle_closed(code, &reason),
        }
    }

    pub(super) fn hint(&mut self, hint: Hint, visible: bool) {
        if let Some(tips) = self.tips.as_deref_mut() {
            hint.apply(tips, visible);
        }
    }

    pub(super) fn notify(&mut self, f: impl FnOnce(&mut dyn SessionHooks)) {
        if let Some(hooks) = self.hooks.as_deref_mut() {
            f(hooks);
        }
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Working
    }

    /// Returns the number of queued requests and buffered sends.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of push listeners for `command`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, command: CommandId) -> usize {
        self.listeners.count(command)
    }

    /// Returns the URL of the last successful connect.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the remaining automatic reconnect budget.
    #[inline]
    #[must_use]
    pub fn reconnect_budget(&self) -> ReconnectBudget {
        self.budget
    }

    /// Returns the timing configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the codec.
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }
}

// ============================================================================
// Drop
// ============================================================================

impl<T: Transport, C: Codec> Drop for Session<T, C> {
    fn drop(&mut self) {
        // The scheduler outlives the session; leave no timers behind.
        self.disarm_all();
    }
}

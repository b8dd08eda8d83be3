//! Transport event handlers, heartbeat, receive-timeout and reconnection.
//!
//! # Timers
//!
//! | Timer | Armed | Fires |
//! |-------|-------|-------|
//! | Heartbeat | on open and on every inbound message | sends a heartbeat, re-arms |
//! | Receive timeout | on open and on every inbound message | closes the socket |
//! | Reconnect | on close with budget left | opens the socket again |
//!
//! All three are one-shot scheduler timers that post a signal into the
//! session inbox. Each arming gets a fresh epoch; a signal whose epoch no
//! longer matches the armed timer is stale and ignored.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::protocol::{Codec, request_name};
use crate::timer::Repeat;
use crate::transport::{CLOSE_RECEIVE_TIMEOUT, Transport};

use super::core::{ArmedTimer, Session};
use super::hooks::Hint;
use super::signal::{SessionTimer, Signal};
use super::state::ConnectionState;

/// Close reason used when the receive-timeout elapses.
const RECEIVE_TIMEOUT_REASON: &str = "receive timeout";

// ============================================================================
// Session - Timers
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Arms `kind` to fire once after `delay`, replacing any armed instance.
    pub(super) fn arm(&mut self, kind: SessionTimer, delay: Duration) {
        self.disarm(kind);

        self.timers.epoch += 1;
        let epoch = self.timers.epoch;
        let inbox = self.inbox_tx.clone();

        let started = self.scheduler.start(
            move || {
                inbox
                    .send(Signal::Timer { kind, epoch })
                    .map_err(|_| Error::callback("session inbox closed"))
            },
            delay.as_secs_f64(),
            Repeat::Once,
        );

        match started {
            Ok(id) => *self.timers.slot_mut(kind) = Some(ArmedTimer { id, epoch }),
            Err(e) => warn!(?kind, error = %e, "Failed to arm session timer"),
        }
    }

    pub(super) fn disarm(&mut self, kind: SessionTimer) {
        if let Some(armed) = self.timers.slot_mut(kind).take() {
            self.scheduler.stop(armed.id);
        }
    }

    pub(super) fn disarm_all(&mut self) {
        self.disarm(SessionTimer::Heartbeat);
        self.disarm(SessionTimer::ReceiveTimeout);
        self.disarm(SessionTimer::Reconnect);
    }

    /// Resets heartbeat and receive-timeout after traffic.
    fn reset_liveness(&mut self) {
        self.arm(SessionTimer::Heartbeat, self.config.heartbeat_interval);
        self.arm(SessionTimer::ReceiveTimeout, self.config.receive_timeout);
    }

    /// Takes the armed timer if `epoch` is current.
    fn claim(&mut self, kind: SessionTimer, epoch: u64) -> bool {
        let slot = self.timers.slot_mut(kind);
        if matches!(slot, Some(armed) if armed.epoch == epoch) {
            *slot = None;
            return true;
        }
        false
    }

    pub(super) fn handle_timer(&mut self, kind: SessionTimer, epoch: u64) {
        if !self.claim(kind, epoch) {
            trace!(?kind, epoch, "Stale timer signal ignored");
            return;
        }

        match kind {
            SessionTimer::Heartbeat => self.on_heartbeat_due(),
            SessionTimer::ReceiveTimeout => self.on_receive_timeout(),
            SessionTimer::Reconnect => self.on_reconnect_due(),
        }
    }

    fn on_heartbeat_due(&mut self) {
        if self.state != ConnectionState::Working {
            return;
        }

        let command = self.codec.heartbeat_command();
        let name = self.codec.heartbeat_name().to_string();
        let payload = self.codec.heartbeat_payload();

        match self.send(command, &name, payload, true) {
            Ok(status) => trace!(%command, ?status, "Heartbeat sent"),
            Err(e) => warn!(%command, error = %e, "Heartbeat failed"),
        }

        // Keep beating while the line stays idle.
        self.arm(SessionTimer::Heartbeat, self.config.heartbeat_interval);
    }

    fn on_receive_timeout(&mut self) {
        warn!(
            timeout_ms = self.config.receive_timeout.as_millis(),
            "Nothing received within timeout, closing socket"
        );
        self.transport
            .close(Some(CLOSE_RECEIVE_TIMEOUT), Some(RECEIVE_TIMEOUT_REASON));
        self.handle_closed(CLOSE_RECEIVE_TIMEOUT, RECEIVE_TIMEOUT_REASON);
    }

    fn on_reconnect_due(&mut self) {
        let (Some(url), Some(options)) = (self.url.clone(), self.options.clone()) else {
            self.state = ConnectionState::Closed;
            return;
        };

        self.transport.close(None, None);
        self.state = ConnectionState::Closed;
        self.notify(|hooks| hooks.on_reconnecting());

        let exhausted = self.budget.consume();
        if exhausted {
            info!("Reconnect budget exhausted, this is the last attempt");
        }

        info!(url = %url, remaining = ?self.budget, "Reconnecting");
        match self.open_transport(&url, &options) {
            Ok(()) => self.reconnecting = true,
            Err(e) => {
                warn!(url = %url, error = %e, "Reconnect attempt failed to start");
                if self.budget.is_enabled() {
                    self.state = ConnectionState::Connecting;
                    self.arm(SessionTimer::Reconnect, self.config.reconnect_delay);
                } else {
                    self.hint(Hint::Reconnecting, false);
                }
            }
        }
    }
}

// ============================================================================
// Session - Transport Events
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    pub(super) fn handle_opened(&mut self) {
        if self.state == ConnectionState::Working {
            debug!("Duplicate open ignored");
            return;
        }

        let reconnected = std::mem::take(&mut self.reconnecting);
        self.state = ConnectionState::Working;
        self.suppress_reconnect = false;
        info!(url = ?self.url, reconnected, "Connection established");

        self.disarm(SessionTimer::Reconnect);
        self.reset_liveness();
        self.hint(Hint::Connecting, false);
        self.hint(Hint::Reconnecting, false);
        self.flush_pending();

        if reconnected {
            self.notify(|hooks| hooks.on_reconnected());
        } else {
            self.notify(|hooks| hooks.on_connected());
        }
    }

    /// Writes every queued entry in submission order, then drops the plain
    /// sends. Requests stay queued until their response arrives.
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let mut written = 0usize;
        for entry in self.pending.iter() {
            self.last_request_id = self.last_request_id.successor();
            let encoded = self.codec.encode(
                entry.command,
                &request_name(&entry.name),
                &entry.payload,
                self.last_request_id,
            );

            match encoded.and_then(|frame| self.transport.send(frame)) {
                Ok(_) => written += 1,
                Err(e) => warn!(command = %entry.command, name = %entry.name, error = %e, "Flush failed"),
            }
        }

        let dropped = self.pending.retain_awaiting();
        debug!(written, dropped, awaiting = self.pending.len(), "Pending requests flushed");
        self.refresh_pending_hint();
    }

    pub(super) fn handle_message(&mut self, bytes: &[u8]) {
        let envelope = match self.codec.decode_envelope(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "Dropping undecodable frame");
                return;
            }
        };
        let command = envelope.command;

        let payload = {
            let Some(name) = self.names.get(command) else {
                let e = Error::unknown_command(command);
                warn!(error = %e, "Dropping message");
                return;
            };
            match self.codec.decode_typed(name, &envelope.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(%command, name, error = %e, "Dropping message with bad payload");
                    return;
                }
            }
        };

        // Any decoded traffic proves the socket alive.
        if self.state == ConnectionState::Working {
            self.reset_liveness();
        }

        if command == self.codec.heartbeat_command() {
            trace!("Heartbeat reply");
            return;
        }

        if !envelope.is_success() {
            debug!(%command, status = envelope.status, message = %envelope.message, "Server reported failure");
        }

        if let Some(mut request) = self.pending.take_response(command) {
            if let Some(listener) = request.listener.as_mut()
                && let Err(e) = listener(command, &payload)
            {
                warn!(%command, name = %request.name, error = %e, "Response listener failed");
            }
            self.refresh_pending_hint();
        }

        self.listeners.dispatch(command, &payload);
    }

    pub(super) fn handle_error(&mut self, message: &str) {
        warn!(error = message, "Transport error");
        self.notify(|hooks| hooks.on_error(message));
        // The close that follows a hard error is not retried.
        self.suppress_reconnect = true;
    }

    pub(super) fn handle_closed(&mut self, code: u16, reason: &str) {
        if self.state == ConnectionState::Closed {
            debug!(code, reason, "Close ignored, already closed");
            return;
        }

        info!(code, reason, "Connection closed");
        self.notify(|hooks| hooks.on_close(code));
        self.disarm_all();

        let suppressed = std::mem::take(&mut self.suppress_reconnect);
        if self.budget.is_enabled() && !suppressed && self.url.is_some() {
            self.state = ConnectionState::Connecting;
            self.hint(Hint::Reconnecting, true);
            self.arm(SessionTimer::Reconnect, self.config.reconnect_delay);
            debug!(
                delay_ms = self.config.reconnect_delay.as_millis(),
                budget = ?self.budget,
                "Reconnect scheduled"
            );
        } else {
            if suppressed {
                debug!("Reconnect suppressed after transport error");
            }
            self.state = ConnectionState::Closed;
            self.reconnecting = false;
            self.hint(Hint::Connecting, false);
            self.hint(Hint::Reconnecting, false);
        }
    }
}

//! Sending, requests and push listener registration.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, TargetId};
use crate::protocol::{Codec, request_name, response_name};
use crate::transport::{SendStatus, Transport};

use super::core::Session;
use super::hooks::Hint;
use super::options::RequestOptions;
use super::registry::PendingRequest;
use super::state::ConnectionState;

// ============================================================================
// ListenerScope
// ============================================================================

/// Which listeners [`Session::remove_request_listeners`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    /// Every command.
    All,
    /// One command.
    Command(CommandId),
}

// ============================================================================
// Session - Sending
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Sends a message without awaiting a response.
    ///
    /// | State | Unforced | Forced |
    /// |-------|----------|--------|
    /// | Working | written | written |
    /// | Connecting | buffered until open | written |
    /// | Closed | rejected | written |
    ///
    /// The message is encoded under `<name>Req`; replies to `command` decode
    /// under `<name>Resp`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if closed and not forced
    /// - [`Error::Codec`] if encoding fails
    /// - Any error from the transport write
    pub fn send(
        &mut self,
        command: CommandId,
        name: &str,
        payload: C::Payload,
        force: bool,
    ) -> Result<SendStatus> {
        match self.state {
            ConnectionState::Working => {}
            _ if force => {}
            ConnectionState::Connecting => {
                self.names.insert(command, response_name(name));
                self.pending.push(PendingRequest {
                    payload,
                    command,
                    name: name.to_string(),
                    listener: None,
                });
                debug!(%command, name, "Send buffered until connected");
                return Ok(SendStatus::Buffered);
            }
            ConnectionState::Closed => {
                warn!(%command, name, "Send rejected, session closed");
                return Err(Error::invalid_state("send", self.state));
            }
        }

        self.names.insert(command, response_name(name));
        let frame = self.encode_frame(command, name, &payload)?;
        self.transport.send(frame)
    }

    /// Sends a request and queues `listener` for its response.
    ///
    /// The request stays queued until a message for `command` arrives,
    /// whether it was written now or buffered. Queued requests are written
    /// again after every open.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if closed and not forced
    /// - [`Error::Codec`] if encoding fails; nothing is queued then
    pub fn request<F>(
        &mut self,
        command: CommandId,
        name: &str,
        payload: C::Payload,
        listener: F,
        options: RequestOptions,
    ) -> Result<()>
    where
        F: FnMut(CommandId, &C::Payload) -> Result<()> + 'static,
    {
        if self.state == ConnectionState::Closed && !options.force {
            warn!(%command, name, "Request rejected, session closed");
            return Err(Error::invalid_state("request", self.state));
        }

        self.names.insert(command, response_name(name));

        if self.state == ConnectionState::Working || options.force {
            let frame = self.encode_frame(command, name, &payload)?;
            if let Err(e) = self.transport.send(frame) {
                warn!(%command, name, error = %e, "Request write failed, kept for next open");
            }
        }

        self.pending.push(PendingRequest {
            payload,
            command,
            name: name.to_string(),
            listener: Some(Box::new(listener)),
        });

        if options.show_hint {
            self.hint(Hint::RequestPending, true);
        }

        trace!(%command, name, pending = self.pending.len(), "Request queued");
        Ok(())
    }

    /// Like [`Session::request`], unless a request for `command` is already
    /// pending.
    ///
    /// Returns `Ok(false)` without doing anything for a duplicate.
    ///
    /// # Errors
    ///
    /// Same as [`Session::request`].
    pub fn request_unique<F>(
        &mut self,
        command: CommandId,
        name: &str,
        payload: C::Payload,
        listener: F,
        options: RequestOptions,
    ) -> Result<bool>
    where
        F: FnMut(CommandId, &C::Payload) -> Result<()> + 'static,
    {
        if self.pending.contains_command(command) {
            debug!(%command, name, "Duplicate request ignored");
            return Ok(false);
        }
        self.request(command, name, payload, listener, options)?;
        Ok(true)
    }

    /// Encodes a message with a fresh request id.
    pub(super) fn encode_frame(
        &mut self,
        command: CommandId,
        name: &str,
        payload: &C::Payload,
    ) -> Result<Vec<u8>> {
        self.last_request_id = self.last_request_id.successor();
        self.codec
            .encode(command, &request_name(name), payload, self.last_request_id)
            .inspect_err(|e| warn!(%command, name, error = %e, "Encode failed"))
    }
}

// ============================================================================
// Session - Listeners
// ============================================================================

impl<T: Transport, C: Codec> Session<T, C> {
    /// Registers a push listener for `command`, owned by `target`.
    ///
    /// Replaces the listener `target` already has for `command`. Messages
    /// for `command` decode as `name`, taken verbatim.
    pub fn set_response_handler<F>(
        &mut self,
        command: CommandId,
        name: &str,
        target: TargetId,
        callback: F,
    ) where
        F: FnMut(CommandId, &C::Payload) -> Result<()> + 'static,
    {
        self.names.insert(command, name.to_string());
        if self.listeners.upsert(command, target, Box::new(callback)) {
            debug!(%command, %target, "Push listener replaced");
        }
    }

    /// Removes the push listener `target` has for `command`.
    pub fn remove_response_handler(&mut self, command: CommandId, target: TargetId) -> bool {
        self.listeners.remove(command, target)
    }

    /// Removes push listeners and pending requests in `scope`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_request_listeners(&mut self, scope: ListenerScope) -> usize {
        let removed = match scope {
            ListenerScope::All => {
                let count = self.listeners.total() + self.pending.len();
                self.listeners.clear();
                self.pending.clear();
                count
            }
            ListenerScope::Command(command) => {
                self.listeners.clear_command(command) + self.pending.remove_command(command)
            }
        };

        debug!(?scope, removed, "Request listeners removed");
        self.refresh_pending_hint();
        removed
    }

    /// Shows the pending hint while any request awaits a response.
    pub(super) fn refresh_pending_hint(&mut self) {
        let awaiting = self.pending.iter().any(PendingRequest::is_awaiting);
        self.hint(Hint::RequestPending, awaiting);
    }
}

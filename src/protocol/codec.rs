//! Codec trait and decoded envelope.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::{CommandId, RequestId};

// ============================================================================
// Naming
// ============================================================================

/// Suffix of an outgoing request message name.
pub const REQUEST_SUFFIX: &str = "Req";

/// Suffix of a response message name.
pub const RESPONSE_SUFFIX: &str = "Resp";

/// Returns the message name a request for `name` is encoded under.
#[inline]
#[must_use]
pub fn request_name(name: &str) -> String {
    format!("{name}{REQUEST_SUFFIX}")
}

/// Returns the message name a response to `name` is decoded under.
#[inline]
#[must_use]
pub fn response_name(name: &str) -> String {
    format!("{name}{RESPONSE_SUFFIX}")
}

// ============================================================================
// Envelope
// ============================================================================

/// Outer frame of every message.
///
/// The payload is still encoded; [`Codec::decode_typed`] turns it into a
/// value once the message name is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Command id.
    pub command: CommandId,
    /// Encoded payload body.
    pub payload: Vec<u8>,
    /// Request id echoed by the server.
    pub request_id: RequestId,
    /// Status code, `0` on success.
    pub status: i32,
    /// Status message.
    pub message: String,
}

impl Envelope {
    /// Returns `true` if the server reported success.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Turns typed messages into bytes and back.
///
/// Implementations are swappable strategies; the session only depends on
/// this method set.
pub trait Codec {
    /// Decoded payload type handed to listeners.
    type Payload;

    /// Encodes a message under `name`, tagged with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`](crate::Error::Codec) if the payload cannot be
    /// encoded under `name`.
    fn encode(
        &self,
        command: CommandId,
        name: &str,
        payload: &Self::Payload,
        request_id: RequestId,
    ) -> Result<Vec<u8>>;

    /// Decodes the outer envelope of an inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`](crate::Error::Codec) on a malformed frame.
    fn decode_envelope(&self, bytes: &[u8]) -> Result<Envelope>;

    /// Decodes an envelope payload as the message `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`](crate::Error::Codec) if the body is not a
    /// valid `name` message.
    fn decode_typed(&self, name: &str, body: &[u8]) -> Result<Self::Payload>;

    /// Command id of the heartbeat.
    fn heartbeat_command(&self) -> CommandId;

    /// Logical name of the heartbeat message.
    fn heartbeat_name(&self) -> &str;

    /// Payload sent with every heartbeat.
    fn heartbeat_payload(&self) -> Self::Payload;
}

// ============================================================================
// Tests
// ============================================================================

//! JSON codec.
//!
//! Frames carry the same fields as the development server's base command:
//! command id, payload, request id, status code and status message.
//!
//! # Format
//!
//! ```json
//! {
//!   "cmd": 1001,
//!   "data": { "userInfo": { "uid": "111" } },
//!   "reqId": 7,
//!   "code": 0,
//!   "msg": "success"
//! }
//! ```
//!
//! `code` and `msg` are omitted on outgoing frames and default to `0` / `""`
//! when missing from inbound ones.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, RequestId};

use super::codec::{Codec, Envelope};

// ============================================================================
// Constants
// ============================================================================

/// Default heartbeat command id.
pub const DEFAULT_HEARTBEAT_COMMAND: CommandId = CommandId::new(1);

/// Default heartbeat message name.
pub const DEFAULT_HEARTBEAT_NAME: &str = "Ping";

// ============================================================================
// Wire Frames
// ============================================================================

/// Outgoing frame, borrows the payload.
#[derive(Serialize)]
struct OutboundFrame<'a> {
    cmd: CommandId,
    data: &'a Value,
    #[serde(rename = "reqId")]
    req_id: RequestId,
}

/// Inbound frame.
#[derive(Deserialize)]
struct InboundFrame {
    cmd: CommandId,
    #[serde(default)]
    data: Value,
    #[serde(rename = "reqId", default)]
    req_id: RequestId,
    #[serde(default)]
    code: i32,
    #[serde(default)]
    msg: String,
}

// ============================================================================
// JsonCodec
// ============================================================================

/// Codec encoding payloads as [`serde_json::Value`].
///
/// By default any message name is accepted. Registering names with
/// [`JsonCodec::with_message`] makes the codec strict: encoding or decoding
/// an unregistered name fails, the way a schema lookup miss would.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    messages: FxHashSet<String>,
    heartbeat_command: CommandId,
    heartbeat_name: String,
    heartbeat_payload: Value,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// JsonCodec - Builder
// ============================================================================

impl JsonCodec {
    /// Creates a permissive codec with the default `Ping` heartbeat.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: FxHashSet::default(),
            heartbeat_command: DEFAULT_HEARTBEAT_COMMAND,
            heartbeat_name: DEFAULT_HEARTBEAT_NAME.to_string(),
            heartbeat_payload: json!({ "data": "ping" }),
        }
    }

    /// Registers a known message name.
    #[must_use]
    pub fn with_message(mut self, name: impl Into<String>) -> Self {
        self.messages.insert(name.into());
        self
    }

    /// Sets the heartbeat command, name and payload.
    #[must_use]
    pub fn with_heartbeat(
        mut self,
        command: CommandId,
        name: impl Into<String>,
        payload: Value,
    ) -> Self {
        self.heartbeat_command = command;
        self.heartbeat_name = name.into();
        self.heartbeat_payload = payload;
        self
    }

    /// Returns `true` if message names are checked.
    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        !self.messages.is_empty()
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if self.is_strict() && !self.messages.contains(name) {
            return Err(Error::codec(format!("unknown message type: {name}")));
        }
        Ok(())
    }
}

// ============================================================================
// JsonCodec - Codec
// ============================================================================

impl Codec for JsonCodec {
    type Payload = Value;

    fn encode(
        &self,
        command: CommandId,
        name: &str,
        payload: &Value,
        request_id: RequestId,
    ) -> Result<Vec<u8>> {
        self.check_name(name)?;

        let frame = OutboundFrame {
            cmd: command,
            data: payload,
            req_id: request_id,
        };
        let bytes = serde_json::to_vec(&frame)
            .map_err(|e| Error::codec(format!("encode {name} failed: {e}")))?;

        trace!(%command, name, %request_id, len = bytes.len(), "Encoded frame");
        Ok(bytes)
    }

    fn decode_envelope(&self, bytes: &[u8]) -> Result<Envelope> {
        let frame: InboundFrame = serde_json::from_slice(bytes)
            .map_err(|e| Error::codec(format!("malformed frame: {e}")))?;

        Ok(Envelope {
            command: frame.cmd,
            payload: serde_json::to_vec(&frame.data)?,
            request_id: frame.req_id,
            status: frame.code,
            message: frame.msg,
        })
    }

    fn decode_typed(&self, name: &str, body: &[u8]) -> Result<Value> {
        self.check_name(name)?;
        serde_json::from_slice(body).map_err(|e| Error::codec(format!("decode {name} failed: {e}")))
    }

    fn heartbeat_command(&self) -> CommandId {
        self.heartbeat_command
    }

    fn heartbeat_name(&self) -> &str {
        &self.heartbeat_name
    }

    fn heartbeat_payload(&self) -> Value {
        self.heartbeat_payload.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_shape() {
        let codec = JsonCodec::new();
        let bytes = codec
            .encode(
                CommandId::new(1001),
                "GetUserInfoReq",
                &json!({ "uid": "111" }),
                RequestId::new(7),
            )
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({ "cmd": 1001, "data": { "uid": "111" }, "reqId": 7 }));
    }

    #[test]
    fn test_decode_envelope_and_payload() {
        let codec = JsonCodec::new();
        let raw = br#"{"cmd":1001,"data":{"coin":100},"reqId":3,"code":0,"msg":"success"}"#;

        let envelope = codec.decode_envelope(raw).unwrap();
        assert_eq!(envelope.command, CommandId::new(1001));
        assert_eq!(envelope.request_id, RequestId::new(3));
        assert_eq!(envelope.message, "success");
        assert!(envelope.is_success());

        let payload = codec
            .decode_typed("GetUserInfoResp", &envelope.payload)
            .unwrap();
        assert_eq!(payload, json!({ "coin": 100 }));
    }

    #[test]
    fn test_decode_envelope_defaults() {
        let codec = JsonCodec::new();
        let envelope = codec.decode_envelope(br#"{"cmd":2001}"#).unwrap();
        assert_eq!(envelope.request_id, RequestId::new(0));
        assert_eq!(envelope.status, 0);
        assert_eq!(envelope.payload, b"null");
    }

    #[test]
    fn test_malformed_frame_is_codec_error() {
        let codec = JsonCodec::new();
        let err = codec.decode_envelope(b"not json").unwrap_err();
        assert!(err.is_codec_error());
    }

    #[test]
    fn test_strict_names() {
        let codec = JsonCodec::new().with_message("PingReq");
        assert!(codec.is_strict());

        assert!(
            codec
                .encode(CommandId::new(1), "PingReq", &json!({}), RequestId::new(1))
                .is_ok()
        );
        let err = codec
            .encode(CommandId::new(2), "LoginReq", &json!({}), RequestId::new(2))
            .unwrap_err();
        assert!(err.is_codec_error());
        assert!(codec.decode_typed("LoginResp", b"{}").is_err());
    }

    #[test]
    fn test_heartbeat_defaults_and_override() {
        let codec = JsonCodec::new();
        assert_eq!(codec.heartbeat_command(), DEFAULT_HEARTBEAT_COMMAND);
        assert_eq!(codec.heartbeat_name(), "Ping");
        assert_eq!(codec.heartbeat_payload(), json!({ "data": "ping" }));

        let codec = codec.with_heartbeat(CommandId::new(9), "KeepAlive", json!(null));
        assert_eq!(codec.heartbeat_command(), CommandId::new(9));
        assert_eq!(codec.heartbeat_name(), "KeepAlive");
    }
}

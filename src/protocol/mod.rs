//! Message encoding contract.
//!
//! The session never looks inside a payload. It hands `(command, name,
//! payload, request id)` tuples to a [`Codec`] and gets bytes back, and it
//! turns inbound bytes into an [`Envelope`] and then into a typed payload.
//!
//! # Message Names
//!
//! A command id maps to a logical message name. Requests are encoded under
//! `<name>Req` and their responses decoded under `<name>Resp`:
//!
//! | Call | Encoded as | Decoded as |
//! |------|------------|------------|
//! | `send(1001, "GetUserInfo", ..)` | `GetUserInfoReq` | `GetUserInfoResp` |
//! | heartbeat (`Ping`) | `PingReq` | `PingResp` |
//! | `set_response_handler(2001, "EventServerReady", ..)` | - | `EventServerReady` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | [`Codec`] trait and [`Envelope`] |
//! | `json` | [`JsonCodec`], JSON frames with status code and message |

// ============================================================================
// Submodules
// ============================================================================

/// Codec trait and decoded envelope.
pub mod codec;

/// JSON codec.
pub mod json;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{Codec, Envelope, request_name, response_name};
pub use json::JsonCodec;

//! Protocol message envelope carried as frame payload.
//!
//! A [`Message`] is either a [`Request`] or a [`Response`], correlated by
//! transaction id. Serialized with MessagePack in struct-as-map format
//! (`to_vec_named`) so the envelope stays self-describing on the wire;
//! bodies ride as msgpack bin, not integer arrays.
//!
//! Headers are kept as raw `"Name: Value"` strings rather than a map, so
//! duplicate names, original casing, and order survive exactly. Structured
//! parsing is the caller's job.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunnelError};

/// An HTTP-shaped request tunneled to the far end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Transaction id; strictly increasing, allocated by the requesting side.
    pub id: u64,
    /// HTTP verb, e.g. `"GET"`.
    pub verb: String,
    /// Path + query + fragment only, never a full URL.
    pub path: String,
    /// Raw `"Name: Value"` header lines, order and duplicates preserved.
    pub headers: Vec<String>,
    /// Raw request body.
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

/// The far end's answer to a [`Request`] with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Transaction id of the originating request.
    pub id: u64,
    /// HTTP status code.
    pub status: u32,
    /// Status message, e.g. `"OK"`.
    pub message: String,
    /// Raw `"Name: Value"` header lines, order and duplicates preserved.
    pub headers: Vec<String>,
    /// Raw response body.
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

/// Typed envelope carried as frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// A request issued by this side, or by the far end once bidirectional
    /// tunneling exists.
    Request(Request),
    /// A response matched to a pending request by id.
    Response(Response),
}

/// Encode a message to its wire payload.
pub fn encode_message(msg: &Message) -> Result<Vec<u8>> {
    // Struct-as-map, never positional: keeps the wire self-describing.
    Ok(rmp_serde::to_vec_named(msg)?)
}

/// Decode a message from a frame payload.
///
/// Truncated bytes and unknown discriminants are protocol violations.
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| TunnelError::Protocol(format!("undecodable message: {e}")))
}

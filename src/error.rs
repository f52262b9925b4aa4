//! Error types for webtunnel.

use thiserror::Error;

/// Main error type for all tunnel operations.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// WebSocket transport error (handshake, read, write).
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Message serialization error.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Protocol violation: malformed frame or message, bad marker,
    /// oversized declared length. Fatal to the connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `open()` was called on a tunnel that already left the initial state.
    #[error("tunnel already opened")]
    AlreadyOpen,

    /// A request was issued before the tunnel reached the open state.
    #[error("tunnel not open")]
    NotOpen,

    /// The socket closed or errored; delivered to every in-flight request.
    #[error("connection closed")]
    ConnectionClosed,

    /// A transaction id was registered twice. Unreachable with monotonic
    /// allocation, but guarded regardless.
    #[error("duplicate transaction id {0}")]
    DuplicateId(u64),

    /// A response arrived for an id with no pending entry (duplicate or late
    /// delivery after timeout). Non-fatal, logged by the dispatcher.
    #[error("no pending request for response id {0}")]
    UnmatchedResponse(u64),

    /// The per-request deadline expired before a matching response arrived.
    #[error("request timed out")]
    TimedOut,

    /// The request was cancelled through its [`CancelHandle`](crate::CancelHandle).
    #[error("request cancelled")]
    Cancelled,

    /// An adapter was handed a body representation it cannot flatten into
    /// raw bytes (multipart form data, live streams). Raised before any
    /// frame is sent; never reaches the wire.
    #[error("unsupported request body: {0}")]
    UnsupportedBody(String),

    /// An adapter was handed a URL it cannot resolve down to
    /// path+query+fragment. Raised before any frame is sent.
    #[error("cannot resolve to a request path: {0}")]
    UnresolvableUrl(String),
}

/// Result type alias using TunnelError.
pub type Result<T> = std::result::Result<T, TunnelError>;

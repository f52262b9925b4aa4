//! # webtunnel
//!
//! Client side of an HTTP-over-WebSocket tunnel: many concurrent
//! HTTP-shaped request/response exchanges multiplexed over one persistent
//! duplex socket, correlated by numeric transaction ids. An entire client
//! application (markup, scripts, styles, subsequent API calls) can be
//! fetched through the one channel instead of per-resource network access
//! (restricted network boundaries, sandboxed contexts, single-entry-point
//! deployments).
//!
//! ## Architecture
//!
//! - **Wire**: `[u32 BE payload length][u16 BE marker][payload]`, payload
//!   ceiling 128 MiB, payload = one serialized [`Message`](protocol::Message)
//! - **Reassembly**: inbound chunks carry zero, one, or several frames, or
//!   a fragment; [`FrameBuffer`](protocol::FrameBuffer) turns them back
//!   into whole frames
//! - **Correlation**: each request suspends on a pending entry keyed by
//!   its transaction id until the matching response arrives
//!
//! ## Example
//!
//! ```ignore
//! use webtunnel::TunnelBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tunnel = TunnelBuilder::for_origin("http://127.0.0.1:8080")?.build();
//!     tunnel.open().await?;
//!     tunnel.ready().await?;
//!
//!     let rsp = tunnel
//!         .issue_request("GET", "/index.html", vec!["Accept: text/html".into()], Vec::new())
//!         .await?;
//!     println!("{} {}", rsp.status, rsp.message);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod protocol;
pub mod transport;

mod pending;
mod tunnel;
mod writer;

pub use error::TunnelError;
pub use protocol::{Message, Request, Response};
pub use tunnel::{
    cancellation, CancelHandle, CancelSignal, RequestOptions, Tunnel, TunnelBuilder, TunnelState,
};

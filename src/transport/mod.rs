//! Transport module - the socket under the tunnel.

mod ws;

pub use ws::{derive_tunnel_url, WsStream, TUNNEL_ENDPOINT_PATH};

pub(crate) use ws::connect;

//! WebSocket endpoint derivation and connection.
//!
//! The tunnel endpoint is derived from the hosting page's own origin:
//! the scheme is upgraded (http→ws, https→wss), the path is fixed, and a
//! randomly generated per-session identifier is appended as a query
//! parameter so the far end can tell concurrent sessions apart.

use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, TunnelError};

/// Path of the tunnel endpoint on the far end.
pub const TUNNEL_ENDPOINT_PATH: &str = "/websocket";

/// A connected tunnel socket.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Derive the tunnel's socket URL from an origin URL.
///
/// `http://host:port/whatever` becomes
/// `ws://host:port/websocket?id=<uuid>`, and `https` likewise becomes
/// `wss`. A `ws`/`wss` origin is accepted as already upgraded. Anything
/// else cannot name a tunnel endpoint and is rejected.
pub fn derive_tunnel_url(origin: &str) -> Result<Url> {
    let mut url =
        Url::parse(origin).map_err(|_| TunnelError::UnresolvableUrl(origin.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TunnelError::UnresolvableUrl(format!(
                "unknown scheme {other:?} in {origin}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| TunnelError::UnresolvableUrl(origin.to_string()))?;

    url.set_path(TUNNEL_ENDPOINT_PATH);
    url.set_fragment(None);
    url.set_query(Some(&format!("id={}", Uuid::new_v4())));

    Ok(url)
}

/// Establish the socket connection.
pub(crate) async fn connect(url: &Url) -> Result<WsStream> {
    let (stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TunnelError::WebSocket(Box::new(e)))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_upgrades_to_ws() {
        let url = derive_tunnel_url("http://example.com:8080/some/page").unwrap();

        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), TUNNEL_ENDPOINT_PATH);
    }

    #[test]
    fn test_https_upgrades_to_wss() {
        let url = derive_tunnel_url("https://example.com/").unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn test_ws_origin_kept() {
        let url = derive_tunnel_url("ws://127.0.0.1:9000").unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), TUNNEL_ENDPOINT_PATH);
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let result = derive_tunnel_url("ftp://example.com/");
        assert!(matches!(result, Err(TunnelError::UnresolvableUrl(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(derive_tunnel_url("not a url").is_err());
    }

    #[test]
    fn test_session_id_attached_and_unique() {
        let a = derive_tunnel_url("http://example.com/").unwrap();
        let b = derive_tunnel_url("http://example.com/").unwrap();

        let id_of = |u: &Url| {
            u.query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.to_string())
                .expect("id query parameter missing")
        };

        let (id_a, id_b) = (id_of(&a), id_of(&b));
        assert!(!id_a.is_empty());
        assert_ne!(id_a, id_b);
    }
}

//! Fetch one resource through the tunnel.
//!
//! Expects a tunnel server on the given origin (default
//! `http://127.0.0.1:8080`; the endpoint URL is derived from it):
//!
//! ```sh
//! cargo run --example fetch -- http://127.0.0.1:8080 /index.html
//! ```

use std::time::Duration;

use webtunnel::http::{flatten_headers, resolve_request_path};
use webtunnel::TunnelBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webtunnel=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let origin = args
        .next()
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
    let target = args.next().unwrap_or_else(|| "/index.html".to_string());

    let tunnel = TunnelBuilder::for_origin(&origin)?
        .request_timeout(Duration::from_secs(10))
        .build();
    tunnel.open().await?;
    tunnel.ready().await?;

    let path = resolve_request_path(&target)?;
    let headers = flatten_headers([("Accept", "*/*")]);
    let rsp = tunnel.issue_request("GET", &path, headers, Vec::new()).await?;

    println!("{} {}", rsp.status, rsp.message);
    for line in &rsp.headers {
        println!("{line}");
    }
    println!();
    println!("{}", String::from_utf8_lossy(&rsp.body));

    tunnel.close().await;
    Ok(())
}

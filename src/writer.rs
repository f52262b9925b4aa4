//! Dedicated writer task for outbound frames.
//!
//! Callers never touch the socket sink directly: encoded frames go through
//! an mpsc channel into a single task that owns the sink. This keeps sends
//! from interleaving without a lock around the sink.
//!
//! ```text
//! issue_request ─┐
//! issue_request ─┼─► mpsc::Sender<Outbound> ─► Writer Task ─► WebSocket sink
//! close         ─┘
//! ```

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Default writer channel capacity.
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Commands accepted by the writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// A fully framed message, sent as one binary socket message.
    Frame(Vec<u8>),
    /// Close the sink (WebSocket close handshake) and stop.
    Shutdown,
}

/// Spawn the writer task and return the channel for handing it frames.
///
/// The task ends when every sender is dropped, when a `Shutdown` command
/// arrives, or when the sink rejects a send; in each case the sink is
/// closed on the way out.
pub(crate) fn spawn_writer_task<S>(
    sink: S,
    capacity: usize,
) -> (mpsc::Sender<Outbound>, JoinHandle<()>)
where
    S: Sink<WsMessage> + Unpin + Send + 'static,
    S::Error: std::fmt::Display,
{
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(writer_loop(rx, sink));
    (tx, task)
}

async fn writer_loop<S>(mut rx: mpsc::Receiver<Outbound>, mut sink: S)
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Outbound::Frame(bytes) => {
                if let Err(e) = sink.send(WsMessage::Binary(bytes.into())).await {
                    tracing::warn!(error = %e, "socket send failed, stopping writer");
                    break;
                }
            }
            Outbound::Shutdown => break,
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "socket close failed");
    }
}

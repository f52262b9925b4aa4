//! Connection manager: the tunnel itself.
//!
//! One [`Tunnel`] owns one socket for an entire session. It allocates
//! transaction ids, registers pending entries, frames and sends requests,
//! and runs the read loop that reassembles inbound chunks, decodes
//! messages, and resolves suspended callers by id.
//!
//! Lifecycle: `Init → Connecting → Open → {Closed | Errored}`. The two
//! terminal states are mutually exclusive and final; a tunnel is never
//! reopened (reconnecting would lose all correlation state; sessions
//! create a fresh instance instead).
//!
//! # Example
//!
//! ```ignore
//! use webtunnel::{Tunnel, TunnelBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tunnel = TunnelBuilder::for_origin("http://127.0.0.1:8080")?.build();
//!     tunnel.open().await?;
//!
//!     let rsp = tunnel
//!         .issue_request("GET", "/index.html", vec!["Accept: text/html".into()], Vec::new())
//!         .await?;
//!     println!("{} {}", rsp.status, rsp.message);
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::error::{Result, TunnelError};
use crate::pending::{PendingResult, PendingTable};
use crate::protocol::{
    build_frame, decode_message, encode_message, FrameBuffer, Message, Request, Response,
};
use crate::transport::{self, derive_tunnel_url, WsStream};
use crate::writer::{spawn_writer_task, Outbound, DEFAULT_CHANNEL_CAPACITY};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// Created, `open()` not yet called.
    Init,
    /// Socket establishment in progress.
    Connecting,
    /// Socket usable; requests may be issued.
    Open,
    /// Terminal: the socket closed.
    Closed,
    /// Terminal: the socket or protocol failed.
    Errored,
}

impl TunnelState {
    /// Whether this is one of the two terminal states.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TunnelState::Closed | TunnelState::Errored)
    }
}

/// Per-request options for [`Tunnel::issue_request_with`].
#[derive(Default)]
pub struct RequestOptions {
    /// Deadline for this request, overriding the builder-level default.
    pub deadline: Option<Duration>,
    /// Cancellation signal; see [`cancellation`].
    pub cancel: Option<CancelSignal>,
}

/// Caller-held handle that cancels one request.
pub struct CancelHandle {
    tx: oneshot::Sender<()>,
}

impl CancelHandle {
    /// Cancel the request this handle was paired with. The suspended call
    /// resolves with [`TunnelError::Cancelled`] and its pending entry is
    /// removed; a response arriving later is logged and dropped. Dropping
    /// the handle without calling this never cancels anything.
    pub fn cancel(self) {
        let _ = self.tx.send(());
    }
}

/// The receiving side of a cancellation pair, passed in [`RequestOptions`].
pub struct CancelSignal {
    rx: oneshot::Receiver<()>,
}

/// Create a cancellation pair for one request.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Builder for configuring and creating a [`Tunnel`].
pub struct TunnelBuilder {
    url: Url,
    request_timeout: Option<Duration>,
    channel_capacity: usize,
}

impl TunnelBuilder {
    /// Build a tunnel that will connect to an explicit socket URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            request_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Build a tunnel whose endpoint is derived from the hosting page's
    /// origin (scheme upgrade, endpoint path, per-session id, see
    /// [`derive_tunnel_url`]).
    pub fn for_origin(origin: &str) -> Result<Self> {
        Ok(Self::new(derive_tunnel_url(origin)?))
    }

    /// Default deadline applied to every request. Without one, a request
    /// with no per-call deadline waits indefinitely for its response.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Capacity of the outbound writer channel.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the tunnel. It starts in `Init`; call [`Tunnel::open`] next.
    pub fn build(self) -> Tunnel {
        let (state, _) = watch::channel(TunnelState::Init);
        Tunnel {
            url: self.url,
            request_timeout: self.request_timeout,
            channel_capacity: self.channel_capacity,
            shared: Arc::new(Shared {
                state,
                pending: PendingTable::new(),
                next_txid: AtomicU64::new(1),
                outbound: OnceLock::new(),
            }),
        }
    }
}

/// State shared between the tunnel handle and its socket tasks.
struct Shared {
    state: watch::Sender<TunnelState>,
    pending: PendingTable,
    /// Next transaction id; starts at 1, never reused within a connection.
    next_txid: AtomicU64,
    /// Writer channel, set once the socket is up.
    outbound: OnceLock<mpsc::Sender<Outbound>>,
}

impl Shared {
    /// Move to `to` unless already in a terminal state.
    fn transition(&self, to: TunnelState) {
        self.state.send_if_modified(|s| {
            if s.is_terminal() || *s == to {
                false
            } else {
                tracing::debug!(from = ?*s, ?to, "tunnel state change");
                *s = to;
                true
            }
        });
    }
}

/// The tunnel: one persistent duplex socket multiplexing all
/// request/response traffic for a session.
///
/// Pass the instance explicitly into every consumer that issues tunneled
/// requests; it is cheap to share behind an `Arc`.
pub struct Tunnel {
    url: Url,
    request_timeout: Option<Duration>,
    channel_capacity: usize,
    shared: Arc<Shared>,
}

impl Tunnel {
    /// Begin socket establishment: `Init → Connecting`, and `Open` once
    /// the handshake completes.
    ///
    /// Calling this twice on the same instance fails with `AlreadyOpen`,
    /// whatever state the first call reached.
    pub async fn open(&self) -> Result<()> {
        let mut started = false;
        self.shared.state.send_if_modified(|s| {
            if *s == TunnelState::Init {
                *s = TunnelState::Connecting;
                started = true;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(TunnelError::AlreadyOpen);
        }

        let socket = match transport::connect(&self.url).await {
            Ok(s) => s,
            Err(e) => {
                self.shared.transition(TunnelState::Errored);
                return Err(e);
            }
        };

        let (sink, stream) = socket.split();
        let (outbound, _writer_task) = spawn_writer_task(sink, self.channel_capacity);
        let _ = self.shared.outbound.set(outbound.clone());

        tokio::spawn(read_loop(stream, self.shared.clone(), outbound));

        self.shared.transition(TunnelState::Open);
        Ok(())
    }

    /// Wait until the tunnel is usable. Bootstrap code waits on this
    /// before issuing the first request.
    ///
    /// Resolves with `ConnectionClosed` if the tunnel reaches a terminal
    /// state without ever opening.
    pub async fn ready(&self) -> Result<()> {
        let mut rx = self.shared.state.subscribe();
        let state = rx
            .wait_for(|s| *s == TunnelState::Open || s.is_terminal())
            .await
            .map_err(|_| TunnelError::ConnectionClosed)?;

        if *state == TunnelState::Open {
            Ok(())
        } else {
            Err(TunnelError::ConnectionClosed)
        }
    }

    /// Wait until the tunnel reaches a terminal state.
    pub async fn closed(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TunnelState {
        *self.shared.state.borrow()
    }

    /// Number of requests currently awaiting their response.
    pub fn in_flight(&self) -> usize {
        self.shared.pending.len()
    }

    /// Issue a request and suspend until its matching response arrives.
    ///
    /// This is the `doHttp` contract: `verb`, a path that is
    /// path+query+fragment only (never a full URL; see
    /// [`resolve_request_path`](crate::http::resolve_request_path)),
    /// ordered `"Name: Value"` header lines, and a raw byte body.
    ///
    /// Calls are fully independent; any number may be outstanding
    /// concurrently. Completion order follows the far end's responses,
    /// only correlation is guaranteed.
    pub async fn issue_request(
        &self,
        verb: &str,
        path: &str,
        headers: Vec<String>,
        body: Vec<u8>,
    ) -> Result<Response> {
        self.issue_request_with(verb, path, headers, body, RequestOptions::default())
            .await
    }

    /// [`issue_request`](Self::issue_request) with a per-call deadline
    /// and/or cancellation signal.
    pub async fn issue_request_with(
        &self,
        verb: &str,
        path: &str,
        headers: Vec<String>,
        body: Vec<u8>,
        opts: RequestOptions,
    ) -> Result<Response> {
        match self.state() {
            TunnelState::Open => {}
            TunnelState::Init | TunnelState::Connecting => return Err(TunnelError::NotOpen),
            TunnelState::Closed | TunnelState::Errored => {
                return Err(TunnelError::ConnectionClosed)
            }
        }
        let outbound = self
            .shared
            .outbound
            .get()
            .ok_or(TunnelError::NotOpen)?
            .clone();

        let id = self.shared.next_txid.fetch_add(1, Ordering::Relaxed);
        let rx = self.shared.pending.register(id)?;

        let msg = Message::Request(Request {
            id,
            verb: verb.to_string(),
            path: path.to_string(),
            headers,
            body,
        });
        let frame = match encode_message(&msg) {
            Ok(payload) => build_frame(&payload),
            Err(e) => {
                self.shared.pending.discard(id);
                return Err(e);
            }
        };

        tracing::debug!(id, verb, path, "issuing request");
        if outbound.send(Outbound::Frame(frame)).await.is_err() {
            self.shared.pending.discard(id);
            return Err(TunnelError::ConnectionClosed);
        }

        self.await_response(id, rx, opts).await
    }

    /// Suspend on the pending entry, racing deadline and cancellation.
    async fn await_response(
        &self,
        id: u64,
        rx: oneshot::Receiver<PendingResult>,
        opts: RequestOptions,
    ) -> Result<Response> {
        let deadline = opts.deadline.or(self.request_timeout);

        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match opts.cancel {
                // A dropped handle never cancels; only an explicit signal does.
                Some(sig) => match sig.rx.await {
                    Ok(()) => {}
                    Err(_) => std::future::pending().await,
                },
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            outcome = rx => match outcome {
                Ok(result) => result,
                Err(_) => Err(TunnelError::ConnectionClosed),
            },
            () = expired => {
                self.shared.pending.discard(id);
                Err(TunnelError::TimedOut)
            }
            () = cancelled => {
                self.shared.pending.discard(id);
                Err(TunnelError::Cancelled)
            }
        }
    }

    /// Close the tunnel: terminal `Closed`, WebSocket close handshake,
    /// and every still-pending request failed with `ConnectionClosed`.
    pub async fn close(&self) {
        self.shared.transition(TunnelState::Closed);
        if let Some(outbound) = self.shared.outbound.get() {
            let _ = outbound.send(Outbound::Shutdown).await;
        }
        self.shared
            .pending
            .drain_with_error(|| TunnelError::ConnectionClosed);
    }
}

/// Read loop: feed inbound chunks to the reassembler, dispatch every
/// complete frame, and on exit transition to a terminal state and drain
/// the pending table. Faults never escape this task.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Outbound>,
) {
    let mut reassembler = FrameBuffer::new();
    let mut terminal = TunnelState::Closed;

    while let Some(item) = stream.next().await {
        match item {
            Ok(WsMessage::Binary(chunk)) => {
                if let Err(e) = on_chunk(&shared, &mut reassembler, &chunk) {
                    tracing::error!(error = %e, "protocol violation, terminating tunnel");
                    terminal = TunnelState::Errored;
                    let _ = outbound.send(Outbound::Shutdown).await;
                    break;
                }
            }
            Ok(WsMessage::Text(_)) => {
                tracing::warn!("ignoring text message on binary tunnel");
            }
            Ok(WsMessage::Close(frame)) => {
                tracing::debug!(?frame, "far end closed the tunnel");
                break;
            }
            // Ping/pong are answered by the socket layer.
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "socket error");
                terminal = TunnelState::Errored;
                break;
            }
        }
    }

    shared.transition(terminal);
    shared
        .pending
        .drain_with_error(|| TunnelError::ConnectionClosed);
}

/// Reassemble one inbound chunk and dispatch every frame it completes.
fn on_chunk(shared: &Shared, reassembler: &mut FrameBuffer, chunk: &[u8]) -> Result<()> {
    for frame in reassembler.push(chunk)? {
        dispatch(shared, decode_message(frame.payload())?);
    }
    Ok(())
}

fn dispatch(shared: &Shared, msg: Message) {
    match msg {
        Message::Response(rsp) => {
            let id = rsp.id;
            if let Err(e) = shared.pending.resolve(rsp) {
                // Duplicate or late delivery; non-fatal.
                tracing::warn!(id, error = %e, "dropping response");
            }
        }
        Message::Request(req) => handle_inbound_request(&req),
    }
}

/// Dispatch point reserved for far-end-initiated requests. Only the
/// client-issues/server-answers direction exists today, so these are
/// logged and dropped.
fn handle_inbound_request(req: &Request) {
    tracing::warn!(
        id = req.id,
        verb = %req.verb,
        path = %req.path,
        "inbound request tunneling not supported, dropping"
    );
}

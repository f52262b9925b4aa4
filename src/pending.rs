//! Pending request table: at-most-one-resolution correlation store.
//!
//! Every issued request registers a oneshot entry keyed by its transaction
//! id. The read loop resolves entries as responses arrive; teardown drains
//! whatever is left so no caller hangs. A drained table refuses further
//! registrations; a request racing the teardown would otherwise suspend
//! on an entry nothing will ever resolve.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::{Result, TunnelError};
use crate::protocol::Response;

/// What a pending entry eventually yields to its suspended caller.
pub(crate) type PendingResult = std::result::Result<Response, TunnelError>;

#[derive(Default)]
struct Table {
    entries: HashMap<u64, oneshot::Sender<PendingResult>>,
    closed: bool,
}

/// Correlation store keyed by transaction id.
///
/// Entries resolve exactly once: `resolve`, `discard`, and `drain_with_error`
/// all remove the entry, and the oneshot sender is consumed on use.
#[derive(Default)]
pub(crate) struct PendingTable {
    inner: Mutex<Table>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a pending entry for `id` and return the receiver the caller
    /// suspends on.
    ///
    /// Fails with `ConnectionClosed` once the table has been drained, and
    /// with `DuplicateId` if `id` is already present (unreachable with
    /// monotonic allocation, but guarded regardless).
    pub(crate) fn register(&self, id: u64) -> Result<oneshot::Receiver<PendingResult>> {
        let (tx, rx) = oneshot::channel();

        let mut inner = self.inner.lock().expect("pending table poisoned");
        if inner.closed {
            return Err(TunnelError::ConnectionClosed);
        }
        if inner.entries.contains_key(&id) {
            return Err(TunnelError::DuplicateId(id));
        }
        inner.entries.insert(id, tx);

        Ok(rx)
    }

    /// Resolve the entry matching `response.id` and remove it.
    ///
    /// An unregistered id yields `UnmatchedResponse` so the dispatcher can
    /// log it; the table itself is unchanged and the error is non-fatal.
    pub(crate) fn resolve(&self, response: Response) -> Result<()> {
        let sender = {
            let mut inner = self.inner.lock().expect("pending table poisoned");
            inner.entries.remove(&response.id)
        };

        match sender {
            Some(tx) => {
                // Receiver may already be gone (caller timed out and dropped);
                // resolution then becomes a no-op.
                let _ = tx.send(Ok(response));
                Ok(())
            }
            None => Err(TunnelError::UnmatchedResponse(response.id)),
        }
    }

    /// Remove an entry without resolving it. Used by the timeout and
    /// cancellation paths; a response arriving later is then unmatched.
    pub(crate) fn discard(&self, id: u64) {
        let mut inner = self.inner.lock().expect("pending table poisoned");
        inner.entries.remove(&id);
    }

    /// Resolve every remaining entry with an error and refuse new
    /// registrations. Called on teardown so no suspended caller hangs.
    pub(crate) fn drain_with_error<F>(&self, err: F)
    where
        F: Fn() -> TunnelError,
    {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock().expect("pending table poisoned");
            inner.closed = true;
            inner.entries.drain().collect()
        };

        for (id, tx) in drained {
            tracing::debug!(id, "failing pending request on teardown");
            let _ = tx.send(Err(err()));
        }
    }

    /// Number of in-flight entries.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("pending table poisoned").entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: u64) -> Response {
        Response {
            id,
            status: 200,
            message: "OK".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_register_then_resolve() {
        let table = PendingTable::new();
        let rx = table.register(1).unwrap();

        table.resolve(response(1)).unwrap();

        let got = rx.await.unwrap().unwrap();
        assert_eq!(got.id, 1);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let table = PendingTable::new();
        let _rx = table.register(7).unwrap();

        let result = table.register(7);
        assert!(matches!(result, Err(TunnelError::DuplicateId(7))));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_unregistered_id_is_unmatched() {
        let table = PendingTable::new();

        let result = table.resolve(response(99));
        assert!(matches!(result, Err(TunnelError::UnmatchedResponse(99))));
    }

    #[tokio::test]
    async fn test_resolve_is_exactly_once() {
        let table = PendingTable::new();
        let rx = table.register(1).unwrap();

        table.resolve(response(1)).unwrap();
        // Second delivery for the same id finds no entry.
        let result = table.resolve(response(1));
        assert!(matches!(result, Err(TunnelError::UnmatchedResponse(1))));

        let got = rx.await.unwrap().unwrap();
        assert_eq!(got.id, 1);
    }

    #[tokio::test]
    async fn test_discard_makes_later_response_unmatched() {
        let table = PendingTable::new();
        let rx = table.register(3).unwrap();

        table.discard(3);
        assert!(matches!(
            table.resolve(response(3)),
            Err(TunnelError::UnmatchedResponse(3))
        ));

        // The receiver sees the sender dropped, never a value.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_drain_fails_every_entry() {
        let table = PendingTable::new();
        let rx1 = table.register(1).unwrap();
        let rx2 = table.register(2).unwrap();
        let rx3 = table.register(3).unwrap();

        table.drain_with_error(|| TunnelError::ConnectionClosed);
        assert_eq!(table.len(), 0);

        for rx in [rx1, rx2, rx3] {
            let got = rx.await.unwrap();
            assert!(matches!(got, Err(TunnelError::ConnectionClosed)));
        }
    }

    #[test]
    fn test_register_after_drain_fails() {
        let table = PendingTable::new();
        table.drain_with_error(|| TunnelError::ConnectionClosed);

        let result = table.register(1);
        assert!(matches!(result, Err(TunnelError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_resolve_with_dropped_receiver_is_noop() {
        let table = PendingTable::new();
        let rx = table.register(5).unwrap();
        drop(rx);

        // Entry exists, receiver is gone; resolution must not error or panic.
        table.resolve(response(5)).unwrap();
        assert_eq!(table.len(), 0);
    }
}

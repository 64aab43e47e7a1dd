//! Pending-request tracker: maps an outbound request id to the `oneshot`
//! sender that will wake the caller waiting on [`super::ControlChannel::request`].

use std::collections::HashMap;

use tokio::sync::{oneshot, Mutex};

use super::messages::ControlResponse;

/// `HashMap<request_id, oneshot::Sender<ControlResponse>>` guarded by a
/// `tokio::sync::Mutex` so the reader task and `request()` callers can share
/// it across an `Arc` without a data race.
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<String, oneshot::Sender<ControlResponse>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        PendingRequests {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, id: String, tx: oneshot::Sender<ControlResponse>) {
        self.inner.lock().await.insert(id, tx);
    }

    /// Deliver a response to the waiting caller, if any. Returns `false` if
    /// the id wasn't pending (already completed, cancelled, or never sent) —
    /// callers surface that as a protocol violation rather than a panic.
    pub async fn complete(&self, id: &str, response: ControlResponse) -> bool {
        if let Some(tx) = self.inner.lock().await.remove(id) {
            // Send failure just means the caller already gave up (timeout).
            let _ = tx.send(response);
            true
        } else {
            false
        }
    }

    /// Drop a pending entry without completing it, e.g. after the waiter's
    /// own timeout fired first.
    pub async fn cancel(&self, id: &str) {
        self.inner.lock().await.remove(id);
    }

    /// Number of requests still awaiting a response. Used by the session
    /// runtime to decide whether it's safe to tear down the control channel.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_wakes_waiter() {
        let pending = PendingRequests::new();
        let (tx, rx) = oneshot::channel();
        pending.insert("req-1".to_string(), tx).await;

        let completed = pending
            .complete(
                "req-1",
                ControlResponse::success("req-1", serde_json::json!({"ok": true})),
            )
            .await;
        assert!(completed);

        let response = rx.await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn complete_unknown_id_returns_false() {
        let pending = PendingRequests::new();
        let completed = pending
            .complete("missing", ControlResponse::success("req-1", serde_json::json!({})))
            .await;
        assert!(!completed);
    }

    #[tokio::test]
    async fn cancel_removes_without_waking() {
        let pending = PendingRequests::new();
        let (tx, rx) = oneshot::channel();
        pending.insert("req-1".to_string(), tx).await;
        pending.cancel("req-1").await;
        assert_eq!(pending.len().await, 0);
        drop(rx);
    }
}

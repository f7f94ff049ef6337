use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use webrig_core_types::{RigError, SessionId};

/// Single-flight queue keyed by session id.
///
/// Backed by one fair async mutex per session: lock waiters are granted in
/// FIFO order, which is exactly the submission-order guarantee the tool
/// surface promises for a single session. Slots are created lazily and
/// pruned when a session closes.
#[derive(Debug, Default)]
pub struct SessionGate {
    slots: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, session: &SessionId) -> Arc<Mutex<()>> {
        self.slots
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `op` holding the session's slot, with an optional timeout budget.
    ///
    /// A budget overrun surfaces as [`RigError::Timeout`]. The underlying
    /// work is not guaranteed to have stopped; the caller must not assume the
    /// driver handle is idle afterwards, and the next operation on this
    /// session queues behind whatever the backend is still doing.
    pub async fn run<T, F>(
        &self,
        session: &SessionId,
        operation: &str,
        budget: Option<Duration>,
        op: F,
    ) -> Result<T, RigError>
    where
        F: Future<Output = Result<T, RigError>>,
    {
        let slot = self.slot(session);
        let _guard = slot.lock().await;
        debug!(session = %session, operation, "session slot acquired");
        match budget {
            Some(limit) => match timeout(limit, op).await {
                Ok(result) => result,
                Err(_) => Err(RigError::timeout(operation, limit.as_millis() as u64)),
            },
            None => op.await,
        }
    }

    /// Drop the slot for a closed session. In-flight holders keep their
    /// guard; later calls would lazily recreate the slot, so this is only
    /// housekeeping.
    pub fn forget(&self, session: &SessionId) {
        self.slots.remove(session);
    }

    pub fn tracked(&self) -> usize {
        self.slots.len()
    }
}

//! Snapshot sync driver
//!
//! Pumps a store subscription into the registry. Each snapshot overwrites
//! the entries it mentions; last applied wins regardless of how it orders
//! against in-flight local writes. A closed subscription is not retried.

use crate::error::StoreError;
use crate::registry::SessionRegistry;
use crate::store::SessionStore;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a running sync task
///
/// Dropping the handle leaves the task running; call [`SyncHandle::stop`]
/// to unsubscribe.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<()>,
    applied: watch::Receiver<u64>,
}

impl SyncHandle {
    /// Subscribe to `collection` and start applying snapshots to `registry`
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - any error from [`SessionStore::subscribe`]
    pub fn start(
        store: &dyn SessionStore,
        registry: Arc<SessionRegistry>,
        collection: &str,
    ) -> Result<Self, StoreError> {
        let mut subscription = store.subscribe(collection)?;
        let (applied_tx, applied_rx) = watch::channel(0u64);
        let collection = collection.to_string();
        tracing::info!(collection = %collection, subscription = %subscription.id(), "sync started");

        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let sessions = snapshot.as_ref().map_or(0, |s| s.len());
                let replaced = registry.apply_remote(snapshot);
                tracing::debug!(collection = %collection, sessions, replaced, "snapshot applied");
                applied_tx.send_modify(|n| *n += 1);
            }
            tracing::warn!(collection = %collection, "subscription closed, sync stopped");
        });

        Ok(Self {
            task,
            applied: applied_rx,
        })
    }

    /// Snapshots applied so far
    #[inline]
    #[must_use]
    pub fn applied(&self) -> u64 {
        *self.applied.borrow()
    }

    /// Wait until at least `count` snapshots have been applied
    ///
    /// Returns `false` if the sync task ended first.
    #[allow(clippy::let_and_return)]
    pub async fn wait_for_applied(&self, count: u64) -> bool {
        let mut rx = self.applied.clone();
        let reached = rx.wait_for(|n| *n >= count).await.is_ok();
        reached
    }

    /// Check if the sync task is still running
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop syncing and unsubscribe
    pub async fn stop(self) {
        self.task.abort();
        // the aborted task drops its subscription, which runs the teardown
        let _ = self.task.await;
        tracing::info!("sync stopped");
    }
}

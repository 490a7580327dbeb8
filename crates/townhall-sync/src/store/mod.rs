//! Session store contract
//!
//! The realtime document store is an external collaborator. The core only
//! needs two capabilities from it:
//! - [`SessionStore::subscribe`]: a cancellable stream of full snapshots of
//!   a collection (every session, keyed by code)
//! - [`SessionStore::write`]: overwrite one session document
//!
//! Documents live at `<collection>/<code>`. Writes replace the whole
//! document; there is no field-level patching on the wire.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use futures::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use townhall_core::{Session, SessionCode};
use ulid::Ulid;

/// Every session in a collection, keyed by code
pub type SessionMap = BTreeMap<SessionCode, Session>;

/// One subscription delivery; `None` when the collection holds no data
pub type Snapshot = Option<SessionMap>;

/// Realtime document store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Subscribe to full snapshots of `collection`
    ///
    /// The current state is delivered first, then one snapshot per change.
    ///
    /// # Errors
    /// - `StoreError::Unavailable` if the store cannot be reached
    fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError>;

    /// Overwrite the document at `path` with `session`
    ///
    /// # Errors
    /// - `StoreError::WriteFailed` if the backend rejects the write
    async fn write(&self, path: &DocumentPath, session: &Session) -> Result<(), StoreError>;
}

/// Path of one session document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: String,
    code: SessionCode,
}

impl DocumentPath {
    /// Path of `code` within `collection`
    #[must_use]
    pub fn new(collection: &str, code: SessionCode) -> Self {
        Self {
            collection: collection.trim_matches('/').to_string(),
            code,
        }
    }

    /// Collection segment
    #[inline]
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Session code segment
    #[inline]
    #[must_use]
    pub fn code(&self) -> &SessionCode {
        &self.code
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.code)
    }
}

/// Unique subscription identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub Ulid);

impl SubscriptionId {
    /// Generate new subscription ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Teardown = Box<dyn FnOnce(SubscriptionId) + Send>;

/// Cancellable stream of snapshots
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// runs the store's teardown so it stops fanning out to this receiver.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    teardown: Option<Teardown>,
}

impl Subscription {
    /// Wrap a receiver fed by the store
    #[must_use]
    pub fn new(id: SubscriptionId, rx: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self {
            id,
            rx,
            teardown: None,
        }
    }

    /// Run `teardown` when the subscription ends
    #[must_use]
    pub fn with_teardown(mut self, teardown: impl FnOnce(SubscriptionId) + Send + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Subscription ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next snapshot
    ///
    /// # Errors
    /// - `StoreError::SubscriptionClosed` once the store side is gone
    pub async fn next_snapshot(&mut self) -> Result<Snapshot, StoreError> {
        self.rx.recv().await.ok_or(StoreError::SubscriptionClosed)
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown(self.id);
        }
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("teardown", &self.teardown.is_some())
            .finish_non_exhaustive()
    }
}

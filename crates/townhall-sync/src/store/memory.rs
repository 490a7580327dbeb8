//! In-process realtime store
//!
//! Holds JSON documents per collection and fans a full decoded snapshot out
//! to every subscriber of a collection after each write. Several facades
//! sharing one [`MemoryStore`] behave like several devices attached to the
//! same backend.

use super::{DocumentPath, SessionMap, SessionStore, Snapshot, Subscription, SubscriptionId};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use townhall_core::{Session, SessionCode};

type Collection = BTreeMap<String, Value>;

#[derive(Debug)]
struct Subscriber {
    collection: String,
    tx: mpsc::UnboundedSender<Snapshot>,
}

/// In-memory document store with push subscriptions
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// collection -> code -> JSON document
    documents: RwLock<BTreeMap<String, Collection>>,
    /// Live subscribers
    subscribers: Arc<DashMap<SubscriptionId, Subscriber>>,
    /// Simulated network delay before a write lands
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every write by `latency`
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Raw JSON document at `path`
    #[must_use]
    pub fn document(&self, path: &DocumentPath) -> Option<Value> {
        self.documents
            .read()
            .get(path.collection())
            .and_then(|c| c.get(path.code().as_str()))
            .cloned()
    }

    /// Store a raw JSON document and notify subscribers
    ///
    /// Bypasses encoding, so callers can place documents other clients
    /// wrote, malformed ones included.
    pub fn put_raw(&self, collection: &str, code: &str, document: Value) {
        let collection = collection.trim_matches('/');
        self.documents
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(code.to_string(), document);
        self.notify(collection);
    }

    /// Number of live subscriptions
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Decoded snapshot of `collection`
    #[must_use]
    pub fn snapshot(&self, collection: &str) -> Snapshot {
        let documents = self.documents.read();
        documents
            .get(collection.trim_matches('/'))
            .and_then(decode_collection)
    }

    fn notify(&self, collection: &str) {
        let snapshot = self.snapshot(collection);
        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            if entry.collection != collection {
                continue;
            }
            if entry.tx.send(snapshot.clone()).is_err() {
                closed.push(*entry.key());
            }
        }
        for id in closed {
            self.subscribers.remove(&id);
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        let collection = collection.trim_matches('/').to_string();
        let id = SubscriptionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        // current state first
        let _ = tx.send(self.snapshot(&collection));
        self.subscribers.insert(id, Subscriber { collection, tx });
        tracing::debug!(subscription = %id, "subscriber attached");

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(id, rx).with_teardown(move |id| {
            subscribers.remove(&id);
            tracing::debug!(subscription = %id, "subscriber detached");
        }))
    }

    async fn write(&self, path: &DocumentPath, session: &Session) -> Result<(), StoreError> {
        let document = serde_json::to_value(session)?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.documents
            .write()
            .entry(path.collection().to_string())
            .or_default()
            .insert(path.code().to_string(), document);
        self.notify(path.collection());
        Ok(())
    }
}

/// Decode every document, skipping ones that are not valid sessions
fn decode_collection(collection: &Collection) -> Snapshot {
    if collection.is_empty() {
        return None;
    }
    let mut sessions = SessionMap::new();
    for (key, document) in collection {
        let code: SessionCode = match key.parse() {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping document with invalid code");
                continue;
            }
        };
        match serde_json::from_value::<Session>(document.clone()) {
            Ok(mut session) => {
                // the path is authoritative for the code
                session.code = code.clone();
                sessions.insert(code, session);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "skipping undecodable session document");
            }
        }
    }
    Some(sessions)
}

//! Testing utilities for the townhall workspace
//!
//! Shared fakes, fixtures, and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use townhall_core::{poll, PollDraft, PollId, Session, SessionCode};
use townhall_sync::{
    DocumentPath, LiveConfig, MemoryStore, SessionFacade, SessionRegistry, SessionStore,
    StoreError, Subscription,
};

/// Store that rejects every write and cannot be subscribed to
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: Mutex<usize>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    fn subscribe(&self, _collection: &str) -> Result<Subscription, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn write(&self, path: &DocumentPath, _session: &Session) -> Result<(), StoreError> {
        *self.attempts.lock() += 1;
        Err(StoreError::write_failed(path, "injected failure"))
    }
}

/// [`MemoryStore`] that also records every write it receives
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(DocumentPath, Session)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(DocumentPath, Session)> {
        self.writes.lock().clone()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        self.inner.subscribe(collection)
    }

    async fn write(&self, path: &DocumentPath, session: &Session) -> Result<(), StoreError> {
        self.writes.lock().push((path.clone(), session.clone()));
        self.inner.write(path, session).await
    }
}

pub fn code(s: &str) -> SessionCode {
    s.parse().unwrap()
}

pub fn empty_session(code_str: &str, title: &str) -> Session {
    Session::new(code(code_str), title, Utc::now())
}

/// Session holding one draft poll; returns the poll id
pub fn session_with_poll(code_str: &str, prompt: &str, options: &[&str]) -> (Session, PollId) {
    let session = empty_session(code_str, "Polls");
    let id = PollId::from("p100");
    let patch = poll::create_poll(
        &session,
        PollDraft::new(prompt, options.iter().copied()),
        id.clone(),
    )
    .unwrap();
    (session.with_patch(patch), id)
}

/// Facade over a fresh registry (demo seeded) and the given store
pub fn facade_with_store(store: Arc<dyn SessionStore>) -> SessionFacade {
    let config = LiveConfig::default();
    SessionFacade::new(Arc::new(SessionRegistry::new(&config)), store, config)
}

/// Two facades, like two devices, sharing one [`MemoryStore`]
pub fn facade_pair(store: &Arc<MemoryStore>) -> (SessionFacade, SessionFacade) {
    let a = facade_with_store(Arc::clone(store) as Arc<dyn SessionStore>);
    let b = facade_with_store(Arc::clone(store) as Arc<dyn SessionStore>);
    (a, b)
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

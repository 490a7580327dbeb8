//! Session mutation facade
//!
//! The one path every local change takes:
//! 1. read the current session from the registry
//! 2. compute a [`SessionPatch`] with the question/poll engines
//! 3. apply it to the registry (optimistic, visible immediately)
//! 4. spawn a full-document write of the updated session to the store
//!
//! Steps 1-3 run under a single registry write lock and are
//! all-or-nothing; a rejected mutation leaves the registry
//! untouched and issues no write. Step 4 never fails the mutation: write
//! errors are logged and counted, not rolled back and not retried.

use crate::config::LiveConfig;
use crate::error::{MutationError, StoreError};
use crate::registry::SessionRegistry;
use crate::store::{DocumentPath, SessionStore};
use crate::sync::SyncHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use townhall_core::{
    poll, question, rank, EngineError, IdClock, NotFoundError, OptionId, PollDraft, PollId,
    Question, QuestionDraft, QuestionId, Role, Session, SessionCode, SessionPatch,
};

/// One local change to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Submit a question
    AddQuestion(QuestionDraft),
    /// Add one like
    LikeQuestion(QuestionId),
    /// Flip the answered flag
    ToggleAnswered(QuestionId),
    /// Remove a question
    DeleteQuestion(QuestionId),
    /// Append a draft poll
    CreatePoll(PollDraft),
    /// Make a poll the active one
    ActivatePoll(PollId),
    /// End the active poll
    StopPoll,
    /// Count one vote
    Vote {
        /// Poll voted in
        poll: PollId,
        /// Option chosen
        option: OptionId,
    },
}

impl Mutation {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddQuestion(_) => "add_question",
            Self::LikeQuestion(_) => "like_question",
            Self::ToggleAnswered(_) => "toggle_answered",
            Self::DeleteQuestion(_) => "delete_question",
            Self::CreatePoll(_) => "create_poll",
            Self::ActivatePoll(_) => "activate_poll",
            Self::StopPoll => "stop_poll",
            Self::Vote { .. } => "vote",
        }
    }
}

/// A session as seen by one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedSession {
    /// Current local copy
    pub session: Session,
    /// Role the client holds
    pub role: Role,
}

/// Store write outcomes since the facade was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Writes the store acknowledged
    pub succeeded: usize,
    /// Writes that failed (local state kept)
    pub failed: usize,
    /// Writes issued but not yet finished
    pub pending: usize,
}

#[derive(Debug, Default)]
struct WriteCounters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Entry point for all local session mutations
pub struct SessionFacade {
    registry: Arc<SessionRegistry>,
    store: Option<Arc<dyn SessionStore>>,
    config: LiveConfig,
    clock: IdClock,
    pending: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<WriteCounters>,
}

impl SessionFacade {
    /// Create facade backed by `store`
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn SessionStore>,
        config: LiveConfig,
    ) -> Self {
        Self::build(registry, Some(store), config)
    }

    /// Create facade with no store
    ///
    /// Mutations apply to the registry only and are never persisted or
    /// propagated.
    #[must_use]
    pub fn local_only(registry: Arc<SessionRegistry>, config: LiveConfig) -> Self {
        tracing::warn!(error = %StoreError::Unavailable, "running in local-only mode");
        Self::build(registry, None, config)
    }

    fn build(
        registry: Arc<SessionRegistry>,
        store: Option<Arc<dyn SessionStore>>,
        config: LiveConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            clock: IdClock::new(),
            pending: Mutex::new(Vec::new()),
            counters: Arc::new(WriteCounters::default()),
        }
    }

    /// Registry this facade writes to
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Check if no store is attached
    #[inline]
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.store.is_none()
    }

    /// Start applying store snapshots to the registry
    ///
    /// # Errors
    /// - `StoreError::Unavailable` in local-only mode
    /// - any error from [`SessionStore::subscribe`]
    pub fn start_sync(&self) -> Result<SyncHandle, StoreError> {
        let store = self.store.as_ref().ok_or(StoreError::Unavailable)?;
        SyncHandle::start(
            store.as_ref(),
            Arc::clone(&self.registry),
            &self.config.collection_path,
        )
    }

    /// Create a session and join it as host
    pub fn create_session(&self, title: &str) -> JoinedSession {
        let session = self.registry.create_session(title);
        tracing::info!(code = %session.code, title = %session.title, "session created");
        self.push(&session);
        JoinedSession {
            session,
            role: Role::Host,
        }
    }

    /// Join an existing session
    ///
    /// # Errors
    /// - `MutationError::Validation` if `code` is not a numeral string
    /// - `MutationError::NotFound` if no session has `code`
    pub fn join(&self, code: &str, role: Role) -> Result<JoinedSession, MutationError> {
        let code: SessionCode = code.parse()?;
        let session = self.require(&code)?;
        tracing::debug!(code = %code, ?role, "joined session");
        Ok(JoinedSession { session, role })
    }

    /// Current local copy of a session
    #[must_use]
    pub fn session(&self, code: &SessionCode) -> Option<Session> {
        self.registry.get(code)
    }

    /// Questions of a session in display order
    #[must_use]
    pub fn ranked_questions(&self, code: &SessionCode) -> Option<Vec<Question>> {
        let session = self.registry.get(code)?;
        Some(rank(&session.questions).into_iter().cloned().collect())
    }

    /// Apply one mutation to the session for `code`
    ///
    /// The patch is computed from and merged onto the same registry entry
    /// under one lock, so a snapshot arriving concurrently either lands
    /// before the mutation sees the session or after it is merged. On
    /// success the registry already holds the returned session and a store
    /// write has been issued.
    ///
    /// # Errors
    /// - `MutationError::NotFound` for an unknown session, question, poll or option
    /// - `MutationError::Validation` for a rejected payload
    /// - `MutationError::Transition` for an illegal poll status change
    pub fn apply(&self, code: &SessionCode, mutation: Mutation) -> Result<Session, MutationError> {
        let kind = mutation.kind();
        let updated = self
            .registry
            .update(code, |current| self.patch_for(current, mutation).map_err(MutationError::from))
            .map_err(|e| {
                tracing::debug!(code = %code, mutation = kind, error = %e, "mutation rejected");
                e
            })?;
        tracing::debug!(code = %code, mutation = kind, "mutation applied");
        self.push(&updated);
        Ok(updated)
    }

    /// Submit a question
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn add_question(
        &self,
        code: &SessionCode,
        text: &str,
        author: Option<&str>,
    ) -> Result<Session, MutationError> {
        let mut draft = QuestionDraft::new(text);
        if let Some(author) = author {
            draft = draft.with_author(author);
        }
        self.apply(code, Mutation::AddQuestion(draft))
    }

    /// Add one like to a question
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn like_question(&self, code: &SessionCode, id: QuestionId) -> Result<Session, MutationError> {
        self.apply(code, Mutation::LikeQuestion(id))
    }

    /// Flip a question's answered flag
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn toggle_answered(
        &self,
        code: &SessionCode,
        id: QuestionId,
    ) -> Result<Session, MutationError> {
        self.apply(code, Mutation::ToggleAnswered(id))
    }

    /// Remove a question
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn delete_question(
        &self,
        code: &SessionCode,
        id: QuestionId,
    ) -> Result<Session, MutationError> {
        self.apply(code, Mutation::DeleteQuestion(id))
    }

    /// Create a draft poll
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn create_poll<I, S>(
        &self,
        code: &SessionCode,
        prompt: &str,
        options: I,
    ) -> Result<Session, MutationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(code, Mutation::CreatePoll(PollDraft::new(prompt, options)))
    }

    /// Activate a poll
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn activate_poll(&self, code: &SessionCode, id: &PollId) -> Result<Session, MutationError> {
        self.apply(code, Mutation::ActivatePoll(id.clone()))
    }

    /// End the active poll
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn stop_poll(&self, code: &SessionCode) -> Result<Session, MutationError> {
        self.apply(code, Mutation::StopPoll)
    }

    /// Vote for an option
    ///
    /// # Errors
    /// See [`Self::apply`].
    pub fn vote(
        &self,
        code: &SessionCode,
        poll: &PollId,
        option: &OptionId,
    ) -> Result<Session, MutationError> {
        self.apply(
            code,
            Mutation::Vote {
                poll: poll.clone(),
                option: option.clone(),
            },
        )
    }

    /// Wait for every issued store write to finish
    pub async fn flush(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.pending.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "store write task did not complete");
            }
        }
    }

    /// Write outcome counters
    #[must_use]
    pub fn write_stats(&self) -> WriteStats {
        let pending = self.pending.lock().iter().filter(|h| !h.is_finished()).count();
        WriteStats {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pending,
        }
    }

    fn require(&self, code: &SessionCode) -> Result<Session, NotFoundError> {
        self.registry
            .get(code)
            .ok_or_else(|| NotFoundError::Session(code.clone()))
    }

    fn patch_for(&self, session: &Session, mutation: Mutation) -> Result<SessionPatch, EngineError> {
        match mutation {
            Mutation::AddQuestion(draft) => {
                let created = self.clock.next_millis();
                question::add_question_with_author(
                    session,
                    draft,
                    QuestionId(created),
                    created,
                    &self.config.default_author,
                )
            }
            Mutation::LikeQuestion(id) => question::like_question(session, id),
            Mutation::ToggleAnswered(id) => question::toggle_answered(session, id),
            Mutation::DeleteQuestion(id) => question::delete_question(session, id),
            Mutation::CreatePoll(draft) => {
                let id = PollId::from_millis(self.clock.next_millis());
                poll::create_poll(session, draft, id)
            }
            Mutation::ActivatePoll(id) => poll::activate_poll(session, &id),
            Mutation::StopPoll => Ok(poll::stop_poll(session)),
            Mutation::Vote { poll, option } => poll::vote(session, &poll, &option),
        }
    }

    /// Spawn a full-document write of `session`
    fn push(&self, session: &Session) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(code = %session.code, error = %e, "no runtime, store write skipped");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let store = Arc::clone(store);
        let counters = Arc::clone(&self.counters);
        let path = DocumentPath::new(&self.config.collection_path, session.code.clone());
        let session = session.clone();
        let handle = runtime.spawn(async move {
            match store.write(&path, &session).await {
                Ok(()) => {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(path = %path, "store write acknowledged");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(path = %path, error = %e, "store write failed, keeping local state");
                }
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

impl std::fmt::Debug for SessionFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFacade")
            .field("registry", &self.registry)
            .field("local_only", &self.is_local_only())
            .field("config", &self.config)
            .field("write_stats", &self.write_stats())
            .finish_non_exhaustive()
    }
}

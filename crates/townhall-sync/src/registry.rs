//! Session registry
//!
//! In-memory authority for the local copy of every known session. Local
//! mutations land here first; remote snapshots overwrite entries wholesale.
//! Sessions the snapshot does not mention are kept, so a partial remote read
//! never drops the demo session or locally created ones.

use crate::config::LiveConfig;
use crate::store::{SessionMap, Snapshot};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use townhall_core::{
    demo_code, demo_session, NotFoundError, Session, SessionCode, SessionPatch,
};

/// Draws allowed to steer a new code away from the seeded demo session
const DEMO_REDRAWS: u32 = 32;

/// Registry of sessions keyed by code
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<SessionMap>,
    code_min: u32,
    code_max: u32,
    collision_retries: u32,
    default_title: String,
}

impl SessionRegistry {
    /// Create registry from configuration, seeding the demo session if enabled
    #[must_use]
    pub fn new(config: &LiveConfig) -> Self {
        let registry = Self {
            sessions: RwLock::new(SessionMap::new()),
            code_min: config.code_min,
            code_max: config.code_max,
            collision_retries: config.code_collision_retries,
            default_title: config.default_title.clone(),
        };
        if config.seed_demo {
            registry.insert(demo_session(Utc::now()));
        }
        registry
    }

    /// Look up a session
    #[must_use]
    pub fn get(&self, code: &SessionCode) -> Option<Session> {
        self.sessions.read().get(code).cloned()
    }

    /// Check if a session exists
    #[inline]
    #[must_use]
    pub fn contains(&self, code: &SessionCode) -> bool {
        self.sessions.read().contains_key(code)
    }

    /// Known session codes in order
    #[must_use]
    pub fn codes(&self) -> Vec<SessionCode> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Copy of every session
    #[must_use]
    pub fn snapshot(&self) -> SessionMap {
        self.sessions.read().clone()
    }

    /// Number of sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Insert or replace a session
    pub fn insert(&self, session: Session) {
        self.sessions.write().insert(session.code.clone(), session);
    }

    /// Create and insert a new empty session with a random code
    pub fn create_session(&self, title: &str) -> Session {
        self.create_session_with(title, Utc::now(), &mut rand::rng())
    }

    /// Create and insert a new session using the given clock reading and rng
    ///
    /// The demo code is never drawn while the demo session is present. Any
    /// other collision is only checked when `code_collision_retries > 0`;
    /// with the default of 0 a taken code replaces the existing session.
    pub fn create_session_with<R: Rng + ?Sized>(
        &self,
        title: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Session {
        let mut sessions = self.sessions.write();
        let mut code = self.draw_code(&sessions, rng);
        let mut attempts = 0;
        while attempts < self.collision_retries && sessions.contains_key(&code) {
            tracing::debug!(code = %code, attempt = attempts + 1, "session code taken, regenerating");
            code = self.draw_code(&sessions, rng);
            attempts += 1;
        }
        if sessions.contains_key(&code) {
            tracing::warn!(code = %code, "new session replaces an existing one with the same code");
        }

        let session = Session::with_default_title(code, title, &self.default_title, now);
        sessions.insert(session.code.clone(), session.clone());
        session
    }

    fn draw_code<R: Rng + ?Sized>(&self, sessions: &SessionMap, rng: &mut R) -> SessionCode {
        let demo = demo_code();
        let mut code = SessionCode::generate(rng, self.code_min, self.code_max);
        for _ in 0..DEMO_REDRAWS {
            if code != demo || !sessions.contains_key(&demo) {
                break;
            }
            code = SessionCode::generate(rng, self.code_min, self.code_max);
        }
        code
    }

    /// Overwrite entries with a remote snapshot
    ///
    /// Every session in the snapshot replaces the local entry; codes absent
    /// from the snapshot are kept. An empty or missing snapshot changes
    /// nothing. Returns how many entries were written.
    pub fn apply_remote(&self, snapshot: Snapshot) -> usize {
        let Some(remote) = snapshot else {
            return 0;
        };
        let count = remote.len();
        let mut sessions = self.sessions.write();
        for (code, session) in remote {
            sessions.insert(code, session);
        }
        tracing::trace!(replaced = count, total = sessions.len(), "applied remote snapshot");
        count
    }

    /// Shallow-merge a patch onto the session for `code`
    ///
    /// # Errors
    /// - `NotFoundError::Session` if `code` is unknown
    pub fn apply_local_update(
        &self,
        code: &SessionCode,
        patch: SessionPatch,
    ) -> Result<Session, NotFoundError> {
        let mut sessions = self.sessions.write();
        let current = sessions
            .remove(code)
            .ok_or_else(|| NotFoundError::Session(code.clone()))?;
        let updated = current.with_patch(patch);
        sessions.insert(code.clone(), updated.clone());
        Ok(updated)
    }

    /// Compute a patch from the current session and merge it atomically
    ///
    /// `compute` sees the exact document the patch is merged onto; no remote
    /// snapshot can land in between. When it fails the session is unchanged.
    ///
    /// # Errors
    /// - `NotFoundError::Session` (converted into `E`) if `code` is unknown
    /// - whatever `compute` returns
    pub fn update<E, F>(&self, code: &SessionCode, compute: F) -> Result<Session, E>
    where
        E: From<NotFoundError>,
        F: FnOnce(&Session) -> Result<SessionPatch, E>,
    {
        let mut sessions = self.sessions.write();
        let current = sessions
            .get_mut(code)
            .ok_or_else(|| NotFoundError::Session(code.clone()))?;
        let patch = compute(current)?;
        let updated = current.clone().with_patch(patch);
        *current = updated.clone();
        Ok(updated)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(&LiveConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use townhall_core::{question, EngineError, QuestionDraft, QuestionId};

    fn code(s: &str) -> SessionCode {
        s.parse().unwrap()
    }

    #[derive(Debug, PartialEq, Eq)]
    enum UpdateError {
        Engine(EngineError),
        Missing(NotFoundError),
    }

    impl From<EngineError> for UpdateError {
        fn from(e: EngineError) -> Self {
            Self::Engine(e)
        }
    }

    impl From<NotFoundError> for UpdateError {
        fn from(e: NotFoundError) -> Self {
            Self::Missing(e)
        }
    }

    #[test]
    fn default_registry_holds_demo() {
        let registry = SessionRegistry::default();
        assert!(registry.contains(&demo_code()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn seeding_can_be_disabled() {
        let registry = SessionRegistry::new(&LiveConfig::new().with_seed_demo(false));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_session_shape() {
        let registry = SessionRegistry::default();
        let session = registry.create_session("Standup");

        assert_eq!(session.code.as_str().len(), 4);
        assert!(session.code.as_str().bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(session.title, "Standup");
        assert!(session.questions.is_empty());
        assert!(session.polls.is_empty());
        assert!(session.active_poll.is_none());
        assert_eq!(registry.get(&session.code), Some(session));
    }

    #[test]
    fn create_session_blank_title() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.create_session("").title, "Untitled Session");
    }

    #[test]
    fn collisions_overwrite_without_retries() {
        let config = LiveConfig::new().with_seed_demo(false).with_code_range(5, 5);
        let registry = SessionRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        registry.create_session_with("first", Utc::now(), &mut rng);
        registry.create_session_with("second", Utc::now(), &mut rng);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&code("5")).unwrap().title, "second");
    }

    #[test]
    fn collisions_retry_when_enabled() {
        let config = LiveConfig::new()
            .with_seed_demo(false)
            .with_code_range(1, 2)
            .with_collision_retries(64);
        let registry = SessionRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(3);

        let a = registry.create_session_with("a", Utc::now(), &mut rng);
        let b = registry.create_session_with("b", Utc::now(), &mut rng);

        assert_ne!(a.code, b.code);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn new_sessions_never_take_the_demo_code() {
        let config = LiveConfig::new().with_code_range(2024, 2025);
        let registry = SessionRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let session = registry.create_session_with("Other", Utc::now(), &mut rng);
            assert_eq!(session.code, code("2025"));
        }
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(&demo_code()).unwrap().title,
            "HPG Quarterly Town Hall"
        );
    }

    #[test]
    fn demo_code_is_free_once_demo_is_absent() {
        let config = LiveConfig::new()
            .with_seed_demo(false)
            .with_code_range(2024, 2024);
        let registry = SessionRegistry::new(&config);
        let session = registry.create_session("Mine");
        assert_eq!(session.code, demo_code());
    }

    #[test]
    fn update_merges_onto_current_document() {
        let registry = SessionRegistry::default();
        let updated = registry
            .update(&demo_code(), |s| {
                question::like_question(s, QuestionId(2)).map_err(UpdateError::from)
            })
            .unwrap();
        assert_eq!(updated.question(QuestionId(2)).unwrap().likes, 13);
        assert_eq!(registry.get(&demo_code()), Some(updated));
    }

    #[test]
    fn update_failure_leaves_session_unchanged() {
        let registry = SessionRegistry::default();
        let before = registry.snapshot();

        let err = registry
            .update(&demo_code(), |s| {
                question::like_question(s, QuestionId(404)).map_err(UpdateError::from)
            })
            .unwrap_err();
        assert!(matches!(err, UpdateError::Engine(_)));

        let err = registry
            .update(&code("9999"), |_| Ok::<_, UpdateError>(SessionPatch::new()))
            .unwrap_err();
        assert_eq!(
            err,
            UpdateError::Missing(NotFoundError::Session(code("9999")))
        );
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn apply_remote_keeps_unmentioned_sessions() {
        let registry = SessionRegistry::default();
        let local = registry.create_session("Local");

        let mut remote = SessionMap::new();
        let other = Session::new(code("7777"), "Remote", Utc::now());
        remote.insert(other.code.clone(), other);

        assert_eq!(registry.apply_remote(Some(remote)), 1);
        assert!(registry.contains(&demo_code()));
        assert!(registry.contains(&local.code));
        assert!(registry.contains(&code("7777")));
    }

    #[test]
    fn apply_remote_replaces_whole_entry() {
        let registry = SessionRegistry::default();
        let mut remote_demo = registry.get(&demo_code()).unwrap();
        remote_demo.questions.clear();
        remote_demo.title = "Renamed".to_string();

        let mut remote = SessionMap::new();
        remote.insert(demo_code(), remote_demo.clone());
        registry.apply_remote(Some(remote));

        assert_eq!(registry.get(&demo_code()), Some(remote_demo));
    }

    #[test]
    fn apply_remote_none_is_noop() {
        let registry = SessionRegistry::default();
        let before = registry.snapshot();
        assert_eq!(registry.apply_remote(None), 0);
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn apply_local_update_replaces_lists_wholesale() {
        let registry = SessionRegistry::default();
        let demo = registry.get(&demo_code()).unwrap();
        let patch = question::add_question(
            &demo,
            QuestionDraft::new("New one"),
            QuestionId(99),
            99,
        )
        .unwrap();

        let updated = registry.apply_local_update(&demo_code(), patch).unwrap();
        assert_eq!(updated.questions.len(), demo.questions.len() + 1);
        assert_eq!(updated.polls, demo.polls);
        assert_eq!(registry.get(&demo_code()), Some(updated));
    }

    #[test]
    fn apply_local_update_unknown_code() {
        let registry = SessionRegistry::default();
        let err = registry
            .apply_local_update(&code("9999"), SessionPatch::new())
            .unwrap_err();
        assert_eq!(err, NotFoundError::Session(code("9999")));
    }
}

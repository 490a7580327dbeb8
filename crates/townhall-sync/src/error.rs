//! Error types for the sync layer
//!
//! Provides error handling for:
//! - Store writes and subscriptions (never surfaced by mutations)
//! - Configuration loading
//! - Mutations rejected at the facade boundary

use townhall_core::{EngineError, NotFoundError, TransitionError, ValidationError};

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend rejected or lost the write
    #[error("write to {path} failed: {reason}")]
    WriteFailed { path: String, reason: String },

    /// No store reachable
    #[error("session store unavailable")]
    Unavailable,

    /// Document could not be encoded or decoded
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Subscription channel closed by the store
    #[error("subscription closed")]
    SubscriptionClosed,
}

impl StoreError {
    /// Create write failure for path
    pub fn write_failed(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for [`crate::LiveConfig`]
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Mutation rejected at the facade
///
/// All-or-nothing: when one of these is returned the registry is unchanged
/// and no store write was issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// Payload failed a precondition
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Session, question, poll or option does not exist
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Poll status change is not allowed
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),
}

impl MutationError {
    /// Check if error is a validation failure
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if error is an unresolved reference
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<EngineError> for MutationError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => Self::Validation(e),
            EngineError::NotFound(e) => Self::NotFound(e),
            EngineError::Transition(e) => Self::Transition(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use townhall_core::QuestionId;

    #[test]
    fn store_error_display() {
        let err = StoreError::write_failed("events/2024", "timeout");
        assert_eq!(err.to_string(), "write to events/2024 failed: timeout");
    }

    #[test]
    fn engine_errors_map_one_to_one() {
        let err = MutationError::from(EngineError::from(ValidationError::EmptyQuestionText));
        assert!(err.is_validation());

        let err = MutationError::from(EngineError::from(NotFoundError::Question(QuestionId(1))));
        assert!(err.is_not_found());
    }
}

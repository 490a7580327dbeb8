//! Error types for the session document engines
//!
//! Provides the error taxonomy shared by every layer:
//! - Payload validation failures (nothing is applied)
//! - Unresolved references to sessions, questions, polls and options
//! - Illegal poll status transitions
//! - Broken document invariants (reported by [`Session::check_invariants`])
//!
//! [`Session::check_invariants`]: crate::model::Session::check_invariants

use crate::model::PollStatus;
use crate::types::{OptionId, PollId, QuestionId, SessionCode};

/// Minimum number of non-empty options a poll needs
pub const MIN_POLL_OPTIONS: usize = 2;

/// Main engine error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Payload failed a precondition
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Poll status change is not allowed
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),
}

impl EngineError {
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

/// Payload validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Question text empty after trimming
    #[error("question text must not be empty")]
    EmptyQuestionText,

    /// Poll prompt empty after trimming
    #[error("poll question must not be empty")]
    EmptyPollPrompt,

    /// Not enough non-empty options
    #[error("poll needs at least 2 non-empty options, got {found}")]
    TooFewOptions { found: usize },

    /// Session code is not a numeral string
    #[error("invalid session code: {0:?}")]
    InvalidCode(String),
}

/// Unresolved reference errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    /// No session under this code
    #[error("session {0}")]
    Session(SessionCode),

    /// No question with this id
    #[error("question {0}")]
    Question(QuestionId),

    /// No poll with this id
    #[error("poll {0}")]
    Poll(PollId),

    /// Poll exists but the option does not
    #[error("option {option} in poll {poll}")]
    Option { poll: PollId, option: OptionId },
}

/// Illegal poll status transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("poll {poll} cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Poll that was targeted
    pub poll: PollId,
    /// Current status
    pub from: PollStatus,
    /// Requested status
    pub to: PollStatus,
}

/// Broken document invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// More than one poll is active
    #[error("{count} polls are active at once")]
    MultipleActivePolls { count: usize },

    /// `activePoll` is set but no poll is active
    #[error("activePoll is set but no poll has status active")]
    DanglingActivePoll,

    /// A poll is active but `activePoll` is null
    #[error("poll {0} is active but activePoll is null")]
    MissingActivePoll(PollId),

    /// `activePoll` differs from the active poll in `polls`
    #[error("activePoll is out of sync with poll {0}")]
    StaleActivePoll(PollId),

    /// `totalVotes` differs from the option vote sum
    #[error("poll {poll} totalVotes {total} != option sum {sum}")]
    TallyMismatch { poll: PollId, total: u32, sum: u32 },

    /// Poll has fewer than two options
    #[error("poll {0} has fewer than 2 options")]
    TooFewOptions(PollId),
}

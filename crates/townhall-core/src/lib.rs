//! Townhall Core - session document engines
//!
//! The pure half of a live Q&A and polling session:
//! - The replicated [`Session`] document and its wire shape
//! - Question operations and display ranking
//! - The poll lifecycle state machine and vote tallying
//! - Session codes, time-based ids and the demo session
//!
//! Every operation takes the current session by reference and returns a
//! [`SessionPatch`]; applying it never leaves a document half-updated.
//!
//! # Example
//!
//! ```rust,ignore
//! use townhall_core::prelude::*;
//!
//! let session = Session::new(code, "Standup", chrono::Utc::now());
//! let patch = poll::create_poll(&session, PollDraft::new("Rate today", ["Good", "Bad"]), id)?;
//! let session = session.with_patch(patch);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod model;
pub mod poll;
pub mod question;
pub mod ranking;
pub mod seed;
pub mod types;

// Re-exports
pub use error::{
    EngineError, InvariantViolation, NotFoundError, TransitionError, ValidationError,
    MIN_POLL_OPTIONS,
};
pub use model::{
    OptionResult, Poll, PollKind, PollOption, PollStatus, Question, Session, SessionPatch,
    DEFAULT_AUTHOR, DEFAULT_TITLE,
};
pub use poll::PollDraft;
pub use question::QuestionDraft;
pub use ranking::rank;
pub use seed::{demo_code, demo_session, DEMO_CODE};
pub use types::{
    IdClock, OptionId, PollId, QuestionId, Role, SessionCode, DEFAULT_CODE_MAX, DEFAULT_CODE_MIN,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with session documents
    pub use crate::{
        poll, question, rank, EngineError, OptionId, Poll, PollDraft, PollId, PollStatus,
        Question, QuestionDraft, QuestionId, Role, Session, SessionCode, SessionPatch,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Session document model
//!
//! The shared mutable document replicated through the store. One
//! [`Session`] per code, carrying its questions, polls and a denormalized
//! copy of the active poll. Serialized with camelCase keys so the wire shape
//! matches what every connected client reads and writes.

use crate::error::{InvariantViolation, MIN_POLL_OPTIONS};
use crate::types::{OptionId, PollId, QuestionId, SessionCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a session is created without one
pub const DEFAULT_TITLE: &str = "Untitled Session";

/// Author used when a question is submitted without a name
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// One live event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Lookup key and store path segment
    pub code: SessionCode,
    /// Display title
    pub title: String,
    /// Creation time (ISO 8601 on the wire)
    pub created: DateTime<Utc>,
    /// Audience questions; display order comes from [`crate::ranking::rank`]
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Polls in creation order
    #[serde(default)]
    pub polls: Vec<Poll>,
    /// Copy of the poll whose status is `active`, if any
    #[serde(default)]
    pub active_poll: Option<Poll>,
}

impl Session {
    /// Create empty session; blank titles fall back to [`DEFAULT_TITLE`]
    #[must_use]
    pub fn new(code: SessionCode, title: &str, created: DateTime<Utc>) -> Self {
        Self::with_default_title(code, title, DEFAULT_TITLE, created)
    }

    /// Create empty session with a caller-chosen fallback title
    #[must_use]
    pub fn with_default_title(
        code: SessionCode,
        title: &str,
        default_title: &str,
        created: DateTime<Utc>,
    ) -> Self {
        let title = match title.trim() {
            "" => default_title.to_string(),
            t => t.to_string(),
        };
        Self {
            code,
            title,
            created,
            questions: Vec::new(),
            polls: Vec::new(),
            active_poll: None,
        }
    }

    /// Find question by id
    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Find poll by id
    #[must_use]
    pub fn poll(&self, id: &PollId) -> Option<&Poll> {
        self.polls.iter().find(|p| &p.id == id)
    }

    /// Polls currently in `active` status
    pub fn active_polls(&self) -> impl Iterator<Item = &Poll> {
        self.polls.iter().filter(|p| p.status == PollStatus::Active)
    }

    /// Number of questions still waiting for an answer
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.questions.iter().filter(|q| !q.answered).count()
    }

    /// Shallow-merge a patch, replacing whole fields
    #[must_use]
    pub fn with_patch(mut self, patch: SessionPatch) -> Self {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(questions) = patch.questions {
            self.questions = questions;
        }
        if let Some(polls) = patch.polls {
            self.polls = polls;
        }
        if let Some(active_poll) = patch.active_poll {
            self.active_poll = active_poll;
        }
        self
    }

    /// Verify the document invariants
    ///
    /// # Errors
    /// Returns the first violation found: active-poll coupling, tallies, or
    /// option counts.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let active: Vec<&Poll> = self.active_polls().collect();
        match (active.as_slice(), &self.active_poll) {
            ([], None) => {}
            ([], Some(_)) => return Err(InvariantViolation::DanglingActivePoll),
            ([poll], None) => return Err(InvariantViolation::MissingActivePoll(poll.id.clone())),
            ([poll], Some(copy)) => {
                if *poll != copy {
                    return Err(InvariantViolation::StaleActivePoll(poll.id.clone()));
                }
            }
            (many, _) => {
                return Err(InvariantViolation::MultipleActivePolls { count: many.len() })
            }
        }

        for poll in &self.polls {
            let sum = poll.vote_sum();
            if sum != poll.total_votes {
                return Err(InvariantViolation::TallyMismatch {
                    poll: poll.id.clone(),
                    total: poll.total_votes,
                    sum,
                });
            }
            if poll.options.len() < MIN_POLL_OPTIONS {
                return Err(InvariantViolation::TooFewOptions(poll.id.clone()));
            }
        }
        Ok(())
    }
}

/// One audience submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Time-based id
    pub id: QuestionId,
    /// Trimmed, non-empty text
    pub text: String,
    /// Display name
    pub author: String,
    /// Upvotes, only ever incremented
    pub likes: u32,
    /// Set by the host
    pub answered: bool,
    /// Creation time in milliseconds, used for recency tie-breaks
    pub created: i64,
}

/// Poll kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    /// Single-select choice
    #[default]
    Choice,
}

/// Poll lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Created, not yet shown
    #[default]
    Draft,
    /// Accepting votes, mirrored into `activePoll`
    Active,
    /// Closed
    Ended,
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Ended => "ended",
        })
    }
}

/// One voteable question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// `p`-prefixed id
    pub id: PollId,
    /// Kind tag (`"choice"`)
    #[serde(rename = "type", default)]
    pub kind: PollKind,
    /// Prompt
    pub question: String,
    /// Choices in display order
    pub options: Vec<PollOption>,
    /// Sum of all option votes
    pub total_votes: u32,
    /// Lifecycle status
    pub status: PollStatus,
}

impl Poll {
    /// Find option by id
    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| &o.id == id)
    }

    /// Sum of option vote counters
    #[must_use]
    pub fn vote_sum(&self) -> u32 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Rounded share of the vote for `option`, 0 when nobody voted yet
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percentage(&self, option: &PollOption) -> u32 {
        let denominator = f64::from(self.total_votes.max(1));
        (f64::from(option.votes) / denominator * 100.0).round() as u32
    }

    /// Per-option tallies for result display
    #[must_use]
    pub fn results(&self) -> Vec<OptionResult> {
        self.options
            .iter()
            .map(|o| OptionResult {
                option_id: o.id.clone(),
                text: o.text.clone(),
                votes: o.votes,
                percentage: self.percentage(o),
            })
            .collect()
    }
}

/// One selectable choice within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    /// Unique within the poll
    pub id: OptionId,
    /// Trimmed, non-empty text
    pub text: String,
    /// Votes, only ever incremented
    pub votes: u32,
}

/// Display tally for one option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionResult {
    /// Option the tally belongs to
    pub option_id: OptionId,
    /// Option text
    pub text: String,
    /// Raw votes
    pub votes: u32,
    /// Rounded share, see [`Poll::percentage`]
    pub percentage: u32,
}

/// Partial session update
///
/// Each present field replaces the session's field wholesale; list contents
/// are never merged, so callers supply the complete new list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    /// Replacement title
    pub title: Option<String>,
    /// Replacement question list
    pub questions: Option<Vec<Question>>,
    /// Replacement poll list
    pub polls: Option<Vec<Poll>>,
    /// Replacement active poll (`Some(None)` clears it)
    pub active_poll: Option<Option<Poll>>,
}

impl SessionPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the question list
    #[inline]
    #[must_use]
    pub fn questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = Some(questions);
        self
    }

    /// Replace the poll list
    #[inline]
    #[must_use]
    pub fn polls(mut self, polls: Vec<Poll>) -> Self {
        self.polls = Some(polls);
        self
    }

    /// Replace the active poll
    #[inline]
    #[must_use]
    pub fn active_poll(mut self, poll: Option<Poll>) -> Self {
        self.active_poll = Some(poll);
        self
    }

    /// Replace the title
    #[inline]
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Check if the patch changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.questions.is_none()
            && self.polls.is_none()
            && self.active_poll.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn code() -> SessionCode {
        "1234".parse().unwrap()
    }

    fn poll(status: PollStatus, votes: &[u32]) -> Poll {
        Poll {
            id: PollId::from("p1"),
            kind: PollKind::Choice,
            question: "Rate today".to_string(),
            options: votes
                .iter()
                .enumerate()
                .map(|(i, v)| PollOption {
                    id: OptionId::nth(i),
                    text: format!("choice {i}"),
                    votes: *v,
                })
                .collect(),
            total_votes: votes.iter().sum(),
            status,
        }
    }

    #[test]
    fn blank_title_defaults() {
        let session = Session::new(code(), "   ", Utc::now());
        assert_eq!(session.title, DEFAULT_TITLE);
        assert!(session.questions.is_empty());
        assert!(session.polls.is_empty());
        assert!(session.active_poll.is_none());
    }

    #[test]
    fn patch_replaces_only_present_fields() {
        let session = Session::new(code(), "Standup", Utc::now());
        let patched = session
            .clone()
            .with_patch(SessionPatch::new().polls(vec![poll(PollStatus::Draft, &[0, 0])]));

        assert_eq!(patched.title, "Standup");
        assert_eq!(patched.polls.len(), 1);
        assert_eq!(patched.questions, session.questions);
    }

    #[test]
    fn patch_can_clear_active_poll() {
        let mut session = Session::new(code(), "Standup", Utc::now());
        session.active_poll = Some(poll(PollStatus::Active, &[1, 0]));

        let patched = session.with_patch(SessionPatch::new().active_poll(None));
        assert!(patched.active_poll.is_none());
    }

    #[test]
    fn percentage_with_no_votes_is_zero() {
        let p = poll(PollStatus::Draft, &[0, 0]);
        assert!(p.results().iter().all(|r| r.percentage == 0));
    }

    #[test]
    fn percentage_rounds() {
        let p = poll(PollStatus::Draft, &[1, 2]);
        let results = p.results();
        assert_eq!(results[0].percentage, 33);
        assert_eq!(results[1].percentage, 67);
    }

    #[test]
    fn invariants_detect_dangling_active_poll() {
        let mut session = Session::new(code(), "x", Utc::now());
        session.polls.push(poll(PollStatus::Draft, &[0, 0]));
        session.active_poll = Some(poll(PollStatus::Active, &[0, 0]));
        assert_eq!(
            session.check_invariants(),
            Err(InvariantViolation::DanglingActivePoll)
        );
    }

    #[test]
    fn invariants_detect_tally_mismatch() {
        let mut session = Session::new(code(), "x", Utc::now());
        let mut p = poll(PollStatus::Draft, &[1, 1]);
        p.total_votes = 5;
        session.polls.push(p);
        assert!(matches!(
            session.check_invariants(),
            Err(InvariantViolation::TallyMismatch { total: 5, sum: 2, .. })
        ));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let mut session = Session::new(code(), "Standup", Utc::now());
        session.polls.push(poll(PollStatus::Draft, &[0, 0]));

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("activePoll").is_some());
        assert_eq!(json["polls"][0]["type"], "choice");
        assert_eq!(json["polls"][0]["totalVotes"], 0);
        assert_eq!(json["polls"][0]["status"], "draft");
    }

    #[test]
    fn missing_lists_decode_as_empty() {
        let json = serde_json::json!({
            "code": "4321",
            "title": "Sparse",
            "created": "2024-01-01T00:00:00Z",
            "activePoll": null
        });
        let session: Session = serde_json::from_value(json).unwrap();
        assert!(session.questions.is_empty());
        assert!(session.polls.is_empty());
    }
}

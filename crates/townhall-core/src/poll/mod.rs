//! Poll lifecycle engine
//!
//! Governs `draft -> active -> ended` transitions and vote tallying. Every
//! operation returns a patch carrying the complete new poll list together
//! with the refreshed `activePoll` copy, so the session invariants hold
//! after the patch is applied:
//! - at most one poll is `active`
//! - `activePoll` equals that poll (or is null)
//! - `totalVotes` equals the option vote sum

pub mod state_machine;

use crate::error::{EngineError, NotFoundError, ValidationError, MIN_POLL_OPTIONS};
use crate::model::{Poll, PollKind, PollOption, PollStatus, Session, SessionPatch};
use crate::types::{OptionId, PollId};

pub use state_machine::{allowed_transitions, validate_transition};

/// Poll as composed by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollDraft {
    /// Prompt
    pub question: String,
    /// Option texts; blank entries are dropped
    pub options: Vec<String>,
}

impl PollDraft {
    /// Create draft
    #[must_use]
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Validate and build a fresh draft poll
    ///
    /// # Errors
    /// - `ValidationError::EmptyPollPrompt` if the prompt is blank
    /// - `ValidationError::TooFewOptions` if fewer than two options remain
    ///   after dropping blank ones
    pub fn into_poll(self, id: PollId) -> Result<Poll, ValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyPollPrompt);
        }

        let options: Vec<PollOption> = self
            .options
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .enumerate()
            .map(|(i, text)| PollOption {
                id: OptionId::nth(i),
                text: text.to_string(),
                votes: 0,
            })
            .collect();
        if options.len() < MIN_POLL_OPTIONS {
            return Err(ValidationError::TooFewOptions {
                found: options.len(),
            });
        }

        Ok(Poll {
            id,
            kind: PollKind::Choice,
            question: question.to_string(),
            options,
            total_votes: 0,
            status: PollStatus::Draft,
        })
    }
}

/// Append a new draft poll
///
/// # Errors
/// - `ValidationError` if the draft is invalid
pub fn create_poll(
    session: &Session,
    draft: PollDraft,
    id: PollId,
) -> Result<SessionPatch, EngineError> {
    let poll = draft.into_poll(id)?;
    let mut polls = session.polls.clone();
    polls.push(poll);
    Ok(SessionPatch::new().polls(polls))
}

/// Make `poll_id` the active poll, ending whichever poll was active before
///
/// Re-activating the poll that is already active only refreshes
/// `activePoll`.
///
/// # Errors
/// - `NotFoundError::Poll` if no poll has `poll_id`
/// - `TransitionError` if the poll has already ended
pub fn activate_poll(session: &Session, poll_id: &PollId) -> Result<SessionPatch, EngineError> {
    let target = session
        .poll(poll_id)
        .ok_or_else(|| NotFoundError::Poll(poll_id.clone()))?;
    if target.status != PollStatus::Active {
        validate_transition(poll_id, target.status, PollStatus::Active)?;
    }

    let mut polls = Vec::with_capacity(session.polls.len());
    for poll in &session.polls {
        let mut poll = poll.clone();
        if &poll.id == poll_id {
            poll.status = PollStatus::Active;
        } else if poll.status == PollStatus::Active {
            validate_transition(&poll.id, poll.status, PollStatus::Ended)?;
            poll.status = PollStatus::Ended;
        }
        polls.push(poll);
    }

    let active = polls.iter().find(|p| &p.id == poll_id).cloned();
    Ok(SessionPatch::new().polls(polls).active_poll(active))
}

/// End the active poll, if any, and clear `activePoll`
#[must_use]
pub fn stop_poll(session: &Session) -> SessionPatch {
    let polls = session
        .polls
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if p.status == PollStatus::Active {
                p.status = PollStatus::Ended;
            }
            p
        })
        .collect();
    SessionPatch::new().polls(polls).active_poll(None)
}

/// Count one vote for `option_id`
///
/// No de-duplication: the same participant may vote repeatedly. When the
/// poll is the active one, `activePoll` is refreshed to the new tallies;
/// otherwise it is left as is.
///
/// # Errors
/// - `NotFoundError::Poll` if no poll has `poll_id`
/// - `NotFoundError::Option` if the poll has no `option_id`
pub fn vote(
    session: &Session,
    poll_id: &PollId,
    option_id: &OptionId,
) -> Result<SessionPatch, EngineError> {
    let index = session
        .polls
        .iter()
        .position(|p| &p.id == poll_id)
        .ok_or_else(|| NotFoundError::Poll(poll_id.clone()))?;
    let poll = &session.polls[index];
    if poll.option(option_id).is_none() {
        return Err(NotFoundError::Option {
            poll: poll_id.clone(),
            option: option_id.clone(),
        }
        .into());
    }

    let mut updated = poll.clone();
    for option in &mut updated.options {
        if &option.id == option_id {
            option.votes = option.votes.saturating_add(1);
        }
    }
    updated.total_votes = updated.total_votes.saturating_add(1);

    let active_poll = if poll.status == PollStatus::Active {
        Some(updated.clone())
    } else {
        session.active_poll.clone()
    };

    let mut polls = session.polls.clone();
    polls[index] = updated;
    Ok(SessionPatch::new().polls(polls).active_poll(active_poll))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionCode;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        let code: SessionCode = "1234".parse().unwrap();
        Session::new(code, "Standup", Utc::now())
    }

    fn with_polls(n: usize) -> Session {
        (0..n).fold(session(), |s, i| {
            let draft = PollDraft::new(format!("Poll {i}"), ["Yes", "No"]);
            let patch = create_poll(&s, draft, PollId::from_millis(i as i64)).unwrap();
            s.with_patch(patch)
        })
    }

    #[test]
    fn create_poll_starts_as_draft() {
        let s = session();
        let patch = create_poll(&s, PollDraft::new("Rate today", ["Good", "Bad"]), PollId::from("p1"))
            .unwrap();
        let s = s.with_patch(patch);

        let poll = &s.polls[0];
        assert_eq!(poll.status, PollStatus::Draft);
        assert_eq!(poll.total_votes, 0);
        assert_eq!(poll.kind, PollKind::Choice);
        assert!(poll.options.iter().all(|o| o.votes == 0));
        assert!(s.active_poll.is_none());
    }

    #[test]
    fn create_poll_drops_blank_options() {
        let poll = PollDraft::new(" Q ", ["  a ", "", "   ", "b"])
            .into_poll(PollId::from("p1"))
            .unwrap();
        assert_eq!(poll.question, "Q");
        let texts: Vec<&str> = poll.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(poll.options[1].id, OptionId::from("o2"));
    }

    #[test]
    fn create_poll_validation() {
        let s = session();
        assert_eq!(
            create_poll(&s, PollDraft::new("", ["x", "y"]), PollId::from("p1")).unwrap_err(),
            EngineError::Validation(ValidationError::EmptyPollPrompt)
        );
        assert_eq!(
            create_poll(&s, PollDraft::new("Q", ["only one"]), PollId::from("p1")).unwrap_err(),
            EngineError::Validation(ValidationError::TooFewOptions { found: 1 })
        );
        assert_eq!(
            create_poll(&s, PollDraft::new("Q", ["one", " "]), PollId::from("p1")).unwrap_err(),
            EngineError::Validation(ValidationError::TooFewOptions { found: 1 })
        );
    }

    #[test]
    fn activate_supersedes_previous() {
        let s = with_polls(3);
        let (a, b, c) = (s.polls[0].id.clone(), s.polls[1].id.clone(), s.polls[2].id.clone());

        let s = s.clone().with_patch(activate_poll(&s, &a).unwrap());
        let s = s.clone().with_patch(activate_poll(&s, &b).unwrap());

        assert_eq!(s.poll(&a).unwrap().status, PollStatus::Ended);
        assert_eq!(s.poll(&b).unwrap().status, PollStatus::Active);
        assert_eq!(s.poll(&c).unwrap().status, PollStatus::Draft);
        assert_eq!(s.active_poll.as_ref(), s.poll(&b));
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn activate_unknown_poll() {
        let s = with_polls(1);
        let err = activate_poll(&s, &PollId::from("p404")).unwrap_err();
        assert_eq!(err, EngineError::NotFound(NotFoundError::Poll(PollId::from("p404"))));
    }

    #[test]
    fn activate_ended_poll_is_rejected() {
        let s = with_polls(1);
        let id = s.polls[0].id.clone();
        let s = s.clone().with_patch(activate_poll(&s, &id).unwrap());
        let s = s.clone().with_patch(stop_poll(&s));

        let err = activate_poll(&s, &id).unwrap_err();
        assert!(matches!(err, EngineError::Transition(_)));
    }

    #[test]
    fn reactivating_active_poll_is_idempotent() {
        let s = with_polls(1);
        let id = s.polls[0].id.clone();
        let s = s.clone().with_patch(activate_poll(&s, &id).unwrap());
        let again = s.clone().with_patch(activate_poll(&s, &id).unwrap());
        assert_eq!(again, s);
    }

    #[test]
    fn stop_without_active_poll_changes_nothing() {
        let s = with_polls(2);
        let stopped = s.clone().with_patch(stop_poll(&s));
        assert_eq!(stopped, s);
    }

    #[test]
    fn vote_refreshes_active_copy() {
        let s = with_polls(1);
        let id = s.polls[0].id.clone();
        let s = s.clone().with_patch(activate_poll(&s, &id).unwrap());
        let s = s.clone().with_patch(vote(&s, &id, &OptionId::from("o1")).unwrap());

        let active = s.active_poll.as_ref().unwrap();
        assert_eq!(active.options[0].votes, 1);
        assert_eq!(active.total_votes, 1);
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn vote_on_inactive_poll_leaves_active_copy() {
        let s = with_polls(2);
        let (a, b) = (s.polls[0].id.clone(), s.polls[1].id.clone());
        let s = s.clone().with_patch(activate_poll(&s, &a).unwrap());
        let before = s.active_poll.clone();

        let s = s.clone().with_patch(vote(&s, &b, &OptionId::from("o2")).unwrap());
        assert_eq!(s.active_poll, before);
        assert_eq!(s.poll(&b).unwrap().total_votes, 1);
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn vote_unknown_option() {
        let s = with_polls(1);
        let id = s.polls[0].id.clone();
        let err = vote(&s, &id, &OptionId::from("o9")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(NotFoundError::Option { .. })));
    }
}

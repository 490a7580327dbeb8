use crate::error::TransitionError;
use crate::model::PollStatus;
use crate::types::PollId;

/// Validates a poll status transition.
///
/// `draft -> active -> ended` is the only path; nothing leaves `ended` and
/// nothing returns to `draft`.
pub fn validate_transition(
    poll: &PollId,
    from: PollStatus,
    to: PollStatus,
) -> Result<(), TransitionError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TransitionError {
            poll: poll.clone(),
            from,
            to,
        })
    }
}

#[must_use]
pub fn allowed_transitions(from: PollStatus) -> Vec<PollStatus> {
    use PollStatus::*;
    match from {
        Draft => vec![Active],
        Active => vec![Ended],
        Ended => vec![],
    }
}

fn allowed(from: PollStatus, to: PollStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_can_only_activate() {
        let id = PollId::from("p1");
        assert!(validate_transition(&id, PollStatus::Draft, PollStatus::Active).is_ok());
        assert!(validate_transition(&id, PollStatus::Draft, PollStatus::Ended).is_err());
    }

    #[test]
    fn ended_is_terminal() {
        assert!(allowed_transitions(PollStatus::Ended).is_empty());
    }
}

//! Demo session
//!
//! Session `2024` is always present, even before the store delivers its
//! first snapshot, so a fresh client has something to join.

use crate::model::{Poll, PollKind, PollOption, PollStatus, Question, Session};
use crate::types::{OptionId, PollId, QuestionId, SessionCode};
use chrono::{DateTime, Utc};

/// Code of the always-present demo session
pub const DEMO_CODE: &str = "2024";

/// Code of the demo session as a typed key
#[must_use]
pub fn demo_code() -> SessionCode {
    SessionCode::from_static(DEMO_CODE)
}

/// Build the demo town hall, timestamps relative to `now`
#[must_use]
pub fn demo_session(now: DateTime<Utc>) -> Session {
    let now_ms = now.timestamp_millis();
    let question = |id: i64, text: &str, author: &str, likes: u32, answered: bool, age_ms: i64| {
        Question {
            id: QuestionId(id),
            text: text.to_string(),
            author: author.to_string(),
            likes,
            answered,
            created: now_ms - age_ms,
        }
    };
    let option = |id: &str, text: &str, votes: u32| PollOption {
        id: OptionId::from(id),
        text: text.to_string(),
        votes,
    };

    Session {
        code: demo_code(),
        title: "HPG Quarterly Town Hall".to_string(),
        created: now,
        questions: vec![
            question(
                1,
                "When will the new clinical training modules be available on the Academy?",
                "Dr. Evans",
                18,
                false,
                100_000,
            ),
            question(
                2,
                "Great to see the new mental health initiatives. Are these available for remote staff too?",
                "Sarah J.",
                12,
                false,
                0,
            ),
            question(
                3,
                "Can you clarify the new OH referral process mentioned?",
                "Anonymous",
                5,
                true,
                200_000,
            ),
        ],
        polls: vec![Poll {
            id: PollId::from("p1"),
            kind: PollKind::Choice,
            question: "How would you rate your current wellbeing balance?".to_string(),
            options: vec![
                option("o1", "Thriving", 42),
                option("o2", "Managing well", 35),
                option("o3", "Could use support", 12),
            ],
            total_votes: 89,
            status: PollStatus::Draft,
        }],
        active_poll: None,
    }
}

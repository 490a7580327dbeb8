//! Question ranking for display
//!
//! Unanswered before answered, then most liked, then most recent.

use crate::model::Question;
use std::cmp::Ordering;

/// Display order of two questions
#[must_use]
pub fn compare(a: &Question, b: &Question) -> Ordering {
    a.answered
        .cmp(&b.answered)
        .then_with(|| b.likes.cmp(&a.likes))
        .then_with(|| b.created.cmp(&a.created))
}

/// Ordered view over `questions`; the input is left untouched
#[must_use]
pub fn rank(questions: &[Question]) -> Vec<&Question> {
    let mut ranked: Vec<&Question> = questions.iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked
}

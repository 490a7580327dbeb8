//! Question operations
//!
//! Each operation reads the current session and returns the patch that
//! carries the complete new question list. Nothing is mutated in place.

use crate::error::{EngineError, NotFoundError, ValidationError};
use crate::model::{Question, Session, SessionPatch, DEFAULT_AUTHOR};
use crate::types::QuestionId;

/// Question as submitted by a participant or host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    /// Raw text, trimmed before storing
    pub text: String,
    /// Optional display name
    pub author: Option<String>,
}

impl QuestionDraft {
    /// Create draft
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
        }
    }

    /// With author name
    #[inline]
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Validate and normalize into a fresh question
    ///
    /// # Errors
    /// - `ValidationError::EmptyQuestionText` if the text is blank
    pub fn into_question(
        self,
        id: QuestionId,
        created: i64,
        default_author: &str,
    ) -> Result<Question, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuestionText);
        }
        let author = self
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(default_author);

        Ok(Question {
            id,
            text: text.to_string(),
            author: author.to_string(),
            likes: 0,
            answered: false,
            created,
        })
    }
}

/// Prepend a new question
///
/// # Errors
/// - `ValidationError::EmptyQuestionText` if the text is blank
pub fn add_question(
    session: &Session,
    draft: QuestionDraft,
    id: QuestionId,
    created: i64,
) -> Result<SessionPatch, EngineError> {
    add_question_with_author(session, draft, id, created, DEFAULT_AUTHOR)
}

/// Prepend a new question, falling back to `default_author`
///
/// # Errors
/// - `ValidationError::EmptyQuestionText` if the text is blank
pub fn add_question_with_author(
    session: &Session,
    draft: QuestionDraft,
    id: QuestionId,
    created: i64,
    default_author: &str,
) -> Result<SessionPatch, EngineError> {
    let question = draft.into_question(id, created, default_author)?;
    let mut questions = Vec::with_capacity(session.questions.len() + 1);
    questions.push(question);
    questions.extend(session.questions.iter().cloned());
    Ok(SessionPatch::new().questions(questions))
}

/// Add one like
///
/// # Errors
/// - `NotFoundError::Question` if no question has `id`
pub fn like_question(session: &Session, id: QuestionId) -> Result<SessionPatch, EngineError> {
    update_question(session, id, |q| q.likes = q.likes.saturating_add(1))
}

/// Flip the answered flag
///
/// # Errors
/// - `NotFoundError::Question` if no question has `id`
pub fn toggle_answered(session: &Session, id: QuestionId) -> Result<SessionPatch, EngineError> {
    update_question(session, id, |q| q.answered = !q.answered)
}

/// Remove a question
///
/// # Errors
/// - `NotFoundError::Question` if no question has `id`
pub fn delete_question(session: &Session, id: QuestionId) -> Result<SessionPatch, EngineError> {
    if session.question(id).is_none() {
        return Err(NotFoundError::Question(id).into());
    }
    let questions = session
        .questions
        .iter()
        .filter(|q| q.id != id)
        .cloned()
        .collect();
    Ok(SessionPatch::new().questions(questions))
}

fn update_question<F>(session: &Session, id: QuestionId, f: F) -> Result<SessionPatch, EngineError>
where
    F: Fn(&mut Question),
{
    if session.question(id).is_none() {
        return Err(NotFoundError::Question(id).into());
    }
    let questions = session
        .questions
        .iter()
        .map(|q| {
            let mut q = q.clone();
            if q.id == id {
                f(&mut q);
            }
            q
        })
        .collect();
    Ok(SessionPatch::new().questions(questions))
}

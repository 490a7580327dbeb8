//! Core identifier types
//!
//! Defines the keys used throughout a session document:
//! - Session codes (short numeral strings, also the store path segment)
//! - Question, poll and option identifiers
//! - Participant roles
//! - A monotonic millisecond clock for time-based ids

use crate::error::ValidationError;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Lowest generated session code
pub const DEFAULT_CODE_MIN: u32 = 1000;

/// Highest generated session code
pub const DEFAULT_CODE_MAX: u32 = 9999;

/// Short numeral code identifying a session
///
/// Used as the registry key and as the final segment of the session's
/// document path in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Generate a random code in `min..=max`
    ///
    /// Uniqueness is not checked here; callers that care retry against
    /// their registry.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self(rng.random_range(lo..=hi).to_string())
    }

    /// Code as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }
}

impl FromStr for SessionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidCode(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl std::fmt::Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Question identifier (creation time in milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Poll identifier, `p`-prefixed to keep it apart from question ids
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(String);

impl PollId {
    /// Poll id derived from a creation time
    #[inline]
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("p{millis}"))
    }

    /// Id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Option identifier, unique within its poll
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(String);

impl OptionId {
    /// Positional id (`o1`, `o2`, ...) for the option at `index`
    #[inline]
    #[must_use]
    pub fn nth(index: usize) -> Self {
        Self(format!("o{}", index + 1))
    }

    /// Id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a client holds within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Runs the session: answers, deletes, manages polls
    Host,
    /// Asks, likes and votes
    #[default]
    Participant,
}

/// Millisecond clock that never hands out the same value twice
///
/// Wall-clock based; when two reads land in the same millisecond the second
/// one is bumped forward so time-derived ids stay unique per process.
#[derive(Debug, Default)]
pub struct IdClock {
    last: AtomicI64,
}

impl IdClock {
    /// Create new clock
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next strictly increasing millisecond timestamp
    pub fn next_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_code_is_four_digits() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let code = SessionCode::generate(&mut rng, DEFAULT_CODE_MIN, DEFAULT_CODE_MAX);
            assert_eq!(code.as_str().len(), 4);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
            let value: u32 = code.as_str().parse().unwrap();
            assert!((DEFAULT_CODE_MIN..=DEFAULT_CODE_MAX).contains(&value));
        }
    }

    #[test]
    fn generate_accepts_swapped_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let code = SessionCode::generate(&mut rng, 20, 10);
        let value: u32 = code.as_str().parse().unwrap();
        assert!((10..=20).contains(&value));
    }

    #[test]
    fn parse_code_trims() {
        let code: SessionCode = " 2024 ".parse().unwrap();
        assert_eq!(code.as_str(), "2024");
    }

    #[test]
    fn parse_code_rejects_non_digits() {
        assert!("".parse::<SessionCode>().is_err());
        assert!("   ".parse::<SessionCode>().is_err());
        assert!("20a4".parse::<SessionCode>().is_err());
    }

    #[test]
    fn poll_id_prefix() {
        assert_eq!(PollId::from_millis(1700).as_str(), "p1700");
    }

    #[test]
    fn option_id_positional() {
        assert_eq!(OptionId::nth(0).as_str(), "o1");
        assert_eq!(OptionId::nth(2).as_str(), "o3");
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = IdClock::new();
        let mut prev = clock.next_millis();
        for _ in 0..1000 {
            let next = clock.next_millis();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
    }
}

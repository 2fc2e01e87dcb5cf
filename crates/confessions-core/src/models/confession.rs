//! Confession model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest confession the composer accepts, in characters.
pub const MAX_CONFESSION_CHARS: usize = 500;

/// Server-assigned confession identifier.
///
/// Ids grow with creation time, so ordering by id matches ordering by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfessionId(i64);

impl ConfessionId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ConfessionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConfessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConfessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A posted confession
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confession {
    /// Server-assigned identifier
    pub id: ConfessionId,
    /// Confession text
    pub text: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Like count as last reported by the store
    pub like_count: u32,
}

impl Confession {
    /// Get first line as preview, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.text
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

/// Trim and validate composer input.
///
/// Empty (or whitespace-only) text and text longer than
/// [`MAX_CONFESSION_CHARS`] characters are rejected.
pub fn validate_confession_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "confession text cannot be empty".to_string(),
        ));
    }
    let length = trimmed.chars().count();
    if length > MAX_CONFESSION_CHARS {
        return Err(Error::InvalidInput(format!(
            "confession is {length} characters; the limit is {MAX_CONFESSION_CHARS}"
        )));
    }
    Ok(trimmed.to_string())
}

//! Free-text normalization for values passed to the joke store
//!
//! Every field of a joke is trimmed and truncated before it becomes a
//! process argument. Lengths are counted in characters, not bytes, so
//! truncation never splits a code point.

use crate::config::keys;
use crate::error::ConfigError;
use crate::types::{Joke, JokeDraft};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Upper bound on sanitized field length, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct MaxStringLength(NonZeroUsize);

impl MaxStringLength {
    /// Create from a non-zero length
    #[inline]
    #[must_use]
    pub const fn new(max: NonZeroUsize) -> Self {
        Self(max)
    }

    /// Length as a plain integer
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for MaxStringLength {
    type Error = ConfigError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(value)
            .map(Self)
            .ok_or_else(|| ConfigError::invalid(keys::MAX_STRING_LENGTH, "must be a positive integer"))
    }
}

impl From<MaxStringLength> for usize {
    fn from(value: MaxStringLength) -> Self {
        value.get()
    }
}

impl FromStr for MaxStringLength {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: usize = s.trim().parse().map_err(|_| {
            ConfigError::invalid(keys::MAX_STRING_LENGTH, format!("`{s}` is not a positive integer"))
        })?;
        Self::try_from(parsed)
    }
}

impl fmt::Display for MaxStringLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trim and truncate a possibly-absent string
///
/// Absent or empty input yields an empty string.
#[must_use]
pub fn sanitize(value: Option<&str>, max: MaxStringLength) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let trimmed = value.trim();
    match trimmed.char_indices().nth(max.get()) {
        Some((cut, _)) => trimmed[..cut].to_owned(),
        None => trimmed.to_owned(),
    }
}

/// Sanitize every field of an untrusted joke
#[must_use]
pub fn sanitize_joke(draft: &JokeDraft, max: MaxStringLength) -> Joke {
    Joke {
        lang: sanitize(draft.lang.as_deref(), max),
        text: sanitize(draft.text.as_deref(), max),
    }
}

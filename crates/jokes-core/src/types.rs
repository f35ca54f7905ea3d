//! Core data model for the gateway
//!
//! Defines:
//! - `Joke` and `JokeCollection`, the wire shapes shared with the joke store
//! - `JokeDraft`, the untrusted request body before sanitization
//! - `CommandResult`, the outcome of one joke-store invocation

use crate::validation::{validate_draft, ShapeMismatch};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;

/// A single joke
///
/// `text` is the canonical field name. Older joke-store builds emit `joke`,
/// which is accepted on input only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Joke {
    /// Language tag (free text, e.g. "en", "pt")
    pub lang: String,
    /// Joke body
    #[serde(alias = "joke")]
    pub text: String,
}

impl Joke {
    /// Create new joke
    #[inline]
    #[must_use]
    pub fn new(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            text: text.into(),
        }
    }
}

/// Ordered set of jokes returned by `getall`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokeCollection {
    /// Jokes in store order
    pub jokes: Vec<Joke>,
}

impl JokeCollection {
    /// Number of jokes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.jokes.len()
    }

    /// Whether the collection is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jokes.is_empty()
    }
}

/// Untrusted joke as received in a request body
///
/// Both fields are optional; an absent field sanitizes to an empty string.
/// Decoding goes through [`validate_draft`](crate::validation::validate_draft),
/// which also accepts the legacy `joke` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct JokeDraft {
    /// Requested language
    pub lang: Option<String>,
    /// Requested joke body
    pub text: Option<String>,
}

impl TryFrom<serde_json::Value> for JokeDraft {
    type Error = ShapeMismatch;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        validate_draft(&value)
    }
}

impl JokeDraft {
    /// Draft with both fields present
    #[must_use]
    pub fn new(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: Some(lang.into()),
            text: Some(text.into()),
        }
    }
}

impl From<Joke> for JokeDraft {
    fn from(joke: Joke) -> Self {
        Self {
            lang: Some(joke.lang),
            text: Some(joke.text),
        }
    }
}

/// Outcome of a single joke-store invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the store reported success under the configured policy
    pub succeeded: bool,
    /// Entire captured standard output
    pub output: String,
    /// Process exit code, when the process exited normally
    pub exit_code: Option<i32>,
}

impl CommandResult {
    /// Successful result with the given stdout
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            exit_code: Some(0),
        }
    }

    /// Failed result with the given stdout
    #[must_use]
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
            exit_code: Some(1),
        }
    }

    pub(crate) fn from_status(succeeded: bool, output: String, status: ExitStatus) -> Self {
        Self {
            succeeded,
            output,
            exit_code: status.code(),
        }
    }
}

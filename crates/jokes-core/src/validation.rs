//! Structural validation of joke-store output
//!
//! The joke store's stdout and request bodies are decoded as untyped JSON
//! first and then checked against the expected shape here, so shape rules
//! live in one place and can be tested without a process or an HTTP request.

use crate::types::{Joke, JokeCollection, JokeDraft};
use serde_json::{Map, Value};

/// Field names accepted for the joke body, canonical first
const TEXT_FIELDS: [&str; 2] = ["text", "joke"];

/// JSON value did not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shape mismatch at `{path}`: expected {expected}")]
pub struct ShapeMismatch {
    /// Location of the offending value (e.g. `jokes[2].lang`)
    pub path: String,
    /// What was expected there
    pub expected: &'static str,
}

impl ShapeMismatch {
    fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// Whether `value` is a single joke
#[inline]
#[must_use]
pub fn is_joke(value: &Value) -> bool {
    validate_joke(value).is_ok()
}

/// Whether `value` is a `{ "jokes": [...] }` collection
#[inline]
#[must_use]
pub fn is_jokes(value: &Value) -> bool {
    validate_jokes(value).is_ok()
}

/// Validate and extract a single joke
///
/// # Errors
/// Returns `ShapeMismatch` if `value` is not an object with string `lang`
/// and string `text` (or legacy `joke`) fields.
pub fn validate_joke(value: &Value) -> Result<Joke, ShapeMismatch> {
    joke_at(value, "")
}

/// Validate and extract a joke collection
///
/// # Errors
/// Returns `ShapeMismatch` if `value` is not an object with a `jokes` array,
/// or if any element fails `validate_joke`.
pub fn validate_jokes(value: &Value) -> Result<JokeCollection, ShapeMismatch> {
    let object = value
        .as_object()
        .ok_or_else(|| ShapeMismatch::new("$", "object"))?;
    let items = object
        .get("jokes")
        .and_then(Value::as_array)
        .ok_or_else(|| ShapeMismatch::new("jokes", "array"))?;

    let jokes = items
        .iter()
        .enumerate()
        .map(|(i, item)| joke_at(item, &format!("jokes[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(JokeCollection { jokes })
}

/// Validate an untrusted request body as a joke draft
///
/// Absent or `null` fields are left empty. When both `text` and `joke` are
/// present, `text` wins, as in [`validate_joke`].
///
/// # Errors
/// Returns `ShapeMismatch` if `value` is not an object or a present field
/// is not a string.
pub fn validate_draft(value: &Value) -> Result<JokeDraft, ShapeMismatch> {
    let object = value
        .as_object()
        .ok_or_else(|| ShapeMismatch::new("$", "object"))?;

    let lang = optional_string(object, "lang")?;
    let mut text = None;
    for name in TEXT_FIELDS {
        let candidate = optional_string(object, name)?;
        text = text.or(candidate);
    }

    Ok(JokeDraft { lang, text })
}

fn optional_string(object: &Map<String, Value>, name: &str) -> Result<Option<String>, ShapeMismatch> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ShapeMismatch::new(name, "string")),
    }
}

fn joke_at(value: &Value, prefix: &str) -> Result<Joke, ShapeMismatch> {
    let object = value
        .as_object()
        .ok_or_else(|| ShapeMismatch::new(field_path(prefix, "$"), "object"))?;

    let lang = string_field(object, "lang")
        .ok_or_else(|| ShapeMismatch::new(field_path(prefix, "lang"), "string"))?;
    let text = TEXT_FIELDS
        .iter()
        .find_map(|name| string_field(object, name))
        .ok_or_else(|| ShapeMismatch::new(field_path(prefix, "text"), "string"))?;

    Ok(Joke::new(lang, text))
}

fn string_field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    object.get(name).and_then(Value::as_str)
}

fn field_path(prefix: &str, field: &str) -> String {
    match (prefix.is_empty(), field) {
        (true, _) => field.to_owned(),
        (false, "$") => prefix.to_owned(),
        (false, _) => format!("{prefix}.{field}"),
    }
}

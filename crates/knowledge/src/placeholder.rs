//! Placeholder and test-data detection.
//!
//! Operators fill the admin pages with "lorem ipsum", "test" and keyboard
//! mashing while trying things out. None of that may reach a user-facing
//! answer, so every database-sourced record passes through [`prune`] (or the
//! typed wrapper [`scrub`]) before rendering.
//!
//! The classification is a heuristic. Short single words ("FabLab", "STEM")
//! are flagged along with real junk; that trade-off is accepted.

use regex_lite::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

/// Case-insensitive substrings that mark a value as placeholder content.
const BLOCKLIST: &[&str] = &[
    "lorem ipsum",
    "lorem",
    "ipsum",
    "test",
    "placeholder",
    "dummy",
    "sample text",
    "asdf",
    "qwerty",
    "zxcv",
    "xxxx",
    "tbd",
];

/// Short strings made of letters only: single words with no spacing,
/// digits or punctuation.
static SHORT_ALPHA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{1,14}$").ok());

/// Whether `text` looks like placeholder or test data.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    let lower = trimmed.to_lowercase();
    if BLOCKLIST.iter().any(|needle| lower.contains(needle)) {
        return true;
    }

    match SHORT_ALPHA.as_ref() {
        Some(re) => re.is_match(trimmed),
        None => trimmed.len() < 15 && trimmed.chars().all(|c| c.is_ascii_alphabetic()),
    }
}

/// Recursively remove placeholder content from a JSON value.
///
/// Returns `None` when nothing survives, never an empty object or array.
/// Numbers and booleans are kept as they are.
pub fn prune(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => (!is_placeholder(s)).then(|| Value::String(s.clone())),
        Value::Bool(_) | Value::Number(_) => Some(value.clone()),
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter_map(prune).collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        Value::Object(fields) => {
            let kept: Map<String, Value> = fields
                .iter()
                .filter_map(|(key, v)| prune(v).map(|v| (key.clone(), v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
    }
}

/// Prune a typed record and read the survivor back into the same type.
///
/// The record type must accept missing fields (`#[serde(default)]` or
/// `Option`), since pruning drops them.
pub fn scrub<T>(record: &T) -> Option<T>
where
    T: Serialize + DeserializeOwned,
{
    let value = match serde_json::to_value(record) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Dropping record that cannot be serialized for scrubbing");
            return None;
        }
    };

    let pruned = prune(&value)?;
    match serde_json::from_value(pruned) {
        Ok(clean) => Some(clean),
        Err(e) => {
            warn!(error = %e, "Dropping record that no longer fits its schema after scrubbing");
            None
        }
    }
}

/// Scrub every record of a collection, dropping the ones with nothing left.
pub fn scrub_all<T>(records: &[T]) -> Vec<T>
where
    T: Serialize + DeserializeOwned,
{
    records.iter().filter_map(scrub).collect()
}

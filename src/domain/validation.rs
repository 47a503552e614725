//! Validation result
//!
//! Ordered mapping of field name to error messages. Business-rule failures
//! and input validation both travel through this type; infrastructure
//! faults do not.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Field key used for the distinguished concurrency-conflict entry.
const CONFLICT_FIELD: &str = "transfer";
const CONFLICT_MESSAGE: &str = "concurrent modification, retry";

/// Accumulated field errors, in insertion order.
///
/// "Has errors" iff any field carries a non-empty message list. Serializes
/// as a JSON object of `field -> [messages]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    entries: Vec<(String, Vec<String>)>,
    conflict: bool,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for `field`, keeping earlier messages.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    /// Single-error constructor for short-circuiting rule checks.
    pub fn with_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add(field, message);
        result
    }

    /// Record an optimistic-concurrency conflict. The entry is visible like
    /// any other field error, but `is_conflict` lets callers pick a retry
    /// path.
    pub fn conflict() -> Self {
        let mut result = Self::with_error(CONFLICT_FIELD, CONFLICT_MESSAGE);
        result.conflict = true;
        result
    }

    pub fn is_conflict(&self) -> bool {
        self.conflict
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|(_, messages)| !messages.is_empty())
    }

    /// Fold another result into this one, preserving both orders.
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflict |= other.conflict;
        for (field, messages) in other.entries {
            for message in messages {
                self.add(field.clone(), message);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// All messages recorded for `field`, if any.
    pub fn messages_for(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, messages)| messages.as_slice())
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

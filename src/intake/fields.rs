//! Form field derivation.
//!
//! Pure pattern matching over the snapshot; no I/O.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::mail::EmailSnapshot;

/// Optional "policy / no / number / #" label followed by a standalone token of
/// up to two uppercase letters and 6–12 digits.
static POLICY_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:policy\s*(?:no|number|#)?[:\s]*)?\b((?-i:[A-Z]{0,2})\d{6,12})\b").unwrap()
});

/// Editable form fields submitted with the email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    /// Empty when no policy number was found.
    pub policy_number: String,
    pub document_name: String,
    #[serde(rename = "comments")]
    pub comment: String,
    pub timestamp: String,
}

/// User overrides for a rendered form. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEdits {
    pub policy_number: Option<String>,
    pub document_name: Option<String>,
    pub comment: Option<String>,
    pub timestamp: Option<String>,
}

impl FieldSet {
    /// Apply user edits; an edited field always replaces the derived value.
    pub fn apply(&mut self, edits: FieldEdits) {
        if let Some(v) = edits.policy_number {
            self.policy_number = v;
        }
        if let Some(v) = edits.document_name {
            self.document_name = v;
        }
        if let Some(v) = edits.comment {
            self.comment = v;
        }
        if let Some(v) = edits.timestamp {
            self.timestamp = v;
        }
    }
}

/// Derive the initial field set from a snapshot.
pub fn extract(snapshot: &EmailSnapshot) -> FieldSet {
    FieldSet {
        policy_number: policy_number(&snapshot.subject).unwrap_or_default(),
        document_name: snapshot.subject.clone(),
        comment: String::new(),
        timestamp: format_timestamp(&snapshot.effective_received_at().with_timezone(&Local)),
    }
}

/// First policy-number-looking token in `text`.
pub fn policy_number(text: &str) -> Option<String> {
    POLICY_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Short US date/time, e.g. `02/16/2026, 02:05 PM`.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format("%m/%d/%Y, %I:%M %p").to_string()
}

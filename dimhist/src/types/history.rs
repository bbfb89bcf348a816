use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::CanonicalRecord;

/// Opaque identifier the store assigns to one historical version row.
///
/// The engine never invents surrogate keys and never assumes a format; the
/// inner value is whatever the store returned from an open operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurrogateKey(String);

impl SurrogateKey {
    /// Wraps a store-assigned key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SurrogateKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One versioned row of the history table.
///
/// Created by an open write and terminated by a close write, never deleted.
/// For a given business key at most one row is current at any time, and the
/// `[start_date, end_date)` intervals of its rows never overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// Store-assigned identifier of this version.
    pub surrogate_key: SurrogateKey,
    /// The dimension attributes of this version.
    pub record: CanonicalRecord,
    /// Inclusive start of this version's validity.
    pub start_date: DateTime<Utc>,
    /// Exclusive end of this version's validity; `None` while current.
    pub end_date: Option<DateTime<Utc>>,
    /// Whether this row is the entity's present state.
    pub is_current: bool,
}

impl HistoryRow {
    /// Creates a freshly opened current version.
    pub fn open(
        surrogate_key: SurrogateKey,
        record: CanonicalRecord,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            surrogate_key,
            record,
            start_date,
            end_date: None,
            is_current: true,
        }
    }

    /// Terminates this version: sets the end date and clears the current flag.
    pub fn close(&mut self, end_date: DateTime<Utc>) {
        self.end_date = Some(end_date);
        self.is_current = false;
    }
}

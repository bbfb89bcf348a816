use chrono::{DateTime, Utc};

use crate::types::{BusinessKey, CanonicalRecord, SurrogateKey};

/// Classification of one input record against the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    New,
    Changed,
    Unchanged,
}

/// A canonical record tagged with its classification.
///
/// `Changed` and `Unchanged` carry the surrogate key of the matching current
/// history row, a lookup relation rather than ownership. A record that
/// matched no current row is `New`; the variants make a changed record
/// without a matched version unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    /// No current row exists for the business key.
    New {
        key: BusinessKey,
        record: CanonicalRecord,
    },
    /// A current row exists and at least one tracked attribute differs.
    Changed {
        key: BusinessKey,
        record: CanonicalRecord,
        current_version: SurrogateKey,
    },
    /// A current row exists with identical tracked attributes.
    Unchanged {
        key: BusinessKey,
        record: CanonicalRecord,
        current_version: SurrogateKey,
    },
}

impl ChangeRecord {
    /// Returns the business key of the classified record.
    pub fn key(&self) -> &BusinessKey {
        match self {
            ChangeRecord::New { key, .. }
            | ChangeRecord::Changed { key, .. }
            | ChangeRecord::Unchanged { key, .. } => key,
        }
    }

    /// Returns the classification tag.
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeRecord::New { .. } => ChangeType::New,
            ChangeRecord::Changed { .. } => ChangeType::Changed,
            ChangeRecord::Unchanged { .. } => ChangeType::Unchanged,
        }
    }
}

/// A single write the merger derives for the history table.
///
/// The merger owns the batch of operations for one run; the writer consumes
/// and discards them.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOperation {
    /// Terminate an existing version: set its end date, clear its current flag.
    CloseVersion {
        surrogate_key: SurrogateKey,
        end_date: DateTime<Utc>,
    },
    /// Insert a new current version starting at `start_date`.
    OpenVersion {
        record: CanonicalRecord,
        start_date: DateTime<Utc>,
    },
}

/// The close/open operations for one business key.
///
/// This group is the unit of write atomicity: the close must be applied
/// before the open, and a partially applied group must never become visible.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedOperations {
    pub key: BusinessKey,
    pub operations: Vec<MergeOperation>,
}

//! Change classification of canonical records against the current snapshot.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::Entry;

use crate::bail;
use crate::error::{DimhistResult, ErrorKind};
use crate::schema::RecordSchema;
use crate::types::{BusinessKey, CanonicalRecord, ChangeRecord, HistoryRow};

/// Classifies a batch of canonical records against the current snapshot.
///
/// The snapshot is indexed by business key once, so classification is a hash
/// probe per record rather than a scan of the snapshot. Exactly one
/// classification is produced per input record; two input records with the
/// same business key fail with [`ErrorKind::DuplicateBusinessKey`] rather
/// than letting iteration order pick a winner.
pub fn detect(
    batch: &[CanonicalRecord],
    snapshot: &[HistoryRow],
    schema: &RecordSchema,
) -> DimhistResult<Vec<ChangeRecord>> {
    let index = index_current_rows(snapshot, schema)?;

    let mut seen: HashSet<BusinessKey> = HashSet::with_capacity(batch.len());
    let mut changes = Vec::with_capacity(batch.len());

    for record in batch {
        if !schema.matches_shape(record) {
            bail!(
                ErrorKind::InvalidData,
                "Input record does not match the schema",
                format!(
                    "record has {} cells, schema has {} columns",
                    record.values().len(),
                    schema.columns().len()
                )
            );
        }

        let key = schema.business_key(record);
        if !seen.insert(key.clone()) {
            bail!(
                ErrorKind::DuplicateBusinessKey,
                "Duplicate business key within one input batch",
                format!("business key ({key}) appears more than once")
            );
        }

        let change = match index.get(&key) {
            None => ChangeRecord::New {
                key,
                record: record.clone(),
            },
            Some(row) if schema.tracked_equal(record, &row.record) => ChangeRecord::Unchanged {
                key,
                record: record.clone(),
                current_version: row.surrogate_key.clone(),
            },
            Some(row) => ChangeRecord::Changed {
                key,
                record: record.clone(),
                current_version: row.surrogate_key.clone(),
            },
        };
        changes.push(change);
    }

    Ok(changes)
}

/// Builds the business-key lookup for the snapshot.
///
/// A snapshot that itself violates the at-most-one-current invariant fails
/// with [`ErrorKind::DuplicateCurrentVersion`]; a row the reader should never
/// have returned (not current, or mismatched shape) fails with
/// [`ErrorKind::InvalidData`]. Neither is ever silently tolerated.
fn index_current_rows<'a>(
    snapshot: &'a [HistoryRow],
    schema: &RecordSchema,
) -> DimhistResult<HashMap<BusinessKey, &'a HistoryRow>> {
    let mut index = HashMap::with_capacity(snapshot.len());

    for row in snapshot {
        if !row.is_current {
            bail!(
                ErrorKind::InvalidData,
                "Snapshot contains a non-current row",
                format!("surrogate key {} is not current", row.surrogate_key)
            );
        }

        if !schema.matches_shape(&row.record) {
            bail!(
                ErrorKind::InvalidData,
                "Snapshot row does not match the schema",
                format!(
                    "row {} has {} cells, schema has {} columns",
                    row.surrogate_key,
                    row.record.values().len(),
                    schema.columns().len()
                )
            );
        }

        let key = schema.business_key(&row.record);
        match index.entry(key) {
            Entry::Occupied(entry) => {
                bail!(
                    ErrorKind::DuplicateCurrentVersion,
                    "More than one current history row for a business key",
                    format!("business key ({})", entry.key())
                );
            }
            Entry::Vacant(entry) => {
                entry.insert(row);
            }
        }
    }

    Ok(index)
}

//! Derivation of history-table write operations from classified changes.

use chrono::{DateTime, Utc};

use crate::types::{ChangeRecord, KeyedOperations, MergeOperation};

/// Derives the ordered operation batch for one run.
///
/// Deterministic: `Changed` yields the close of the old version followed by
/// the open of the new one, `New` yields a single open, `Unchanged` yields
/// nothing, and the output preserves input batch order. Running it twice on
/// the same classified batch produces the same sequence.
pub fn merge(changes: &[ChangeRecord], as_of: DateTime<Utc>) -> Vec<MergeOperation> {
    merge_grouped(changes, as_of)
        .into_iter()
        .flat_map(|group| group.operations)
        .collect()
}

/// Same operations as [`merge`], grouped per business key.
///
/// Each group keeps the close-before-open order for its key; flattening the
/// groups in order yields exactly the [`merge`] output. The group is what the
/// writer must apply atomically, and groups for distinct keys may be applied
/// concurrently.
pub fn merge_grouped(changes: &[ChangeRecord], as_of: DateTime<Utc>) -> Vec<KeyedOperations> {
    let mut groups = Vec::new();

    for change in changes {
        let operations = match change {
            ChangeRecord::Unchanged { .. } => continue,
            ChangeRecord::New { record, .. } => vec![MergeOperation::OpenVersion {
                record: record.clone(),
                start_date: as_of,
            }],
            ChangeRecord::Changed {
                record,
                current_version,
                ..
            } => vec![
                MergeOperation::CloseVersion {
                    surrogate_key: current_version.clone(),
                    end_date: as_of,
                },
                MergeOperation::OpenVersion {
                    record: record.clone(),
                    start_date: as_of,
                },
            ],
        };

        groups.push(KeyedOperations {
            key: change.key().clone(),
            operations,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BusinessKey, CanonicalRecord, Cell, SurrogateKey};
    use chrono::TimeZone;

    fn record(id: i64, name: &str) -> CanonicalRecord {
        CanonicalRecord::new(vec![Cell::I64(id), Cell::from(name)])
    }

    fn key(id: i64) -> BusinessKey {
        BusinessKey::new(vec![Cell::I64(id)])
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn new_record_yields_a_single_open() {
        let changes = vec![ChangeRecord::New {
            key: key(1),
            record: record(1, "A"),
        }];

        let operations = merge(&changes, as_of());

        assert_eq!(
            operations,
            vec![MergeOperation::OpenVersion {
                record: record(1, "A"),
                start_date: as_of(),
            }]
        );
    }

    #[test]
    fn changed_record_yields_close_then_open() {
        let changes = vec![ChangeRecord::Changed {
            key: key(1),
            record: record(1, "B"),
            current_version: SurrogateKey::from("s1"),
        }];

        let operations = merge(&changes, as_of());

        assert_eq!(
            operations,
            vec![
                MergeOperation::CloseVersion {
                    surrogate_key: SurrogateKey::from("s1"),
                    end_date: as_of(),
                },
                MergeOperation::OpenVersion {
                    record: record(1, "B"),
                    start_date: as_of(),
                },
            ]
        );
    }

    #[test]
    fn unchanged_record_yields_nothing() {
        let changes = vec![ChangeRecord::Unchanged {
            key: key(1),
            record: record(1, "A"),
            current_version: SurrogateKey::from("s1"),
        }];

        assert!(merge(&changes, as_of()).is_empty());
    }

    #[test]
    fn merge_is_deterministic() {
        let changes = vec![
            ChangeRecord::Changed {
                key: key(1),
                record: record(1, "B"),
                current_version: SurrogateKey::from("s1"),
            },
            ChangeRecord::New {
                key: key(2),
                record: record(2, "C"),
            },
        ];

        assert_eq!(merge(&changes, as_of()), merge(&changes, as_of()));
    }

    #[test]
    fn grouped_output_flattens_to_merge_output() {
        let changes = vec![
            ChangeRecord::Changed {
                key: key(1),
                record: record(1, "B"),
                current_version: SurrogateKey::from("s1"),
            },
            ChangeRecord::Unchanged {
                key: key(2),
                record: record(2, "C"),
                current_version: SurrogateKey::from("s2"),
            },
            ChangeRecord::New {
                key: key(3),
                record: record(3, "D"),
            },
        ];

        let flattened: Vec<_> = merge_grouped(&changes, as_of())
            .into_iter()
            .flat_map(|group| group.operations)
            .collect();

        assert_eq!(flattened, merge(&changes, as_of()));
    }

    #[test]
    fn groups_preserve_batch_order() {
        let changes = vec![
            ChangeRecord::New {
                key: key(2),
                record: record(2, "B"),
            },
            ChangeRecord::New {
                key: key(1),
                record: record(1, "A"),
            },
        ];

        let groups = merge_grouped(&changes, as_of());

        assert_eq!(groups[0].key, key(2));
        assert_eq!(groups[1].key, key(1));
    }
}

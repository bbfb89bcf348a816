//! Record schema derived from the mapping configuration.
//!
//! The dynamic shape of source records is pinned down once, at construction:
//! the schema fixes the ordered set of typed target columns, the business-key
//! columns, and the tracked columns. Rows are never inspected beyond the
//! columns declared here.

use dimhist_config::shared::{ColumnType, MappingConfig};

use crate::bail;
use crate::error::{DimhistResult, ErrorKind};
use crate::types::{BusinessKey, CanonicalRecord};

/// One target column of the canonical record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Source field this column is populated from.
    pub source_field: String,
    /// Target column name.
    pub target_column: String,
    /// Declared value type; raw values are coerced to it.
    pub column_type: ColumnType,
}

/// Fixed, validated shape of canonical records for one pipeline.
///
/// Columns are ordered by target column name so the canonical layout is
/// stable regardless of source field ordering.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    columns: Vec<ColumnSpec>,
    business_key: Vec<usize>,
    tracked: Vec<usize>,
    history_table: String,
    target_table: Option<String>,
}

impl RecordSchema {
    /// Validates the mapping configuration and derives the canonical column
    /// layout from it.
    pub fn from_mapping(mapping: &MappingConfig) -> DimhistResult<Self> {
        if let Err(err) = mapping.validate() {
            bail!(
                ErrorKind::ConfigError,
                "Invalid mapping configuration",
                err.to_string()
            );
        }

        let mut columns: Vec<ColumnSpec> = mapping
            .column_mapping
            .iter()
            .map(|(source, target)| ColumnSpec {
                source_field: source.clone(),
                target_column: target.clone(),
                column_type: mapping
                    .column_types
                    .get(target)
                    .copied()
                    .unwrap_or(ColumnType::String),
            })
            .collect();
        columns.sort_by(|a, b| a.target_column.cmp(&b.target_column));

        // The mapping validated above, so every named column resolves.
        let index_of = |name: &str| {
            columns
                .iter()
                .position(|column| column.target_column == name)
        };

        let business_key: Vec<usize> = mapping
            .business_key_columns
            .iter()
            .filter_map(|name| index_of(name))
            .collect();

        let tracked: Vec<usize> = match &mapping.tracked_columns {
            Some(tracked) => tracked.iter().filter_map(|name| index_of(name)).collect(),
            None => (0..columns.len())
                .filter(|index| !business_key.contains(index))
                .collect(),
        };

        Ok(Self {
            columns,
            business_key,
            tracked,
            history_table: mapping.target_history_table.clone(),
            target_table: mapping.target_table.clone(),
        })
    }

    /// Returns the canonical columns in layout order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the name of the history table this schema targets.
    pub fn history_table(&self) -> &str {
        &self.history_table
    }

    /// Returns the optional current-state table name.
    pub fn target_table(&self) -> Option<&str> {
        self.target_table.as_deref()
    }

    /// Returns whether the column at `index` is part of the business key.
    pub fn is_business_key_column(&self, index: usize) -> bool {
        self.business_key.contains(&index)
    }

    /// Extracts the business key of a canonical record, in configured key
    /// column order.
    pub fn business_key(&self, record: &CanonicalRecord) -> BusinessKey {
        BusinessKey::new(
            self.business_key
                .iter()
                .map(|&index| record.values()[index].clone())
                .collect(),
        )
    }

    /// Returns whether all tracked attributes of `a` and `b` are equal,
    /// null-aware.
    pub fn tracked_equal(&self, a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
        self.tracked
            .iter()
            .all(|&index| a.values()[index] == b.values()[index])
    }

    /// Returns whether `record` matches the schema's column count.
    pub fn matches_shape(&self, record: &CanonicalRecord) -> bool {
        record.values().len() == self.columns.len()
    }
}

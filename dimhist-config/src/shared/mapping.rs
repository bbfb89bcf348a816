use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column names reserved for SCD2 bookkeeping on the history table.
///
/// Mapped target columns must not collide with these; the store owns them.
pub const SCD2_METADATA_COLUMNS: [&str; 4] =
    ["surrogate_key", "start_date", "end_date", "is_current"];

/// Declared type of a mapped target column.
///
/// Raw source values are coerced to this type during normalization. Columns
/// without a declared type default to [`ColumnType::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Integer,
    Float,
    String,
    Timestamp,
}

/// Errors returned by configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("history table name is empty")]
    EmptyHistoryTable,
    #[error("column mapping is empty")]
    EmptyColumnMapping,
    #[error("two source fields map to target column '{0}'")]
    DuplicateTargetColumn(String),
    #[error("target column '{0}' collides with a reserved SCD2 metadata column")]
    ReservedColumnName(String),
    #[error("business key columns are empty")]
    EmptyBusinessKey,
    #[error("business key column '{0}' is listed more than once")]
    DuplicateBusinessKeyColumn(String),
    #[error("business key column '{0}' is not a mapped target column")]
    UnknownBusinessKeyColumn(String),
    #[error("tracked column '{0}' is not a mapped target column")]
    UnknownTrackedColumn(String),
    #[error("tracked column '{0}' is part of the business key")]
    TrackedBusinessKeyColumn(String),
    #[error("column type declared for unmapped column '{0}'")]
    UnknownTypedColumn(String),
}

/// Column mapping configuration for one target table pair.
///
/// Describes how raw source fields become canonical target columns, which
/// columns form the business key, and which columns are tracked for SCD2
/// versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MappingConfig {
    /// Optional current-state table maintained separately from history.
    #[serde(default)]
    pub target_table: Option<String>,
    /// Name of the SCD2 history table.
    pub target_history_table: String,
    /// Source field name to target column name.
    pub column_mapping: BTreeMap<String, String>,
    /// Declared type per target column; unlisted columns are strings.
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnType>,
    /// Target columns forming the business key.
    pub business_key_columns: Vec<String>,
    /// Explicit tracked columns. When absent, every mapped column that is not
    /// part of the business key is tracked.
    #[serde(default)]
    pub tracked_columns: Option<Vec<String>>,
}

impl MappingConfig {
    /// Validates the mapping configuration.
    ///
    /// Returns the first violation found. A configuration that passes here can
    /// be turned into a record schema without further checks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_history_table.is_empty() {
            return Err(ValidationError::EmptyHistoryTable);
        }

        if self.column_mapping.is_empty() {
            return Err(ValidationError::EmptyColumnMapping);
        }

        let mut targets = HashSet::new();
        for target in self.column_mapping.values() {
            if SCD2_METADATA_COLUMNS.contains(&target.as_str()) {
                return Err(ValidationError::ReservedColumnName(target.clone()));
            }

            if !targets.insert(target.as_str()) {
                return Err(ValidationError::DuplicateTargetColumn(target.clone()));
            }
        }

        if self.business_key_columns.is_empty() {
            return Err(ValidationError::EmptyBusinessKey);
        }

        let mut key_columns = HashSet::new();
        for column in &self.business_key_columns {
            if !targets.contains(column.as_str()) {
                return Err(ValidationError::UnknownBusinessKeyColumn(column.clone()));
            }

            if !key_columns.insert(column.as_str()) {
                return Err(ValidationError::DuplicateBusinessKeyColumn(column.clone()));
            }
        }

        if let Some(tracked) = &self.tracked_columns {
            for column in tracked {
                if !targets.contains(column.as_str()) {
                    return Err(ValidationError::UnknownTrackedColumn(column.clone()));
                }

                if key_columns.contains(column.as_str()) {
                    return Err(ValidationError::TrackedBusinessKeyColumn(column.clone()));
                }
            }
        }

        for column in self.column_types.keys() {
            if !targets.contains(column.as_str()) {
                return Err(ValidationError::UnknownTypedColumn(column.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> MappingConfig {
        MappingConfig {
            target_table: None,
            target_history_table: "customers_history".to_string(),
            column_mapping: BTreeMap::from([
                ("customer_id".to_string(), "id".to_string()),
                ("customer_name".to_string(), "name".to_string()),
            ]),
            column_types: BTreeMap::from([("id".to_string(), ColumnType::Integer)]),
            business_key_columns: vec!["id".to_string()],
            tracked_columns: None,
        }
    }

    #[test]
    fn valid_mapping_passes() {
        assert_eq!(mapping().validate(), Ok(()));
    }

    #[test]
    fn rejects_reserved_target_column() {
        let mut config = mapping();
        config
            .column_mapping
            .insert("valid_from".to_string(), "start_date".to_string());

        assert_eq!(
            config.validate(),
            Err(ValidationError::ReservedColumnName("start_date".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_target_column() {
        let mut config = mapping();
        config
            .column_mapping
            .insert("customer_full_name".to_string(), "name".to_string());

        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateTargetColumn("name".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_business_key_column() {
        let mut config = mapping();
        config.business_key_columns = vec!["missing".to_string()];

        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownBusinessKeyColumn(
                "missing".to_string()
            ))
        );
    }

    #[test]
    fn rejects_tracked_column_inside_business_key() {
        let mut config = mapping();
        config.tracked_columns = Some(vec!["id".to_string()]);

        assert_eq!(
            config.validate(),
            Err(ValidationError::TrackedBusinessKeyColumn("id".to_string()))
        );
    }

    #[test]
    fn rejects_type_for_unmapped_column() {
        let mut config = mapping();
        config
            .column_types
            .insert("missing".to_string(), ColumnType::Float);

        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownTypedColumn("missing".to_string()))
        );
    }

    #[test]
    fn deserializes_from_json_document() {
        let config: MappingConfig = serde_json::from_str(
            r#"{
                "target_table": "customers",
                "target_history_table": "customers_history",
                "column_mapping": {
                    "customer_id": "id",
                    "customer_name": "name"
                },
                "column_types": { "id": "integer" },
                "business_key_columns": ["id"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.target_table.as_deref(), Some("customers"));
        assert_eq!(config.validate(), Ok(()));
    }
}

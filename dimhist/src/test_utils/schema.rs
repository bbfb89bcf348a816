use std::collections::BTreeMap;

use dimhist_config::shared::{ColumnType, MappingConfig};

use crate::types::RawRecord;

/// Name of the history table used by the canned test mapping.
pub const TEST_HISTORY_TABLE: &str = "customers_history";

/// A small customers mapping: integer `id` business key, tracked `name` and
/// `tier` strings.
pub fn customers_mapping() -> MappingConfig {
    MappingConfig {
        target_table: Some("customers".to_string()),
        target_history_table: TEST_HISTORY_TABLE.to_string(),
        column_mapping: BTreeMap::from([
            ("customer_id".to_string(), "id".to_string()),
            ("customer_name".to_string(), "name".to_string()),
            ("customer_tier".to_string(), "tier".to_string()),
        ]),
        column_types: BTreeMap::from([("id".to_string(), ColumnType::Integer)]),
        business_key_columns: vec!["id".to_string()],
        tracked_columns: None,
    }
}

/// Builds a raw customers record for the canned mapping.
pub fn customer_record(id: &str, name: &str, tier: &str) -> RawRecord {
    RawRecord::from([
        ("customer_id".to_string(), id.to_string()),
        ("customer_name".to_string(), name.to_string()),
        ("customer_tier".to_string(), tier.to_string()),
    ])
}

use serde::{Deserialize, Serialize};

use crate::shared::MappingConfig;

/// How the driver treats a record whose required source field is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Fail the batch on the first record with a missing business key field.
    #[default]
    AbortBatch,
    /// Drop the offending record and log a warning.
    SkipAndLog,
}

/// Retry timing for collaborator I/O.
///
/// Delays grow exponentially from `initial_delay_ms`, capped at
/// `max_delay_ms`, with jitter applied by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum attempts per collaborator call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
        }
    }
}

fn default_max_concurrent_key_writers() -> u16 {
    4
}

/// Top-level configuration for one pipeline driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Identifier of this pipeline, used in logs.
    pub id: u64,
    /// Column mapping and SCD2 key configuration.
    pub mapping: MappingConfig,
    /// Policy for records missing a business key field.
    #[serde(default)]
    pub missing_field_policy: MissingFieldPolicy,
    /// Retry timing for the reading and writing stages.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Maximum business-key groups applied concurrently during the write
    /// stage. Operations for the same key are never applied concurrently.
    #[serde(default = "default_max_concurrent_key_writers")]
    pub max_concurrent_key_writers: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn optional_fields_default() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "id": 1,
                "mapping": {
                    "target_history_table": "customers_history",
                    "column_mapping": { "customer_id": "id" },
                    "business_key_columns": ["id"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.missing_field_policy, MissingFieldPolicy::AbortBatch);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.max_concurrent_key_writers, 4);
        assert_eq!(config.mapping.column_types, BTreeMap::new());
    }
}

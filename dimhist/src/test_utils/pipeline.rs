use crate::config::{MissingFieldPolicy, PipelineConfig, RetryConfig};
use crate::pipeline::PipelineDriver;
use crate::source::RecordSource;
use crate::store::{HistorySnapshotReader, HistoryWriter};
use crate::test_utils::schema::customers_mapping;

/// Builds a pipeline configuration around the canned customers mapping.
///
/// Retry delays are kept in the low milliseconds so retry paths stay fast
/// under test.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        id: 1,
        mapping: customers_mapping(),
        missing_field_policy: MissingFieldPolicy::default(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
        },
        max_concurrent_key_writers: 4,
    }
}

/// Creates a pipeline driver over the canned customers mapping.
pub fn create_pipeline<Src, Store>(source: Src, store: Store) -> PipelineDriver<Src, Store>
where
    Src: RecordSource + Send + Sync,
    Store: HistorySnapshotReader + HistoryWriter + Clone + Send + Sync + 'static,
{
    create_pipeline_with(test_pipeline_config(), source, store)
}

/// Creates a pipeline driver with an explicit configuration.
pub fn create_pipeline_with<Src, Store>(
    config: PipelineConfig,
    source: Src,
    store: Store,
) -> PipelineDriver<Src, Store>
where
    Src: RecordSource + Send + Sync,
    Store: HistorySnapshotReader + HistoryWriter + Clone + Send + Sync + 'static,
{
    PipelineDriver::new(config, source, store).expect("test mapping configuration is valid")
}

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;

use crate::error::DimhistResult;
use crate::source::base::{RecordSource, RecordStream};
use crate::types::RawRecord;

/// In-memory record source for tests and local development.
///
/// Holds the full batch in memory and replays it from the start on every
/// [`RecordSource::read`] call, which makes it trivially restartable.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Arc<Vec<RawRecord>>,
}

impl MemoryRecordSource {
    /// Creates a source yielding the given records in order.
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

impl RecordSource for MemoryRecordSource {
    async fn read(&self) -> DimhistResult<RecordStream<'_>> {
        Ok(stream::iter(self.records.iter().cloned().map(Ok)).boxed())
    }
}

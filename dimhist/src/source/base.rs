use std::future::Future;

use futures::stream::BoxStream;

use crate::error::DimhistResult;
use crate::types::RawRecord;

/// A lazy stream of raw records with per-record fallibility.
pub type RecordStream<'a> = BoxStream<'a, DimhistResult<RawRecord>>;

/// Trait for systems that feed raw records into a pipeline run.
///
/// The stream is lazy and finite. Sources must be restartable: every call to
/// [`RecordSource::read`] yields the full sequence from the start, so a
/// failed reading stage can be retried from scratch without partial-read
/// bookkeeping.
pub trait RecordSource {
    /// Opens the source and returns the record stream.
    ///
    /// Transport failures, both here and inside the stream, should surface as
    /// retryable source I/O errors.
    fn read(&self) -> impl Future<Output = DimhistResult<RecordStream<'_>>> + Send;
}

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::DimhistResult;
use crate::types::{CanonicalRecord, HistoryRow, KeyedOperations, MergeOperation, SurrogateKey};

/// Trait for reading the current slice of a history table.
pub trait HistorySnapshotReader {
    /// Returns every history row with `is_current = true` for `table`.
    ///
    /// Returning more than one current row per business key is a contract
    /// violation the detector turns into a fatal error; it is never silently
    /// tolerated.
    fn read_current(&self, table: &str)
    -> impl Future<Output = DimhistResult<Vec<HistoryRow>>> + Send;
}

/// Trait for applying merge operations to a history table.
///
/// Writers own nothing: they consume operations and discard them. Surrogate
/// key generation is the store's responsibility; the engine never assumes a
/// key format.
///
/// Implementations should keep writes idempotent where possible, since the
/// driver retries failed I/O, and must keep the close-before-open order
/// within one business key's group.
pub trait HistoryWriter {
    /// Opens the transactional envelope for one run.
    ///
    /// Writes staged between `begin_run` and `commit_run` must not be visible
    /// to readers until the commit, and must all be discarded by
    /// [`HistoryWriter::abort_run`]. The default is a no-op for stores
    /// without run-level transactions.
    fn begin_run(&self) -> impl Future<Output = DimhistResult<()>> + Send {
        async { Ok(()) }
    }

    /// Makes the run's staged writes visible. Default no-op.
    fn commit_run(&self) -> impl Future<Output = DimhistResult<()>> + Send {
        async { Ok(()) }
    }

    /// Discards the run's staged writes. Default no-op.
    fn abort_run(&self) -> impl Future<Output = DimhistResult<()>> + Send {
        async { Ok(()) }
    }

    /// Terminates the version identified by `surrogate_key`: sets its end
    /// date and clears its current flag.
    fn apply_close(
        &self,
        table: &str,
        surrogate_key: &SurrogateKey,
        end_date: DateTime<Utc>,
    ) -> impl Future<Output = DimhistResult<()>> + Send;

    /// Inserts a new current version and returns its store-assigned
    /// surrogate key.
    fn apply_open(
        &self,
        table: &str,
        record: &CanonicalRecord,
        start_date: DateTime<Utc>,
    ) -> impl Future<Output = DimhistResult<SurrogateKey>> + Send;

    /// Applies one business key's operation group, close before open.
    ///
    /// The default implementation issues the operations in order through
    /// [`HistoryWriter::apply_close`] and [`HistoryWriter::apply_open`];
    /// transactional stores can override it to wrap the group in a single
    /// transaction.
    fn apply_group(
        &self,
        table: &str,
        group: &KeyedOperations,
    ) -> impl Future<Output = DimhistResult<()>> + Send
    where
        Self: Sync,
    {
        async move {
            for operation in &group.operations {
                match operation {
                    MergeOperation::CloseVersion {
                        surrogate_key,
                        end_date,
                    } => {
                        self.apply_close(table, surrogate_key, *end_date).await?;
                    }
                    MergeOperation::OpenVersion { record, start_date } => {
                        self.apply_open(table, record, *start_date).await?;
                    }
                }
            }

            Ok(())
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use crate::dimhist_error;
use crate::error::{DimhistResult, ErrorKind};
use crate::store::{HistorySnapshotReader, HistoryWriter};
use crate::types::{CanonicalRecord, HistoryRow, SurrogateKey};

/// How many transient failures each store operation injects before it starts
/// succeeding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    pub read_current: u32,
    pub apply_close: u32,
    pub apply_open: u32,
}

#[derive(Debug, Default)]
struct RemainingFaults {
    read_current: AtomicU32,
    apply_close: AtomicU32,
    apply_open: AtomicU32,
}

/// Store wrapper injecting a bounded number of transient I/O failures.
///
/// Injected errors carry [`ErrorKind::DestinationIoError`], so the driver's
/// retry path treats them exactly like real transport failures. Once an
/// operation's fault budget is spent, calls pass through to the wrapped
/// store.
#[derive(Debug, Clone)]
pub struct FaultInjectingStore<S> {
    inner: S,
    remaining: Arc<RemainingFaults>,
}

impl<S> FaultInjectingStore<S> {
    /// Wraps a store with the given fault budget.
    pub fn wrap(inner: S, config: FaultConfig) -> Self {
        Self {
            inner,
            remaining: Arc::new(RemainingFaults {
                read_current: AtomicU32::new(config.read_current),
                apply_close: AtomicU32::new(config.apply_close),
                apply_open: AtomicU32::new(config.apply_open),
            }),
        }
    }

    /// Returns the wrapped store.
    pub fn get_inner(&self) -> &S {
        &self.inner
    }

    fn trip(remaining: &AtomicU32, operation: &'static str) -> DimhistResult<()> {
        let mut current = remaining.load(Ordering::SeqCst);
        while current > 0 {
            match remaining.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Err(dimhist_error!(
                        ErrorKind::DestinationIoError,
                        "Injected transient store failure",
                        operation
                    ));
                }
                Err(observed) => current = observed,
            }
        }

        Ok(())
    }
}

impl<S> HistorySnapshotReader for FaultInjectingStore<S>
where
    S: HistorySnapshotReader + Sync,
{
    async fn read_current(&self, table: &str) -> DimhistResult<Vec<HistoryRow>> {
        Self::trip(&self.remaining.read_current, "read_current")?;

        self.inner.read_current(table).await
    }
}

impl<S> HistoryWriter for FaultInjectingStore<S>
where
    S: HistoryWriter + Sync,
{
    async fn begin_run(&self) -> DimhistResult<()> {
        self.inner.begin_run().await
    }

    async fn commit_run(&self) -> DimhistResult<()> {
        self.inner.commit_run().await
    }

    async fn abort_run(&self) -> DimhistResult<()> {
        self.inner.abort_run().await
    }

    async fn apply_close(
        &self,
        table: &str,
        surrogate_key: &SurrogateKey,
        end_date: DateTime<Utc>,
    ) -> DimhistResult<()> {
        Self::trip(&self.remaining.apply_close, "apply_close")?;

        self.inner.apply_close(table, surrogate_key, end_date).await
    }

    async fn apply_open(
        &self,
        table: &str,
        record: &CanonicalRecord,
        start_date: DateTime<Utc>,
    ) -> DimhistResult<SurrogateKey> {
        Self::trip(&self.remaining.apply_open, "apply_open")?;

        self.inner.apply_open(table, record, start_date).await
    }
}

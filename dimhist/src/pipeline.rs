//! Batch pipeline orchestration.
//!
//! [`PipelineDriver`] runs one batch through the linear stage sequence
//! read → normalize → detect → merge → write. Retry with exponential backoff
//! wraps the collaborator I/O stages only; the pure stages are deterministic
//! and never retried. The write stage applies per-key operation groups
//! concurrently inside the writer's run envelope, so a failed or cancelled
//! run commits nothing.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::config::{MissingFieldPolicy, PipelineConfig, RetryConfig};
use crate::detect::detect;
use crate::dimhist_error;
use crate::error::{DimhistResult, ErrorKind};
use crate::merge::merge_grouped;
use crate::normalize::normalize;
use crate::policy::{RetryDirective, build_error_handling_policy};
use crate::schema::RecordSchema;
use crate::source::RecordSource;
use crate::store::{HistorySnapshotReader, HistoryWriter};
use crate::types::{CanonicalRecord, ChangeType, KeyedOperations, MergeOperation, RawRecord};

/// Observable state of a pipeline driver.
///
/// Transitions are linear; `Failed` is terminal for the run and records the
/// kind of the error that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    Normalizing,
    Detecting,
    Merging,
    Writing,
    Done,
    Failed(ErrorKind),
}

/// Counters describing one completed batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Raw records read from the source.
    pub records_read: usize,
    /// Records dropped under the skip-and-log missing-field policy.
    pub records_skipped: usize,
    /// Records classified as new.
    pub new: usize,
    /// Records classified as changed.
    pub changed: usize,
    /// Records classified as unchanged.
    pub unchanged: usize,
    /// Versions closed by the write stage.
    pub versions_closed: usize,
    /// Versions opened by the write stage.
    pub versions_opened: usize,
}

/// Orchestrates one batch at a time against a record source and a history
/// store.
#[derive(Debug)]
pub struct PipelineDriver<Src, Store> {
    config: Arc<PipelineConfig>,
    schema: RecordSchema,
    source: Src,
    store: Store,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl<Src, Store> PipelineDriver<Src, Store>
where
    Src: RecordSource + Send + Sync,
    Store: HistorySnapshotReader + HistoryWriter + Clone + Send + Sync + 'static,
{
    /// Creates a driver for the given configuration and collaborators.
    ///
    /// The mapping configuration is validated here, before any I/O; a bad
    /// mapping never reaches the collaborators.
    pub fn new(config: PipelineConfig, source: Src, store: Store) -> DimhistResult<Self> {
        let schema = RecordSchema::from_mapping(&config.mapping)?;
        let (shutdown_tx, _) = create_shutdown_channel();

        Ok(Self {
            config: Arc::new(config),
            schema,
            source,
            store,
            state: PipelineState::Idle,
            shutdown_tx,
        })
    }

    /// Returns the driver's current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns a handle that cancels the run when signaled.
    ///
    /// Cancellation is observed between per-key write groups, never inside
    /// one, and aborts the writer's run envelope.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Runs one batch with the current time as the version boundary.
    pub async fn run(&mut self) -> DimhistResult<BatchReport> {
        self.run_at(Utc::now()).await
    }

    /// Runs one batch with an explicit as-of timestamp.
    ///
    /// On success the driver ends in `Done`; on failure in `Failed` with the
    /// error kind, and the error carries the failing detail. The batch is
    /// never partially committed.
    pub async fn run_at(&mut self, as_of: DateTime<Utc>) -> DimhistResult<BatchReport> {
        info!(
            "starting batch run for history table '{}' with pipeline id {}",
            self.schema.history_table(),
            self.config.id
        );

        match self.try_run(as_of).await {
            Ok(report) => {
                self.state = PipelineState::Done;
                info!(
                    records_read = report.records_read,
                    new = report.new,
                    changed = report.changed,
                    unchanged = report.unchanged,
                    versions_closed = report.versions_closed,
                    versions_opened = report.versions_opened,
                    "batch run completed"
                );

                Ok(report)
            }
            Err(err) => {
                let stage = self.state;
                self.state = PipelineState::Failed(err.kind());
                error!("batch run failed in stage {stage:?}: {err}");

                Err(err)
            }
        }
    }

    async fn try_run(&mut self, as_of: DateTime<Utc>) -> DimhistResult<BatchReport> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        let mut report = BatchReport::default();

        self.state = PipelineState::Reading;
        let raw_records = with_retry(&self.config.retry, "read_source", || async {
            let stream = self.source.read().await?;
            stream.try_collect::<Vec<RawRecord>>().await
        })
        .await?;
        report.records_read = raw_records.len();

        let snapshot = with_retry(&self.config.retry, "read_snapshot", || {
            self.store.read_current(self.schema.history_table())
        })
        .await?;
        debug!(
            records = raw_records.len(),
            snapshot_rows = snapshot.len(),
            "read stage completed"
        );

        self.state = PipelineState::Normalizing;
        let batch = self.normalize_batch(&raw_records, &mut report)?;

        self.state = PipelineState::Detecting;
        let changes = detect(&batch, &snapshot, &self.schema)?;
        for change in &changes {
            match change.change_type() {
                ChangeType::New => report.new += 1,
                ChangeType::Changed => report.changed += 1,
                ChangeType::Unchanged => report.unchanged += 1,
            }
        }

        self.state = PipelineState::Merging;
        let groups = merge_grouped(&changes, as_of);
        for group in &groups {
            for operation in &group.operations {
                match operation {
                    MergeOperation::CloseVersion { .. } => report.versions_closed += 1,
                    MergeOperation::OpenVersion { .. } => report.versions_opened += 1,
                }
            }
        }

        self.state = PipelineState::Writing;
        if groups.is_empty() {
            debug!("no operations to write");
            return Ok(report);
        }

        self.write_groups(groups, shutdown_rx).await?;

        Ok(report)
    }

    /// Normalizes the raw batch, applying the configured missing-field
    /// policy.
    fn normalize_batch(
        &self,
        raw_records: &[RawRecord],
        report: &mut BatchReport,
    ) -> DimhistResult<Vec<CanonicalRecord>> {
        let mut batch = Vec::with_capacity(raw_records.len());

        for raw in raw_records {
            match normalize(raw, &self.schema) {
                Ok(record) => batch.push(record),
                Err(err)
                    if err.kind() == ErrorKind::MissingField
                        && self.config.missing_field_policy == MissingFieldPolicy::SkipAndLog =>
                {
                    report.records_skipped += 1;
                    warn!("skipping record with missing business key field: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(batch)
    }

    /// Applies the per-key groups inside the writer's run envelope.
    ///
    /// Groups for distinct keys run concurrently, bounded by the configured
    /// permit count; operations within a group stay ordered. On any failure
    /// the envelope is aborted so nothing becomes visible.
    async fn write_groups(
        &self,
        groups: Vec<KeyedOperations>,
        shutdown_rx: ShutdownRx,
    ) -> DimhistResult<()> {
        with_retry(&self.config.retry, "begin_run", || self.store.begin_run()).await?;

        let result = match self.apply_groups(groups, shutdown_rx).await {
            Ok(()) => {
                with_retry(&self.config.retry, "commit_run", || self.store.commit_run()).await
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            // A failed commit leaves the envelope open; abort it so the store
            // does not stay locked in a half-open run.
            if let Err(abort_err) = self.store.abort_run().await {
                warn!("failed to abort the run envelope: {abort_err}");
            }

            return Err(err);
        }

        Ok(())
    }

    async fn apply_groups(
        &self,
        groups: Vec<KeyedOperations>,
        shutdown_rx: ShutdownRx,
    ) -> DimhistResult<()> {
        let table: Arc<str> = Arc::from(self.schema.history_table());
        let semaphore = Arc::new(Semaphore::new(
            self.config.max_concurrent_key_writers.max(1) as usize,
        ));

        let mut join_set = JoinSet::new();
        let mut cancelled = false;

        for group in groups {
            if shutdown_rx.is_shutdown() {
                cancelled = true;
                break;
            }

            let config = self.config.clone();
            let store = self.store.clone();
            let table = table.clone();
            let semaphore = semaphore.clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");

                with_retry(&config.retry, "apply_group", || {
                    store.apply_group(&table, &group)
                })
                .await
                .map_err(|err| {
                    dimhist_error!(
                        err.kind(),
                        "Failed to apply operation group",
                        format!("business key ({})", group.key),
                        source: err
                    )
                })
            });
        }

        let mut errors = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(join_err) => errors.push(dimhist_error!(
                    ErrorKind::Unknown,
                    "Write worker panicked",
                    join_err.to_string()
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        if cancelled {
            return Err(dimhist_error!(
                ErrorKind::Cancelled,
                "Batch run cancelled by shutdown signal"
            ));
        }

        Ok(())
    }
}

/// Retries a collaborator call with exponential backoff and jitter.
///
/// Only errors the policy classifies as timed-retryable are retried, up to
/// the configured attempt budget.
async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    operation_name: &'static str,
    mut operation: F,
) -> DimhistResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DimhistResult<T>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let policy = build_error_handling_policy(&err);
                if policy.retry_directive() != RetryDirective::Timed || attempt >= max_attempts {
                    return Err(err);
                }

                let delay = backoff_delay(retry, attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure: {err}"
                );
                sleep(delay).await;

                attempt += 1;
            }
        }
    }
}

/// Computes the delay before the next attempt.
///
/// The base doubles per attempt up to the configured ceiling; the actual
/// delay is drawn from `[base / 2, base]` so concurrent retries spread out.
fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = retry
        .initial_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(retry.max_delay_ms)
        .max(1);
    let jittered = rand::thread_rng().gen_range(base / 2..=base);

    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_delay_ms: 100,
            max_delay_ms: 400,
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_ceiling() {
        let retry = retry_config();

        for (attempt, ceiling) in [(1, 100), (2, 200), (3, 400), (4, 400), (10, 400)] {
            let delay = backoff_delay(&retry, attempt);
            assert!(delay >= Duration::from_millis(ceiling / 2));
            assert!(delay <= Duration::from_millis(ceiling));
        }
    }

    #[tokio::test]
    async fn retry_stops_on_non_retryable_errors() {
        let mut calls = 0u32;
        let result: DimhistResult<()> = with_retry(&retry_config(), "test", || {
            calls += 1;
            async { Err(dimhist_error!(ErrorKind::ConfigError, "bad mapping")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigError);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_exhausts_the_attempt_budget() {
        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
        };

        let mut calls = 0u32;
        let result: DimhistResult<()> = with_retry(&retry, "test", || {
            calls += 1;
            async { Err(dimhist_error!(ErrorKind::SourceIoError, "read failed")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::SourceIoError);
        assert_eq!(calls, 3);
    }
}

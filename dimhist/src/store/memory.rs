use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::bail;
use crate::error::{DimhistResult, ErrorKind};
use crate::failpoints::{
    HISTORY_STORE__APPLY_CLOSE, HISTORY_STORE__APPLY_OPEN, HISTORY_STORE__READ_CURRENT,
    dimhist_fail_point,
};
use crate::store::base::{HistorySnapshotReader, HistoryWriter};
use crate::types::{CanonicalRecord, HistoryRow, SurrogateKey};

/// A write staged by an open run, applied to the committed tables on commit.
#[derive(Debug)]
enum StagedWrite {
    Close {
        table: String,
        surrogate_key: SurrogateKey,
        end_date: DateTime<Utc>,
    },
    Open {
        table: String,
        row: HistoryRow,
    },
}

#[derive(Debug, Default)]
struct Inner {
    /// Committed history rows per table.
    tables: HashMap<String, Vec<HistoryRow>>,
    /// Writes staged by the open run, `None` when no run is open.
    staged: Option<Vec<StagedWrite>>,
}

/// In-memory implementation of both history collaborator interfaces.
///
/// Rows live in process memory and surrogate keys are UUID v4 strings. A
/// run's writes are staged between `begin_run` and `commit_run` and only
/// become visible to readers after the commit, mirroring the transactional
/// behavior expected from real stores: an aborted or failed run commits
/// nothing.
///
/// Closes are conditioned on the target row still being current, so a
/// snapshot that went stale under the run surfaces as
/// [`ErrorKind::StaleSnapshot`] instead of silently producing overlapping
/// versions.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryHistoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds committed history rows for a table, bypassing the run envelope.
    pub async fn seed(&self, table: &str, rows: Vec<HistoryRow>) {
        let mut inner = self.inner.lock().await;
        inner.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Returns a copy of all committed history rows for a table.
    pub async fn history_rows(&self, table: &str) -> Vec<HistoryRow> {
        let inner = self.inner.lock().await;
        inner.tables.get(table).cloned().unwrap_or_default()
    }

    /// Returns the committed current rows for a table, the derived
    /// current-state view.
    pub async fn current_rows(&self, table: &str) -> Vec<HistoryRow> {
        self.history_rows(table)
            .await
            .into_iter()
            .filter(|row| row.is_current)
            .collect()
    }

    /// Returns whether a run envelope is currently open.
    pub async fn run_open(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.staged.is_some()
    }
}

impl HistorySnapshotReader for MemoryHistoryStore {
    async fn read_current(&self, table: &str) -> DimhistResult<Vec<HistoryRow>> {
        dimhist_fail_point(HISTORY_STORE__READ_CURRENT)?;

        Ok(self.current_rows(table).await)
    }
}

impl HistoryWriter for MemoryHistoryStore {
    async fn begin_run(&self) -> DimhistResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.staged.is_some() {
            bail!(
                ErrorKind::InvalidState,
                "A run is already open on this store"
            );
        }

        inner.staged = Some(Vec::new());

        Ok(())
    }

    async fn commit_run(&self) -> DimhistResult<()> {
        let mut inner = self.inner.lock().await;

        let Some(staged) = inner.staged.take() else {
            bail!(ErrorKind::InvalidState, "No open run to commit");
        };

        debug!("committing {} staged writes", staged.len());

        for write in staged {
            match write {
                StagedWrite::Close {
                    table,
                    surrogate_key,
                    end_date,
                } => {
                    let rows = inner.tables.entry(table).or_default();
                    if let Some(row) = rows
                        .iter_mut()
                        .find(|row| row.surrogate_key == surrogate_key)
                    {
                        row.close(end_date);
                    }
                }
                StagedWrite::Open { table, row } => {
                    inner.tables.entry(table).or_default().push(row);
                }
            }
        }

        Ok(())
    }

    async fn abort_run(&self) -> DimhistResult<()> {
        let mut inner = self.inner.lock().await;

        if let Some(staged) = inner.staged.take() {
            debug!("discarding {} staged writes", staged.len());
        }

        Ok(())
    }

    async fn apply_close(
        &self,
        table: &str,
        surrogate_key: &SurrogateKey,
        end_date: DateTime<Utc>,
    ) -> DimhistResult<()> {
        dimhist_fail_point(HISTORY_STORE__APPLY_CLOSE)?;

        let mut inner = self.inner.lock().await;

        if inner.staged.is_none() {
            bail!(ErrorKind::InvalidState, "No open run to write into");
        }

        // The close is validated against committed state, which is what the
        // snapshot was read from: a row that is gone or no longer current
        // means the snapshot went stale under us.
        let row = inner
            .tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| &row.surrogate_key == surrogate_key));
        match row {
            None => bail!(
                ErrorKind::StaleSnapshot,
                "Version to close does not exist",
                format!("surrogate key {surrogate_key} in table '{table}'")
            ),
            Some(row) if !row.is_current => bail!(
                ErrorKind::StaleSnapshot,
                "Version to close is no longer current",
                format!("surrogate key {surrogate_key} in table '{table}'")
            ),
            Some(_) => {}
        }

        inner
            .staged
            .as_mut()
            .expect("checked above that a run is open")
            .push(StagedWrite::Close {
                table: table.to_string(),
                surrogate_key: surrogate_key.clone(),
                end_date,
            });

        Ok(())
    }

    async fn apply_open(
        &self,
        table: &str,
        record: &CanonicalRecord,
        start_date: DateTime<Utc>,
    ) -> DimhistResult<SurrogateKey> {
        dimhist_fail_point(HISTORY_STORE__APPLY_OPEN)?;

        let mut inner = self.inner.lock().await;

        let Some(staged) = inner.staged.as_mut() else {
            bail!(ErrorKind::InvalidState, "No open run to write into");
        };

        let surrogate_key = SurrogateKey::new(Uuid::new_v4().to_string());
        staged.push(StagedWrite::Open {
            table: table.to_string(),
            row: HistoryRow::open(surrogate_key.clone(), record.clone(), start_date),
        });

        Ok(surrogate_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;
    use chrono::TimeZone;

    const TABLE: &str = "customers_history";

    fn record(id: i64, name: &str) -> CanonicalRecord {
        CanonicalRecord::new(vec![Cell::I64(id), Cell::from(name)])
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = MemoryHistoryStore::new();

        store.begin_run().await.unwrap();
        store
            .apply_open(TABLE, &record(1, "A"), ts(1))
            .await
            .unwrap();
        assert!(store.read_current(TABLE).await.unwrap().is_empty());

        store.commit_run().await.unwrap();
        assert_eq!(store.read_current(TABLE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn aborted_run_commits_nothing() {
        let store = MemoryHistoryStore::new();

        store.begin_run().await.unwrap();
        store
            .apply_open(TABLE, &record(1, "A"), ts(1))
            .await
            .unwrap();
        store.abort_run().await.unwrap();

        assert!(store.history_rows(TABLE).await.is_empty());
        assert!(!store.run_open().await);
    }

    #[tokio::test]
    async fn close_then_open_swaps_the_current_version() {
        let store = MemoryHistoryStore::new();

        store.begin_run().await.unwrap();
        let first = store
            .apply_open(TABLE, &record(1, "A"), ts(1))
            .await
            .unwrap();
        store.commit_run().await.unwrap();

        store.begin_run().await.unwrap();
        store.apply_close(TABLE, &first, ts(2)).await.unwrap();
        store
            .apply_open(TABLE, &record(1, "B"), ts(2))
            .await
            .unwrap();
        store.commit_run().await.unwrap();

        let rows = store.history_rows(TABLE).await;
        assert_eq!(rows.len(), 2);

        let closed = rows
            .iter()
            .find(|row| row.surrogate_key == first)
            .unwrap();
        assert!(!closed.is_current);
        assert_eq!(closed.end_date, Some(ts(2)));

        let current = store.current_rows(TABLE).await;
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].record, record(1, "B"));
    }

    #[tokio::test]
    async fn closing_a_non_current_row_is_a_stale_snapshot() {
        let store = MemoryHistoryStore::new();

        store.begin_run().await.unwrap();
        let first = store
            .apply_open(TABLE, &record(1, "A"), ts(1))
            .await
            .unwrap();
        store.commit_run().await.unwrap();

        store.begin_run().await.unwrap();
        store.apply_close(TABLE, &first, ts(2)).await.unwrap();
        store.commit_run().await.unwrap();

        store.begin_run().await.unwrap();
        let err = store.apply_close(TABLE, &first, ts(3)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleSnapshot);
    }

    #[tokio::test]
    async fn writes_outside_a_run_are_rejected() {
        let store = MemoryHistoryStore::new();

        let err = store
            .apply_open(TABLE, &record(1, "A"), ts(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn double_begin_is_rejected() {
        let store = MemoryHistoryStore::new();

        store.begin_run().await.unwrap();
        let err = store.begin_run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}

//! Manual-check quota bookkeeping.
//!
//! Rows are keyed by (owner, target, day); the per-(owner, day) aggregate
//! counter lives in the row keyed by the sentinel target id. The daily
//! increment is atomic: the whole map is mutated under one lock, and the
//! cap test happens against the pre-increment count so a rejected request
//! never bumps the counter.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use pagewatch_core::{OwnerId, QuotaRecord, TargetId};

use crate::error::StoreError;
use crate::jsonfile;

/// Result of the atomic daily increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Incremented; carries the new count.
    Incremented(u32),
    /// Pre-increment count already met the cap; counter untouched.
    CapReached(u32),
}

#[async_trait::async_trait]
pub trait QuotaStore: Send + Sync {
    /// Most recent manual-check timestamp for (owner, target), across
    /// day rows. The cooldown window rolls over calendar boundaries.
    async fn last_monitored(
        &self,
        owner: OwnerId,
        target: TargetId,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Record a manual check against (owner, target) at `at`.
    async fn record_monitored(
        &self,
        owner: OwnerId,
        target: TargetId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically increment the (owner, day) counter unless the
    /// pre-increment count already meets `cap`.
    async fn try_increment_daily(
        &self,
        owner: OwnerId,
        day: NaiveDate,
        cap: Option<u32>,
    ) -> Result<IncrementOutcome, StoreError>;

    /// Current (owner, day) counter value.
    async fn daily_count(&self, owner: OwnerId, day: NaiveDate) -> Result<u32, StoreError>;
}

fn row_key(owner: OwnerId, target: TargetId, day: NaiveDate) -> String {
    format!("{owner}:{target}:{day}")
}

type QuotaMap = HashMap<String, QuotaRecord>;

/// JSON-file quota store; in-memory only when constructed without a path.
pub struct JsonQuotaStore {
    path: Option<PathBuf>,
    rows: Mutex<QuotaMap>,
}

impl JsonQuotaStore {
    pub fn open(data_dir: &std::path::Path) -> Result<Self, StoreError> {
        let path = data_dir.join("quotas.json");
        let rows = jsonfile::load_or_default(&path)?;
        Ok(Self {
            path: Some(path),
            rows: Mutex::new(rows),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn persist(&self, rows: &QuotaMap) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => jsonfile::save(path, rows),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl QuotaStore for JsonQuotaStore {
    async fn last_monitored(
        &self,
        owner: OwnerId,
        target: TargetId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|r| r.owner == owner && r.target == target)
            .filter_map(|r| r.last_monitored_at)
            .max())
    }

    async fn record_monitored(
        &self,
        owner: OwnerId,
        target: TargetId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let day = at.date_naive();
        let mut rows = self.rows.lock().await;
        let row = rows
            .entry(row_key(owner, target, day))
            .or_insert_with(|| QuotaRecord {
                owner,
                target,
                day,
                last_monitored_at: None,
                count: 0,
            });
        row.last_monitored_at = Some(at);
        self.persist(&rows)
    }

    async fn try_increment_daily(
        &self,
        owner: OwnerId,
        day: NaiveDate,
        cap: Option<u32>,
    ) -> Result<IncrementOutcome, StoreError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .entry(row_key(owner, TargetId::quota_aggregate(), day))
            .or_insert_with(|| QuotaRecord {
                owner,
                target: TargetId::quota_aggregate(),
                day,
                last_monitored_at: None,
                count: 0,
            });

        if let Some(cap) = cap {
            if row.count >= cap {
                return Ok(IncrementOutcome::CapReached(row.count));
            }
        }

        row.count += 1;
        let count = row.count;
        self.persist(&rows)?;
        Ok(IncrementOutcome::Incremented(count))
    }

    async fn daily_count(&self, owner: OwnerId, day: NaiveDate) -> Result<u32, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&row_key(owner, TargetId::quota_aggregate(), day))
            .map(|r| r.count)
            .unwrap_or(0))
    }
}

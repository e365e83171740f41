//! Append-only check history.
//!
//! Records are never mutated after append with one exception: baseline
//! rotation nulls the three artifact references on a superseded record.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;
use uuid::Uuid;

use pagewatch_core::{CheckRecord, TargetId};

use crate::error::StoreError;
use crate::jsonfile;

/// The check history ledger.
#[async_trait::async_trait]
pub trait CheckLedger: Send + Sync {
    /// Append one record.
    async fn append(&self, record: CheckRecord) -> Result<(), StoreError>;

    /// The latest record for a target (greatest `created_at`), whose
    /// `current_artifact` is the baseline for the next comparison.
    async fn latest(&self, target: TargetId) -> Result<Option<CheckRecord>, StoreError>;

    /// Newest-first history for a target.
    async fn history(&self, target: TargetId, limit: usize) -> Result<Vec<CheckRecord>, StoreError>;

    /// Null out all three artifact references on a record (rotation).
    async fn clear_artifacts(&self, target: TargetId, record_id: Uuid) -> Result<(), StoreError>;
}

type LedgerMap = HashMap<TargetId, Vec<CheckRecord>>;

/// JSON-file ledger; in-memory only when constructed without a path.
pub struct JsonCheckLedger {
    path: Option<PathBuf>,
    records: Mutex<LedgerMap>,
}

impl JsonCheckLedger {
    pub fn open(data_dir: &std::path::Path) -> Result<Self, StoreError> {
        let path = data_dir.join("checks.json");
        let records = jsonfile::load_or_default(&path)?;
        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn persist(&self, records: &LedgerMap) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => jsonfile::save(path, records),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl CheckLedger for JsonCheckLedger {
    async fn append(&self, record: CheckRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.entry(record.target_id).or_default().push(record);
        self.persist(&records)
    }

    async fn latest(&self, target: TargetId) -> Result<Option<CheckRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .get(&target)
            .and_then(|list| list.iter().max_by_key(|r| r.created_at))
            .cloned())
    }

    async fn history(&self, target: TargetId, limit: usize) -> Result<Vec<CheckRecord>, StoreError> {
        let records = self.records.lock().await;
        let mut list = records.get(&target).cloned().unwrap_or_default();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn clear_artifacts(&self, target: TargetId, record_id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&target)
            .and_then(|list| list.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| StoreError::NotFound(format!("check record {record_id}")))?;
        record.current_artifact = None;
        record.previous_artifact = None;
        record.diff_artifact = None;
        self.persist(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pagewatch_core::{CheckKind, CheckStatus, TargetClass};

    fn record(target: TargetId, offset_mins: i64, artifact: &str) -> CheckRecord {
        CheckRecord {
            id: Uuid::new_v4(),
            target_id: target,
            target_kind: TargetClass::Page,
            check_kind: CheckKind::ContentChange,
            status: CheckStatus::Ok,
            message: "no change".into(),
            current_artifact: Some(artifact.into()),
            previous_artifact: None,
            diff_artifact: None,
            overall_pct: None,
            first_view_pct: None,
            body_pct: None,
            detail: None,
            created_at: Utc::now() + Duration::minutes(offset_mins),
        }
    }

    #[tokio::test]
    async fn latest_is_greatest_created_at() {
        let ledger = JsonCheckLedger::in_memory();
        let target = TargetId::new();
        ledger.append(record(target, 0, "a")).await.unwrap();
        ledger.append(record(target, 10, "b")).await.unwrap();
        ledger.append(record(target, 5, "c")).await.unwrap();

        let latest = ledger.latest(target).await.unwrap().unwrap();
        assert_eq!(latest.current_artifact.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let ledger = JsonCheckLedger::in_memory();
        let target = TargetId::new();
        for i in 0..5 {
            ledger.append(record(target, i, &format!("a{i}"))).await.unwrap();
        }
        let history = ledger.history(target, 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].current_artifact.as_deref(), Some("a4"));
    }

    #[tokio::test]
    async fn clear_artifacts_nulls_all_three_refs() {
        let ledger = JsonCheckLedger::in_memory();
        let target = TargetId::new();
        let mut r = record(target, 0, "a");
        r.previous_artifact = Some("p".into());
        r.diff_artifact = Some("d".into());
        let id = r.id;
        ledger.append(r).await.unwrap();

        ledger.clear_artifacts(target, id).await.unwrap();
        let latest = ledger.latest(target).await.unwrap().unwrap();
        assert!(latest.current_artifact.is_none());
        assert!(latest.previous_artifact.is_none());
        assert!(latest.diff_artifact.is_none());
    }

    #[tokio::test]
    async fn file_backed_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetId::new();
        {
            let ledger = JsonCheckLedger::open(dir.path()).unwrap();
            ledger.append(record(target, 0, "a")).await.unwrap();
        }
        let reopened = JsonCheckLedger::open(dir.path()).unwrap();
        assert!(reopened.latest(target).await.unwrap().is_some());
    }
}

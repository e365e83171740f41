//! Append-only delivery audit trail.
//!
//! Every dispatch attempt is recorded per owner, success or failure,
//! so operators can answer "was the alert actually sent".

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

use pagewatch_core::OwnerId;

use crate::traits::{DeliveryRecord, NotifyError};

/// Store of per-owner delivery records.
#[async_trait::async_trait]
pub trait NotificationHistory: Send + Sync {
    /// Append one delivery attempt to the owner's audit trail.
    async fn append(&self, record: DeliveryRecord) -> Result<(), NotifyError>;

    /// Delivery records for an owner, newest first, at most `limit`.
    async fn for_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<DeliveryRecord>, NotifyError>;
}

/// JSON-file backed delivery history.
///
/// Records are held in memory and flushed to disk after each append.
/// With no path the history is purely in-memory (tests).
pub struct JsonNotificationHistory {
    path: Option<PathBuf>,
    records: Mutex<HashMap<OwnerId, Vec<DeliveryRecord>>>,
}

impl JsonNotificationHistory {
    /// Open a file-backed history, loading existing records if the file exists.
    pub fn open(path: PathBuf) -> Result<Self, NotifyError> {
        let records = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .map_err(|e| NotifyError::Config(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&data)
                .map_err(|e| NotifyError::Config(format!("parse {}: {e}", path.display())))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    /// Purely in-memory history.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn persist(&self, records: &HashMap<OwnerId, Vec<DeliveryRecord>>) -> Result<(), NotifyError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NotifyError::Config(format!("create {}: {e}", parent.display())))?;
        }
        let data = serde_json::to_string_pretty(records)
            .map_err(|e| NotifyError::Config(format!("serialize history: {e}")))?;
        std::fs::write(path, data)
            .map_err(|e| NotifyError::Config(format!("write {}: {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationHistory for JsonNotificationHistory {
    async fn append(&self, record: DeliveryRecord) -> Result<(), NotifyError> {
        let mut records = self.records.lock().await;
        records.entry(record.owner).or_default().push(record);
        self.persist(&records)
    }

    async fn for_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<DeliveryRecord>, NotifyError> {
        let records = self.records.lock().await;
        let mut out: Vec<DeliveryRecord> = records.get(&owner).cloned().unwrap_or_default();
        out.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        out.truncate(limit);
        Ok(out)
    }
}

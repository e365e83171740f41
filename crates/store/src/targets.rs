//! Monitored-target registry.
//!
//! Target CRUD belongs to an external collaborator; the engine only needs
//! registration (which seeds the baseline check) and owner-scoped reads
//! for scheduled cycles.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

use pagewatch_core::{MonitoredTarget, OwnerId, TargetId};

use crate::error::StoreError;
use crate::jsonfile;

#[async_trait::async_trait]
pub trait TargetStore: Send + Sync {
    async fn insert(&self, target: MonitoredTarget) -> Result<(), StoreError>;

    async fn get(&self, id: TargetId) -> Result<Option<MonitoredTarget>, StoreError>;

    /// Targets owned by `owner`, oldest id first (the order auto-correction
    /// uses when excluding plan-limit overflow).
    async fn for_owner(&self, owner: OwnerId) -> Result<Vec<MonitoredTarget>, StoreError>;
}

type TargetMap = HashMap<TargetId, MonitoredTarget>;

/// JSON-file target store; in-memory only when constructed without a path.
pub struct JsonTargetStore {
    path: Option<PathBuf>,
    targets: Mutex<TargetMap>,
}

impl JsonTargetStore {
    pub fn open(data_dir: &std::path::Path) -> Result<Self, StoreError> {
        let path = data_dir.join("targets.json");
        let targets = jsonfile::load_or_default(&path)?;
        Ok(Self {
            path: Some(path),
            targets: Mutex::new(targets),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            targets: Mutex::new(HashMap::new()),
        }
    }

    fn persist(&self, targets: &TargetMap) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => jsonfile::save(path, targets),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl TargetStore for JsonTargetStore {
    async fn insert(&self, target: MonitoredTarget) -> Result<(), StoreError> {
        let mut targets = self.targets.lock().await;
        targets.insert(target.id, target);
        self.persist(&targets)
    }

    async fn get(&self, id: TargetId) -> Result<Option<MonitoredTarget>, StoreError> {
        Ok(self.targets.lock().await.get(&id).cloned())
    }

    async fn for_owner(&self, owner: OwnerId) -> Result<Vec<MonitoredTarget>, StoreError> {
        let targets = self.targets.lock().await;
        let mut list: Vec<MonitoredTarget> = targets
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        list.sort_by_key(|t| t.id);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagewatch_core::TargetKind;

    fn target(owner: OwnerId) -> MonitoredTarget {
        MonitoredTarget {
            id: TargetId::new(),
            owner,
            kind: TargetKind::Page {
                url: "https://example.com".into(),
            },
            label: "landing".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn owner_scoped_listing() {
        let store = JsonTargetStore::in_memory();
        let owner = OwnerId::new();
        let other = OwnerId::new();
        store.insert(target(owner)).await.unwrap();
        store.insert(target(owner)).await.unwrap();
        store.insert(target(other)).await.unwrap();

        let mine = store.for_owner(owner).await.unwrap();
        assert_eq!(mine.len(), 2);
        // Ordered by id so exclusion picks are deterministic.
        assert!(mine[0].id <= mine[1].id);
    }
}

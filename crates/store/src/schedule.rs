//! Schedule state repository.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::Mutex;

use pagewatch_core::{OwnerId, ScheduleId, ScheduleState};

use crate::error::StoreError;
use crate::jsonfile;

#[async_trait::async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, id: ScheduleId) -> Result<Option<ScheduleState>, StoreError>;

    async fn for_owner(&self, owner: OwnerId) -> Result<Vec<ScheduleState>, StoreError>;

    /// All enabled schedules, for tick evaluation.
    async fn list_enabled(&self) -> Result<Vec<ScheduleState>, StoreError>;

    /// Insert or replace a schedule.
    async fn upsert(&self, state: ScheduleState) -> Result<(), StoreError>;

    async fn delete(&self, id: ScheduleId) -> Result<(), StoreError>;
}

type ScheduleMap = HashMap<ScheduleId, ScheduleState>;

/// JSON-file schedule store; in-memory only when constructed without a path.
pub struct JsonScheduleStore {
    path: Option<PathBuf>,
    schedules: Mutex<ScheduleMap>,
}

impl JsonScheduleStore {
    pub fn open(data_dir: &std::path::Path) -> Result<Self, StoreError> {
        let path = data_dir.join("schedules.json");
        let schedules = jsonfile::load_or_default(&path)?;
        Ok(Self {
            path: Some(path),
            schedules: Mutex::new(schedules),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            schedules: Mutex::new(HashMap::new()),
        }
    }

    fn persist(&self, schedules: &ScheduleMap) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => jsonfile::save(path, schedules),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ScheduleStore for JsonScheduleStore {
    async fn get(&self, id: ScheduleId) -> Result<Option<ScheduleState>, StoreError> {
        Ok(self.schedules.lock().await.get(&id).cloned())
    }

    async fn for_owner(&self, owner: OwnerId) -> Result<Vec<ScheduleState>, StoreError> {
        Ok(self
            .schedules
            .lock()
            .await
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect())
    }

    async fn list_enabled(&self) -> Result<Vec<ScheduleState>, StoreError> {
        Ok(self
            .schedules
            .lock()
            .await
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn upsert(&self, state: ScheduleState) -> Result<(), StoreError> {
        let mut schedules = self.schedules.lock().await;
        schedules.insert(state.id, state);
        self.persist(&schedules)
    }

    async fn delete(&self, id: ScheduleId) -> Result<(), StoreError> {
        let mut schedules = self.schedules.lock().await;
        schedules.remove(&id);
        self.persist(&schedules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn schedule(enabled: bool) -> ScheduleState {
        ScheduleState {
            id: ScheduleId::new(),
            owner: OwnerId::new(),
            enabled,
            interval_days: 1,
            execute_hour: 9,
            excluded_targets: HashSet::new(),
            last_run_at: None,
            next_run_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let store = JsonScheduleStore::in_memory();
        let s = schedule(true);
        let id = s.id;
        store.upsert(s).await.unwrap();
        assert!(store.get(id).await.unwrap().is_some());

        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_enabled_filters_disabled() {
        let store = JsonScheduleStore::in_memory();
        store.upsert(schedule(true)).await.unwrap();
        store.upsert(schedule(false)).await.unwrap();
        assert_eq!(store.list_enabled().await.unwrap().len(), 1);
    }
}

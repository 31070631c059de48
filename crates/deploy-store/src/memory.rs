use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use deploy_domain::DurableRecord;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::StateStore;

/// In-memory implementation of [`StateStore`].
///
/// All data is lost on process exit. Used by tests and the local platform.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<Uuid, DurableRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(&self, record: &DurableRecord) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        if guard.contains_key(&record.uuid) {
            return Err(StoreError::RowsAffected { expected: 1, got: 0 });
        }
        guard.insert(record.uuid, record.clone());
        Ok(())
    }

    async fn get(&self, uuid: Uuid) -> Result<DurableRecord, StoreError> {
        let guard = self.records.read().await;
        guard.get(&uuid).cloned().ok_or_else(|| StoreError::NotFound(uuid.to_string()))
    }

    async fn update(&self, record: &DurableRecord) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        if !guard.contains_key(&record.uuid) {
            return Err(StoreError::RowsAffected { expected: 1, got: 0 });
        }
        guard.insert(record.uuid, record.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

use async_trait::async_trait;
use deploy_domain::DurableRecord;
use uuid::Uuid;

use crate::error::StoreError;

/// Key→record mapping keyed by request identifier. Holds the authoritative
/// state label and an opaque encoded snapshot of the full request.
///
/// `insert` and `update` must each affect exactly one row — callers rely on
/// that to detect the "row vanished" and "uuid already exists" cases without
/// a separate existence check.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert(&self, record: &DurableRecord) -> Result<(), StoreError>;

    async fn get(&self, uuid: Uuid) -> Result<DurableRecord, StoreError>;

    async fn update(&self, record: &DurableRecord) -> Result<(), StoreError>;

    /// Used by the `/health` endpoint — any round trip to the backing store
    /// that would surface a connectivity failure.
    async fn ping(&self) -> Result<(), StoreError>;
}

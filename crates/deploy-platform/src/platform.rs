use async_trait::async_trait;
use deploy_domain::{Container, PublishedServiceType};
use uuid::Uuid;

use crate::error::PlatformError;

/// The container workload platform: creates and tears down deployments and
/// their published services, polling each for readiness.
///
/// Every operation is keyed by `(uuid, name)` — `uuid` disambiguates the
/// request, `name` is the object's stable identity on the platform. Creation
/// is idempotent with respect to that pair: calling it again for an object
/// that already exists must not fail.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Creates a workload with one replica labelled `{app: name, uuid}` and the
    /// given containers, then blocks until the workload reports as many
    /// available replicas as desired *and* an `Available=True` condition.
    async fn create_deployment(
        &self,
        uuid: Uuid,
        name: &str,
        containers: &[Container],
    ) -> Result<(), PlatformError>;

    /// Creates a `"{name}-service"` publication object of the given type,
    /// exposing `port` (port == target port), same label selector as the
    /// deployment. Polls for an address and returns it (empty string if the
    /// service type carries no external address).
    async fn create_published_service(
        &self,
        uuid: Uuid,
        name: &str,
        service_type: PublishedServiceType,
        port: u16,
    ) -> Result<String, PlatformError>;

    async fn delete_deployment(&self, uuid: Uuid, name: &str) -> Result<(), PlatformError>;

    async fn delete_published_service(&self, uuid: Uuid, name: &str) -> Result<(), PlatformError>;
}

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use deploy_domain::{Container, PublishedServiceType};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::platform::Platform;

/// A fake platform that simulates readiness instantly with no I/O.
///
/// Tracks which deployment and service names currently "exist" so tests can
/// assert on idempotent create and delete-of-nonexistent behavior.
#[derive(Debug, Default, Clone)]
pub struct LocalPlatform {
    deployments: Arc<Mutex<HashSet<String>>>,
    services: Arc<Mutex<HashSet<String>>>,
}

impl LocalPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Platform for LocalPlatform {
    async fn create_deployment(
        &self,
        uuid: Uuid,
        name: &str,
        _containers: &[Container],
    ) -> Result<(), PlatformError> {
        debug!(%uuid, name, "LocalPlatform: create_deployment");
        self.deployments.lock().await.insert(name.to_string());
        Ok(())
    }

    async fn create_published_service(
        &self,
        uuid: Uuid,
        name: &str,
        service_type: PublishedServiceType,
        _port: u16,
    ) -> Result<String, PlatformError> {
        debug!(%uuid, name, "LocalPlatform: create_published_service");
        self.services.lock().await.insert(format!("{name}-service"));
        Ok(match service_type {
            PublishedServiceType::ClusterIp => format!("10.42.0.{}", (uuid.as_u128() % 250) as u8 + 1),
            PublishedServiceType::LoadBalancer => format!("203.0.113.{}", (uuid.as_u128() % 250) as u8 + 1),
        })
    }

    async fn delete_deployment(&self, uuid: Uuid, name: &str) -> Result<(), PlatformError> {
        debug!(%uuid, name, "LocalPlatform: delete_deployment");
        self.deployments.lock().await.remove(name);
        Ok(())
    }

    async fn delete_published_service(&self, uuid: Uuid, name: &str) -> Result<(), PlatformError> {
        debug!(%uuid, name, "LocalPlatform: delete_published_service");
        self.services.lock().await.remove(&format!("{name}-service"));
        Ok(())
    }
}

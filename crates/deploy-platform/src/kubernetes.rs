use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deploy_domain::{Container, PublishedServiceType};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PlatformError;
use crate::platform::Platform;

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const POLL_DEADLINE: Duration = Duration::from_secs(300);

/// Platform adapter backed by a Kubernetes cluster.
///
/// Every call loads a fresh client from the user's kubeconfig — there is no
/// cached, shared client. That mirrors the credentials contract in §4.4:
/// a hard error on this load fails the whole operation.
#[derive(Debug, Default, Clone)]
pub struct KubernetesPlatform;

impl KubernetesPlatform {
    pub fn new() -> Self {
        Self
    }

    async fn client(&self) -> Result<Client, PlatformError> {
        Client::try_default().await.map_err(|e| PlatformError::Credentials(e.to_string()))
    }

    fn labels(uuid: Uuid, name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("app".to_string(), name.to_string()), ("uuid".to_string(), uuid.to_string())])
    }
}

fn container_spec(containers: &[Container]) -> Vec<k8s_openapi::api::core::v1::Container> {
    containers
        .iter()
        .map(|c| k8s_openapi::api::core::v1::Container {
            name: c.name.clone(),
            image: Some(c.image_ref()),
            ports: Some(
                c.ports
                    .iter()
                    .map(|p| ContainerPort {
                        name: Some(p.name.clone()),
                        protocol: Some("TCP".to_string()),
                        container_port: p.port as i32,
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        })
        .collect()
}

#[async_trait]
impl Platform for KubernetesPlatform {
    async fn create_deployment(
        &self,
        uuid: Uuid,
        name: &str,
        containers: &[Container],
    ) -> Result<(), PlatformError> {
        let client = self.client().await?;
        let api: Api<Deployment> = Api::default_namespaced(client);
        let labels = Self::labels(uuid, name);

        let deployment = Deployment {
            metadata: ObjectMeta { name: Some(name.to_string()), labels: Some(labels.clone()), ..Default::default() },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector { match_labels: Some(labels.clone()), ..Default::default() },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta { labels: Some(labels), ..Default::default() }),
                    spec: Some(PodSpec { containers: container_spec(containers), ..Default::default() }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        match api.create(&PostParams::default(), &deployment).await {
            Ok(_) => {}
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(name, "deployment already exists, treating create as idempotent");
            }
            Err(e) => return Err(PlatformError::CreateFailed(e.to_string())),
        }

        let deadline = Instant::now() + POLL_DEADLINE;
        loop {
            let current = api.get(name).await.map_err(|e| PlatformError::CreateFailed(e.to_string()))?;
            let status = current.status.unwrap_or_default();
            let desired = current.spec.and_then(|s| s.replicas).unwrap_or(1);
            let available = status.available_replicas.unwrap_or(0);
            let ready = status
                .conditions
                .unwrap_or_default()
                .iter()
                .any(|c| c.type_ == "Available" && c.status == "True");

            if available >= desired && ready {
                info!(name, available, desired, "deployment ready");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(PlatformError::ReadinessTimeout(POLL_DEADLINE));
            }

            debug!(name, available, desired, ready, "deployment not yet ready, waiting");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn create_published_service(
        &self,
        uuid: Uuid,
        name: &str,
        service_type: PublishedServiceType,
        port: u16,
    ) -> Result<String, PlatformError> {
        let client = self.client().await?;
        let api: Api<Service> = Api::default_namespaced(client);
        let service_name = format!("{name}-service");
        let labels = Self::labels(uuid, name);

        let spec_type = match service_type {
            PublishedServiceType::ClusterIp => "ClusterIP",
            PublishedServiceType::LoadBalancer => "LoadBalancer",
        };

        let service = Service {
            metadata: ObjectMeta { name: Some(service_name.clone()), ..Default::default() },
            spec: Some(ServiceSpec {
                selector: Some(labels),
                type_: Some(spec_type.to_string()),
                ports: Some(vec![ServicePort {
                    port: port as i32,
                    target_port: Some(k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(port as i32)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        match api.create(&PostParams::default(), &service).await {
            Ok(_) => {}
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(service = %service_name, "published service already exists, treating create as idempotent");
            }
            Err(e) => return Err(PlatformError::CreateFailed(e.to_string())),
        }

        let deadline = Instant::now() + POLL_DEADLINE;
        loop {
            let current =
                api.get(&service_name).await.map_err(|e| PlatformError::CreateFailed(e.to_string()))?;
            let status = current.status.unwrap_or_default();
            let spec = current.spec.unwrap_or_default();

            let address = match service_type {
                PublishedServiceType::ClusterIp => spec.cluster_ip.filter(|ip| !ip.is_empty()),
                PublishedServiceType::LoadBalancer => status
                    .load_balancer
                    .and_then(|lb| lb.ingress)
                    .and_then(|ingress| ingress.into_iter().next())
                    .and_then(|ing| ing.ip.or(ing.hostname)),
            };

            if let Some(address) = address {
                info!(service = %service_name, address, "published service has address");
                return Ok(address);
            }

            if Instant::now() >= deadline {
                return Err(PlatformError::ReadinessTimeout(POLL_DEADLINE));
            }

            debug!(service = %service_name, "published service has no address yet, waiting");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete_deployment(&self, _uuid: Uuid, name: &str) -> Result<(), PlatformError> {
        let client = self.client().await?;
        let api: Api<Deployment> = Api::default_namespaced(client);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(PlatformError::DeleteFailed(e.to_string())),
        }
    }

    async fn delete_published_service(&self, _uuid: Uuid, name: &str) -> Result<(), PlatformError> {
        let client = self.client().await?;
        let api: Api<Service> = Api::default_namespaced(client);
        let service_name = format!("{name}-service");
        match api.delete(&service_name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(PlatformError::DeleteFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_domain::Port;

    #[test]
    fn labels_include_app_and_uuid() {
        let uuid = Uuid::new_v4();
        let labels = KubernetesPlatform::labels(uuid, "web");
        assert_eq!(labels.get("app"), Some(&"web".to_string()));
        assert_eq!(labels.get("uuid"), Some(&uuid.to_string()));
    }

    #[test]
    fn container_spec_maps_image_ref_and_ports() {
        let containers = vec![Container {
            name: "c".into(),
            image: "nginx".into(),
            image_tag: "1.25".into(),
            ports: vec![Port { name: "http".into(), port: 80 }],
        }];
        let spec = container_spec(&containers);
        assert_eq!(spec[0].image.as_deref(), Some("nginx:1.25"));
        let port = &spec[0].ports.as_ref().unwrap()[0];
        assert_eq!(port.container_port, 80);
        assert_eq!(port.name.as_deref(), Some("http"));
        assert_eq!(port.protocol.as_deref(), Some("TCP"));
    }

    // Exercising create/poll/delete against a live apiserver requires a real or
    // kind-provisioned cluster reachable via KUBECONFIG — out of scope here.
    // The local fake in `local.rs` covers the Platform contract end to end.
}

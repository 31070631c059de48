use std::sync::Arc;

use deploy_domain::{decode_snapshot, encode_snapshot, DurableRecord, ProvisionState, Request};
use deploy_platform::Platform;
use deploy_queue::Queue;
use deploy_store::StateStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::WorkerError;

/// Runs the consume loop: one delivery at a time, acknowledged after the
/// handler returns regardless of outcome.
pub async fn run(
    store: Arc<dyn StateStore>,
    queue: Arc<dyn Queue>,
    platform: Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    loop {
        let delivery = queue.next_delivery().await?;

        if let Err(e) = handle_delivery(&delivery.body, &store, &queue, &platform).await {
            warn!(error = %e, "delivery handling failed");
        }

        if let Err(e) = delivery.ack().await {
            warn!(error = %e, "failed to ack delivery");
        }
    }
}

async fn handle_delivery(
    body: &[u8],
    store: &Arc<dyn StateStore>,
    queue: &Arc<dyn Queue>,
    platform: &Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    let encoded = std::str::from_utf8(body)?;
    let request = decode_snapshot(encoded)?;

    match request.state() {
        Some(ProvisionState::Pending) => {
            create_deployment(request, store, queue, platform).await
        }
        Some(ProvisionState::CreatedDeployment) => {
            create_published_service(request, store, queue, platform).await
        }
        Some(ProvisionState::CreatedPublishedService) => mark_terminal(request, store, ProvisionState::Success).await,
        Some(ProvisionState::Deleting) => delete_deployment(request, store, queue, platform).await,
        Some(ProvisionState::DeletedDeployment) => delete_published_service(request, store, queue, platform).await,
        Some(ProvisionState::DeletedPublishedService) => mark_terminal(request, store, ProvisionState::Deleted).await,
        other => {
            info!(?other, "unrecognized or terminal state, dropping without action");
            Ok(())
        }
    }
}

fn request_identity(request: &Request) -> Result<(Uuid, String), WorkerError> {
    let uuid = request.uuid().ok_or(WorkerError::MissingField("metadata.uuid"))?;
    let name = request
        .spec
        .as_ref()
        .map(|s| s.name.clone())
        .filter(|n| !n.is_empty())
        .ok_or(WorkerError::MissingField("spec.name"))?;
    Ok((uuid, name))
}

async fn persist(store: &Arc<dyn StateStore>, request: &Request) -> Result<(), WorkerError> {
    let record = DurableRecord::from_request(request)
        .map_err(|_| WorkerError::MissingField("spec"))?;
    store.update(&record).await?;
    Ok(())
}

async fn republish(queue: &Arc<dyn Queue>, request: &Request) -> Result<(), WorkerError> {
    let encoded = encode_snapshot(request).map_err(|_| WorkerError::MissingField("request"))?;
    queue.push(encoded.into_bytes()).await?;
    Ok(())
}

/// Records the failure in `status.message`, moves the record to `FAILED`, and
/// does not re-enqueue. Store failures while recording the failure are
/// themselves propagated — the worker loop logs and moves on regardless.
async fn fail(store: &Arc<dyn StateStore>, mut request: Request, message: String) -> Result<(), WorkerError> {
    request.status = Some(deploy_domain::ProvisionStatus::failed(message));
    persist(store, &request).await
}

async fn mark_terminal(
    mut request: Request,
    store: &Arc<dyn StateStore>,
    state: ProvisionState,
) -> Result<(), WorkerError> {
    request.set_state(state);
    persist(store, &request).await
}

async fn create_deployment(
    mut request: Request,
    store: &Arc<dyn StateStore>,
    queue: &Arc<dyn Queue>,
    platform: &Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    let (uuid, name) = match request_identity(&request) {
        Ok(v) => v,
        Err(_) => return fail(store, request, "request is missing uuid or spec.name".into()).await,
    };
    let containers = request.spec.as_ref().map(|s| s.containers.clone()).unwrap_or_default();

    request.set_state(ProvisionState::CreatingDeployment);
    persist(store, &request).await?;

    match platform.create_deployment(uuid, &name, &containers).await {
        Ok(()) => {
            request.set_state(ProvisionState::CreatedDeployment);
            persist(store, &request).await?;
            republish(queue, &request).await
        }
        Err(e) => fail(store, request, e.to_string()).await,
    }
}

async fn create_published_service(
    mut request: Request,
    store: &Arc<dyn StateStore>,
    queue: &Arc<dyn Queue>,
    platform: &Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    let (uuid, name) = match request_identity(&request) {
        Ok(v) => v,
        Err(_) => return fail(store, request, "request is missing uuid or spec.name".into()).await,
    };
    let Some(spec) = request.spec.clone() else {
        return fail(store, request, "spec.publishedServiceType is missing".into()).await;
    };
    let Some(service_type) = spec.published_service_type else {
        return fail(store, request, "spec.publishedServiceType is missing".into()).await;
    };
    let port = spec.expose.unwrap_or(0);

    request.set_state(ProvisionState::CreatingPublishedService);
    persist(store, &request).await?;

    match platform.create_published_service(uuid, &name, service_type, port).await {
        Ok(external_ip) => {
            request.set_state(ProvisionState::CreatedPublishedService);
            if let Some(status) = request.status.as_mut() {
                status.external_ip = external_ip;
            }
            persist(store, &request).await?;
            republish(queue, &request).await
        }
        Err(e) => fail(store, request, e.to_string()).await,
    }
}

async fn delete_deployment(
    mut request: Request,
    store: &Arc<dyn StateStore>,
    queue: &Arc<dyn Queue>,
    platform: &Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    let (uuid, name) = match request_identity(&request) {
        Ok(v) => v,
        Err(_) => return fail(store, request, "request is missing uuid or spec.name".into()).await,
    };

    request.set_state(ProvisionState::DeletingDeployment);
    persist(store, &request).await?;

    match platform.delete_deployment(uuid, &name).await {
        Ok(()) => {
            request.set_state(ProvisionState::DeletedDeployment);
            persist(store, &request).await?;
            republish(queue, &request).await
        }
        Err(e) => fail(store, request, e.to_string()).await,
    }
}

async fn delete_published_service(
    mut request: Request,
    store: &Arc<dyn StateStore>,
    queue: &Arc<dyn Queue>,
    platform: &Arc<dyn Platform>,
) -> Result<(), WorkerError> {
    let (uuid, name) = match request_identity(&request) {
        Ok(v) => v,
        Err(_) => return fail(store, request, "request is missing uuid or spec.name".into()).await,
    };

    request.set_state(ProvisionState::DeletingPublishedService);
    persist(store, &request).await?;

    match platform.delete_published_service(uuid, &name).await {
        Ok(()) => {
            request.set_state(ProvisionState::DeletedPublishedService);
            persist(store, &request).await?;
            republish(queue, &request).await
        }
        Err(e) => fail(store, request, e.to_string()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_domain::{Container, ProvisionMetadata, ProvisionSpec, ProvisionStatus, PublishedServiceType};
    use deploy_platform::LocalPlatform;
    use deploy_queue::InMemoryQueue;
    use deploy_store::InMemoryStore;

    fn base_request(uuid: Uuid, state: ProvisionState) -> Request {
        Request {
            metadata: Some(ProvisionMetadata { uuid: Some(uuid) }),
            spec: Some(ProvisionSpec {
                name: "web".into(),
                r#type: "svc".into(),
                containers: vec![Container {
                    name: "c".into(),
                    image: "nginx".into(),
                    image_tag: "1.25".into(),
                    ports: vec![],
                }],
                published_service_type: Some(PublishedServiceType::ClusterIp),
                expose: Some(80),
            }),
            status: Some(ProvisionStatus { state: Some(state), message: String::new(), external_ip: String::new() }),
        }
    }

    async fn seed(store: &Arc<dyn StateStore>, request: &Request) {
        let record = DurableRecord::from_request(request).unwrap();
        store.insert(&record).await.unwrap();
    }

    #[tokio::test]
    async fn pending_advances_to_created_deployment_and_republishes() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InMemoryQueue::new());
        let platform: Arc<dyn Platform> = Arc::new(LocalPlatform::new());

        let uuid = Uuid::new_v4();
        let request = base_request(uuid, ProvisionState::Pending);
        seed(&store, &request).await;

        let body = encode_snapshot(&request).unwrap().into_bytes();
        handle_delivery(&body, &store, &queue, &platform).await.unwrap();

        let stored = store.get(uuid).await.unwrap();
        assert_eq!(stored.state, ProvisionState::CreatedDeployment);

        let next = queue.next_delivery().await.unwrap();
        let next_request = decode_snapshot(std::str::from_utf8(&next.body).unwrap()).unwrap();
        assert_eq!(next_request.state(), Some(ProvisionState::CreatedDeployment));
    }

    #[tokio::test]
    async fn created_published_service_marks_success_without_republish() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InMemoryQueue::new());
        let platform: Arc<dyn Platform> = Arc::new(LocalPlatform::new());

        let uuid = Uuid::new_v4();
        let request = base_request(uuid, ProvisionState::CreatedPublishedService);
        seed(&store, &request).await;

        let body = encode_snapshot(&request).unwrap().into_bytes();
        handle_delivery(&body, &store, &queue, &platform).await.unwrap();

        let stored = store.get(uuid).await.unwrap();
        assert_eq!(stored.state, ProvisionState::Success);
    }

    #[tokio::test]
    async fn missing_spec_name_fails_without_panic() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InMemoryQueue::new());
        let platform: Arc<dyn Platform> = Arc::new(LocalPlatform::new());

        let uuid = Uuid::new_v4();
        let mut request = base_request(uuid, ProvisionState::Pending);
        request.spec.as_mut().unwrap().name = String::new();
        seed(&store, &request).await;

        let body = encode_snapshot(&request).unwrap().into_bytes();
        handle_delivery(&body, &store, &queue, &platform).await.unwrap();

        let stored = store.get(uuid).await.unwrap();
        assert_eq!(stored.state, ProvisionState::Failed);
    }

    #[tokio::test]
    async fn unrecognized_state_is_dropped_without_store_access() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InMemoryQueue::new());
        let platform: Arc<dyn Platform> = Arc::new(LocalPlatform::new());

        let uuid = Uuid::new_v4();
        let request = base_request(uuid, ProvisionState::Success);
        // deliberately not seeded in the store

        let body = encode_snapshot(&request).unwrap().into_bytes();
        handle_delivery(&body, &store, &queue, &platform).await.unwrap();

        assert!(store.get(uuid).await.is_err());
    }
}

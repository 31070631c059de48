use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use deploy_domain::{decode_snapshot, parse_uuid, DurableRecord, ProvisionState, ProvisionStatus, Request};
use serde_json::json;
use tracing::warn;

use crate::state::AppState;

/// Fails the request in place and returns it with the given status.
fn fail(mut request: Request, status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Request>) {
    request.status = Some(ProvisionStatus::failed(message));
    (status, Json(request))
}

pub async fn create_provision(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let mut request: Request = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => return fail(Request::default(), StatusCode::BAD_REQUEST, "Invalid json data provided"),
    };

    if request.spec.is_none() {
        return fail(request, StatusCode::BAD_REQUEST, "Invalid json data provided");
    }

    if let Err(e) = request.validate_spec() {
        let message = match e {
            deploy_domain::DomainError::EmptyContainers => "Please add atleast one container for provision",
            _ => "Both Spec.Name and Spec.Type are required.",
        };
        return fail(request, StatusCode::BAD_REQUEST, message);
    }

    if request.ensure_uuid().is_err() {
        return fail(request, StatusCode::BAD_REQUEST, "Invalid json data provided");
    }

    request.set_state(ProvisionState::Pending);

    let record = match DurableRecord::from_request(&request) {
        Ok(r) => r,
        Err(e) => return fail(request, StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Err(e) = state.store.insert(&record).await {
        return fail(request, StatusCode::BAD_REQUEST, e.to_string());
    }

    if let Err(e) = state.queue.push(record.encoded_snapshot.into_bytes()).await {
        warn!(error = %e, uuid = %record.uuid, "failed to enqueue provision request");
        return fail(request, StatusCode::BAD_REQUEST, e.to_string());
    }

    (StatusCode::CREATED, Json(request))
}

pub async fn get_provision(State(state): State<AppState>, Path(uuid_str): Path<String>) -> impl IntoResponse {
    let uuid = match parse_uuid(&uuid_str) {
        Ok(u) => u,
        Err(_) => return fail(Request::default(), StatusCode::BAD_REQUEST, format!("Invalid uuid {uuid_str}")),
    };

    let record = match state.store.get(uuid).await {
        Ok(r) => r,
        Err(_) => {
            return fail(
                Request::default(),
                StatusCode::NOT_FOUND,
                format!("Provision request with {uuid_str} does not exist"),
            )
        }
    };

    match decode_snapshot(&record.encoded_snapshot) {
        Ok(request) => (StatusCode::OK, Json(request)),
        Err(e) => fail(Request::default(), StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn delete_provision(State(state): State<AppState>, Path(uuid_str): Path<String>) -> impl IntoResponse {
    let uuid = match parse_uuid(&uuid_str) {
        Ok(u) => u,
        Err(_) => return fail(Request::default(), StatusCode::BAD_REQUEST, format!("Invalid uuid {uuid_str}")),
    };

    let record = match state.store.get(uuid).await {
        Ok(r) => r,
        Err(_) => {
            return fail(
                Request::default(),
                StatusCode::BAD_REQUEST,
                format!("Provision request with {uuid_str} does not exist"),
            )
        }
    };

    let mut request = match decode_snapshot(&record.encoded_snapshot) {
        Ok(r) => r,
        Err(e) => return fail(Request::default(), StatusCode::BAD_REQUEST, e.to_string()),
    };

    request.set_state(ProvisionState::Deleting);

    let updated = match DurableRecord::from_request(&request) {
        Ok(r) => r,
        Err(e) => return fail(request, StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Err(e) = state.store.update(&updated).await {
        return fail(request, StatusCode::BAD_REQUEST, e.to_string());
    }

    if let Err(e) = state.queue.push(updated.encoded_snapshot.into_bytes()).await {
        warn!(error = %e, uuid = %updated.uuid, "failed to enqueue deletion request");
        return fail(request, StatusCode::BAD_REQUEST, e.to_string());
    }

    (StatusCode::CREATED, Json(request))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "OK" }))),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "Database unaccessible" }))),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 - Not Found!")
}

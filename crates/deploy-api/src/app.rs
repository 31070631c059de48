use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use deploy_queue::Queue;
use deploy_store::StateStore;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_app(store: Arc<dyn StateStore>, queue: Arc<dyn Queue>) -> Router {
    let state = AppState { store, queue };

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/provision",
            axum::routing::post(handlers::create_provision),
        )
        .route(
            "/api/v1/provision/:uuid",
            get(handlers::get_provision).delete(handlers::delete_provision),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request as HttpRequest, StatusCode};
    use deploy_queue::InMemoryQueue;
    use deploy_store::InMemoryStore;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        build_app(store, queue)
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = test_app();
        let resp = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_404_text() {
        let app = test_app();
        let resp = app
            .oneshot(HttpRequest::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"404 - Not Found!");
    }

    #[tokio::test]
    async fn create_with_missing_spec_returns_400() {
        let app = test_app();
        let body = json!({});
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/api/v1/provision")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["status"]["message"], "Invalid json data provided");
    }

    #[tokio::test]
    async fn create_with_no_containers_returns_400() {
        let app = test_app();
        let body = json!({
            "spec": { "name": "web", "type": "service", "containers": [] }
        });
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/api/v1/provision")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["status"]["message"], "Please add atleast one container for provision");
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let app = test_app();
        let body = json!({
            "spec": {
                "name": "web",
                "type": "service",
                "containers": [{ "name": "c", "image": "nginx", "image_tag": "1.25" }]
            }
        });
        let resp = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/api/v1/provision")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let uuid = created["metadata"]["uuid"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/api/v1/provision/{uuid}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched = body_json(resp).await;
        assert_eq!(fetched["metadata"]["uuid"], uuid);
    }

    #[tokio::test]
    async fn get_missing_uuid_returns_404() {
        let app = test_app();
        let uuid = uuid::Uuid::new_v4();
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/api/v1/provision/{uuid}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_malformed_uuid_returns_400() {
        let app = test_app();
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/v1/provision/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use gigmarket::marketplace::{
    marketplace_router, BlobStore, MarketplaceRepository, MarketplaceState,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_marketplace_routes<R, B>(state: Arc<MarketplaceState<R, B>>) -> axum::Router
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    marketplace_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use gigmarket::marketplace::{InMemoryBlobStore, InMemoryMarketplace, TokenRegistry};
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let repository = Arc::new(InMemoryMarketplace::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let tokens = Arc::new(TokenRegistry::new());
        let state = Arc::new(MarketplaceState::new(repository, blobs, tokens));
        let router = with_marketplace_routes(state);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload, json!({ "status": "ok" }));
    }
}

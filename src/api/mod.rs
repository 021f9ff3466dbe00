// src/api/mod.rs — HTTP server hosting the provider webhook

pub mod handlers;
pub mod types;
pub mod webhooks;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::evaluator::ScoringEngine;
use crate::infra::config::ServerConfig;
use crate::store::StoreHandle;

pub const WEBHOOK_PATH: &str = "/api/v1/webhooks/conversation";

/// Shared state for API handlers. Nothing here is mutated per request.
#[derive(Clone)]
pub struct ApiState {
    pub store: StoreHandle,
    /// None when scoring is disabled or has no credentials.
    pub scoring: Option<Arc<ScoringEngine>>,
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(webhooks::receive_conversation_event))
        .route("/api/v1/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server (runs until the process is stopped).
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);

    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Webhook server listening on http://{addr}{WEBHOOK_PATH}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down webhook server");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state() -> ApiState {
        let store = crate::store::open_in_memory().unwrap();
        let (handle, _) = crate::store::spawn_store_server(store);
        ApiState {
            store: handle,
            scoring: None,
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_rejects_get() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("GET")
            .uri(WEBHOOK_PATH)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

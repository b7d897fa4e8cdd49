/**
 * HTTP SURFACE - Prometheus scrape endpoint and probes
 *
 * ROLE: serve the cached snapshots to Prometheus and tell orchestrators
 * whether the exporter is alive and has data.
 *
 * ROUTES:
 * - GET /metrics         text exposition of every registered collector
 * - GET /healthz         liveness, always 200
 * - GET /readyz          200 once every source has published, else 503
 * - GET /health/sources  per-source refresh report (JSON)
 *
 * Scrapes never touch upstream APIs: collectors read the snapshot caches.
 */

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::Registry;
use std::sync::Arc;
use tracing::error;

use crate::health::HealthTracker;
use crate::metrics::render;

pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub health: HealthTracker,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/health/sources", get(sources))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> Response {
    match render(&state.registry) {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.health.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "waiting for first snapshot")
    }
}

async fn sources(State(state): State<AppState>) -> Json<Vec<crate::health::SourceReport>> {
    Json(state.health.reports())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state() -> AppState {
        AppState { registry: Arc::new(Registry::new()), health: HealthTracker::new() }
    }

    #[tokio::test]
    async fn readiness_follows_first_publish() {
        let state = state();
        let thermal = state.health.register("thermal");
        assert_eq!(readyz(State(state.clone())).await.0, StatusCode::SERVICE_UNAVAILABLE);

        thermal.record_success(Duration::from_millis(5));
        assert_eq!(readyz(State(state)).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_carry_text_content_type() {
        let resp = metrics(State(state())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], TEXT_FORMAT);
    }

    #[tokio::test]
    async fn liveness_is_unconditional() {
        assert_eq!(healthz().await, "ok");
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Root endpoint - basic status
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.config.site_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[derive(Serialize)]
struct CacheStats {
    info: usize,
    streaming: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime: u64,
    sessions: usize,
    cache: CacheStats,
    default_provider: String,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime: state.start_time.elapsed().as_secs(),
        sessions: state.sessions.len().await,
        cache: CacheStats {
            info: state.info_cache.len(),
            streaming: state.streaming_cache.len(),
        },
        default_provider: state.config.default_provider.clone(),
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Readiness probe
/// The anime API is remote and failures are reported per request, so
/// readiness only requires a usable configuration.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.config.consumet_api_url.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready - CONSUMET_API_URL not set")
    } else {
        (StatusCode::OK, "ready")
    }
}

/// Liveness probe
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, state_with, FakeApi};
    use crate::services::watch::tests::anime;
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_counts_cache_entries() {
        let api = Arc::new(FakeApi::default().with_anime("gogoanime", anime("naruto", 0)));
        let state = state_with(api);
        get(state.clone(), "/api/anime/naruto").await;

        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache"]["info"], 1);
        assert_eq!(json["cache"]["streaming"], 0);
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_probes() {
        let state = state_with(Arc::new(FakeApi::default()));
        assert_eq!(get(state.clone(), "/live").await.0, StatusCode::OK);
        assert_eq!(get(state.clone(), "/ready").await.0, StatusCode::OK);

        let (status, body) = get(state, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty() || body.contains("# TYPE") || body.contains("# HELP"));
    }
}

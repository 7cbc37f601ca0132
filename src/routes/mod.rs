pub mod anime;
pub mod health;
pub mod proxy;
pub mod sessions;
pub mod subtitles;
pub mod watch;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use url::{Host, Url};

use crate::services::consumet::ApiError;
use crate::AppState;

/// Error shape shared by all JSON endpoints
pub type JsonError = (StatusCode, Json<serde_json::Value>);

pub fn json_error(status: StatusCode, message: impl Into<String>) -> JsonError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Map an upstream failure to the status reported to our clients
pub fn upstream_error(err: &ApiError) -> JsonError {
    let status = match err {
        ApiError::NotFound => StatusCode::NOT_FOUND,
        ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    json_error(status, err.to_string())
}

/// Accept only absolute http(s) URLs on public hosts
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return None;
            }
        }
        Host::Ipv4(ip) => {
            if !is_public_ipv4(ip) {
                return None;
            }
        }
        Host::Ipv6(ip) => {
            if !is_public_ipv6(ip) {
                return None;
            }
        }
    }
    Some(url)
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64))
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_ipv4(v4);
    }
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        // Watch page
        .route("/watch", get(watch::watch_missing_id))
        .route("/watch/", get(watch::watch_missing_id))
        .route("/watch/:id", get(watch::watch_page))
        // Anime API passthrough (cached)
        .route("/api/anime/:id", get(anime::get_anime_info))
        .route(
            "/api/episodes/:episode_id/streaming",
            get(anime::get_episode_streaming),
        )
        // Interactive watch sessions
        .route("/api/watch/:id/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:session_id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route(
            "/api/sessions/:session_id/episode",
            post(sessions::select_episode),
        )
        .route("/api/sessions/:session_id/next", post(sessions::next_episode))
        .route("/api/sessions/:session_id/mode", post(sessions::set_mode))
        .route(
            "/api/sessions/:session_id/provider",
            post(sessions::change_provider),
        )
        .route("/api/sessions/:session_id/player", get(sessions::get_player))
        // Proxies
        .route("/api/subtitles", get(subtitles::subtitle_proxy))
        .route("/api/proxy/stream", get(proxy::stream_proxy))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://subs.test/en.vtt").is_some());
        assert!(parse_http_url(" http://cdn.test/a.m3u8 ").is_some());
        assert!(parse_http_url("file:///etc/passwd").is_none());
        assert!(parse_http_url("/relative.vtt").is_none());
        assert!(parse_http_url("").is_none());
    }

    #[test]
    fn test_parse_http_url_rejects_internal_hosts() {
        for raw in [
            "http://127.0.0.1/a.vtt",
            "http://localhost:8080/a.vtt",
            "http://api.localhost/a.vtt",
            "http://169.254.169.254/latest/meta-data/",
            "http://10.0.0.5/seg.ts",
            "http://192.168.1.1/seg.ts",
            "http://172.16.0.1/seg.ts",
            "http://100.64.0.1/seg.ts",
            "http://0.0.0.0/seg.ts",
            "http://[::1]/seg.ts",
            "http://[fe80::1]/seg.ts",
            "http://[fd00::1]/seg.ts",
            "http://[::ffff:127.0.0.1]/seg.ts",
        ] {
            assert!(parse_http_url(raw).is_none(), "{} should be rejected", raw);
        }

        assert!(parse_http_url("http://8.8.8.8/a.m3u8").is_some());
        assert!(parse_http_url("https://[2606:4700::1111]/a.m3u8").is_some());
    }

    #[test]
    fn test_upstream_error_status() {
        assert_eq!(upstream_error(&ApiError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(upstream_error(&ApiError::Timeout).0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(upstream_error(&ApiError::Http(500)).0, StatusCode::BAD_GATEWAY);
    }
}

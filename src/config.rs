use std::env;
use std::str::FromStr;

/// Providers offered by the source selector on the watch page
pub const KNOWN_PROVIDERS: &[&str] = &["gogoanime", "zoro", "animepahe", "9anime"];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub app_env: String,
    pub base_url: String,
    pub site_name: String,

    // Upstream anime API
    pub consumet_api_url: String,
    pub consumet_meta: String,
    pub default_provider: String,
    pub fetch_timeout_ms: u64,

    // Proxies
    pub proxy_timeout_ms: u64,
    pub stream_proxy_url: String,
    pub max_subtitle_bytes: usize,

    // Cache
    pub info_cache_ttl_ms: u64,
    pub streaming_cache_ttl_ms: u64,
    pub cache_max_entries: usize,

    // Sessions
    pub session_ttl_seconds: u64,
    pub cleanup_interval_secs: u64,

    // Misc
    pub user_agent: String,
}

/// Read an env var and parse it, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env::var(key).ok().as_deref(), default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env_or("PORT", 3000),
            app_env: env_string("APP_ENV", "development"),
            base_url: env_string("BASE_URL", "http://localhost:3000"),
            site_name: env_string("SITE_NAME", "Next Anime"),

            // Upstream anime API
            consumet_api_url: env_string("CONSUMET_API_URL", "https://api.consumet.org"),
            consumet_meta: env_string("CONSUMET_META", "anilist"),
            default_provider: env_string("DEFAULT_PROVIDER", "gogoanime"),
            fetch_timeout_ms: env_or("FETCH_TIMEOUT_MS", 15_000), // 15 seconds

            // Proxies
            proxy_timeout_ms: env_or("PROXY_TIMEOUT_MS", 15_000),
            stream_proxy_url: env_string("STREAM_PROXY_URL", "/api/proxy/stream"),
            max_subtitle_bytes: env_or("MAX_SUBTITLE_BYTES", 5 * 1024 * 1024),

            // Cache
            info_cache_ttl_ms: env_or("INFO_CACHE_TTL_MS", 300_000), // 5 minutes
            streaming_cache_ttl_ms: env_or("STREAMING_CACHE_TTL_MS", 300_000),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", 1000),

            // Sessions
            session_ttl_seconds: env_or("SESSION_TTL_SECONDS", 3600), // 1 hour
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", 300),

            user_agent: env_string(
                "USER_AGENT",
                "Mozilla/5.0 (compatible; anime-watch-server)",
            ),
        }
    }

    /// Provider from a query string value, or the configured default
    pub fn resolve_provider(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.to_lowercase())
            .unwrap_or_else(|| self.default_provider.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for tests, independent of the process environment
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            app_env: "test".to_string(),
            base_url: "http://localhost:3000".to_string(),
            site_name: "Next Anime".to_string(),
            consumet_api_url: "http://consumet.test".to_string(),
            consumet_meta: "anilist".to_string(),
            default_provider: "gogoanime".to_string(),
            fetch_timeout_ms: 1_000,
            proxy_timeout_ms: 1_000,
            stream_proxy_url: "/api/proxy/stream".to_string(),
            max_subtitle_bytes: 1024 * 1024,
            info_cache_ttl_ms: 60_000,
            streaming_cache_ttl_ms: 60_000,
            cache_max_entries: 100,
            session_ttl_seconds: 60,
            cleanup_interval_secs: 60,
            user_agent: "test-agent".to_string(),
        }
    }
}

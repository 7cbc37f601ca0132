use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Upstream API calls by endpoint ("info", "watch") and outcome
    pub static ref UPSTREAM_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "anime_upstream_requests_total",
        "Requests sent to the anime API",
        &["endpoint", "outcome"]
    )
    .expect("metric can be registered");

    /// Cache lookups by cache name and result ("hit", "miss", "shared")
    pub static ref CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "anime_cache_lookups_total",
        "Request cache lookups",
        &["cache", "result"]
    )
    .expect("metric can be registered");

    /// Streaming responses dropped because the selection moved on
    pub static ref STALE_RESPONSES: IntCounter = register_int_counter!(
        "anime_stale_streaming_responses_total",
        "Streaming responses discarded for a previously selected episode"
    )
    .expect("metric can be registered");
}

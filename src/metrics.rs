// Prometheus metrics definitions for the quiz battle backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Battles currently in play.
    pub static ref ACTIVE_BATTLES: IntGauge =
        IntGauge::new("quiz_active_battles", "Battles currently in play").unwrap();

    /// Live WebSocket connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("quiz_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    pub static ref BATTLES_STARTED_TOTAL: IntCounter =
        IntCounter::new("quiz_battles_started_total", "Total battles started").unwrap();

    pub static ref BATTLES_COMPLETED_TOTAL: IntCounter =
        IntCounter::new("quiz_battles_completed_total", "Total battles played to the end").unwrap();

    /// Battles discarded before their last question.
    pub static ref BATTLES_CANCELLED_TOTAL: IntCounter = IntCounter::new(
        "quiz_battles_cancelled_total",
        "Battles torn down before completion",
    )
    .unwrap();

    /// Battles whose task panicked.
    pub static ref BATTLES_ERRORED_TOTAL: IntCounter =
        IntCounter::new("quiz_battles_errored_total", "Battles aborted by a panic").unwrap();

    /// Scored answers, by participant kind (human, bot) and outcome (correct, incorrect).
    pub static ref ANSWERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("quiz_answers_total", "Total scored answers"),
        &["participant", "outcome"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("quiz_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    pub static ref WEBSOCKET_MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "quiz_websocket_messages_sent_total",
        "Total WebSocket messages sent",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Wall-clock battle duration in seconds.
    pub static ref BATTLE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("quiz_battle_duration_seconds", "Battle duration in seconds")
            .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
    )
    .unwrap();

    /// Per-tick processing time in milliseconds.
    pub static ref BATTLE_TICK_DURATION_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("quiz_battle_tick_duration_ms", "Per-tick processing time in ms")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "quiz_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIVE_BATTLES.clone()),
        Box::new(CONNECTED_WEBSOCKETS.clone()),
        Box::new(BATTLES_STARTED_TOTAL.clone()),
        Box::new(BATTLES_COMPLETED_TOTAL.clone()),
        Box::new(BATTLES_CANCELLED_TOTAL.clone()),
        Box::new(BATTLES_ERRORED_TOTAL.clone()),
        Box::new(ANSWERS_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(WEBSOCKET_MESSAGES_SENT_TOTAL.clone()),
        Box::new(BATTLE_DURATION_SECONDS.clone()),
        Box::new(BATTLE_TICK_DURATION_MS.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        // Already-registered collectors are fine (tests register more than once)
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric registration skipped: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: replace battle UUIDs and numeric
/// segments with `:id` to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() || uuid::Uuid::parse_str(segment).is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

//! Metric name and label definitions.
//!
//! Every metric the relay emits is named here so dashboards have one place to
//! look.

/// HTTP request metrics
pub mod http {
    /// Total number of HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "linebot_http_requests_total";
    /// Duration of HTTP requests in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "linebot_http_request_duration_seconds";
    /// Number of currently in-flight HTTP requests
    pub const REQUESTS_IN_FLIGHT: &str = "linebot_http_requests_in_flight";
}

/// Inbound webhook metrics
pub mod webhook {
    /// Decoded events, labelled by `event_type`
    pub const EVENTS_TOTAL: &str = "linebot_webhook_events_total";
    /// Requests refused before dispatch, labelled by `reason`
    pub const REJECTIONS_TOTAL: &str = "linebot_webhook_rejections_total";
}

/// Outbound Messaging API metrics
pub mod line_api {
    /// Calls issued, labelled by `api` and `status`
    pub const REQUESTS_TOTAL: &str = "linebot_line_api_requests_total";
    /// Call latency in seconds, labelled by `api`
    pub const DURATION_SECONDS: &str = "linebot_line_api_duration_seconds";
}

/// Event dispatch metrics
pub mod dispatch {
    /// Per-event delivery failures, labelled by `error_type`
    pub const FAILURES_TOTAL: &str = "linebot_dispatch_failures_total";
}

/// Responder metrics
pub mod responder {
    /// Replies produced, labelled by the command `rule` that fired
    pub const REPLIES_TOTAL: &str = "linebot_responder_replies_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const METHOD: &str = "method";
    pub const STATUS: &str = "status";
    pub const EVENT_TYPE: &str = "event_type";
    pub const REASON: &str = "reason";
    pub const API: &str = "api";
    pub const ERROR_TYPE: &str = "error_type";
    pub const RULE: &str = "rule";
}

/// Standard histogram buckets
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Inbound request duration buckets (in seconds), 1ms to 60s
    pub static HTTP_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Outbound API call buckets (in seconds), 10ms to the 10s client timeout
    pub static LINE_API_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0,
        ]
    });
}

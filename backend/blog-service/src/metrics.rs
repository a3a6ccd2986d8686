//! Prometheus metrics for the blog service.
//!
//! Exposes feed and cache collectors and an HTTP handler for the `/metrics`
//! endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Feed requests by view (global, group, profile, followed).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Feed requests segmented by view",
        &["view"]
    )
    .expect("failed to register feed_request_total");

    /// Home-page cache events (hit/miss/error).
    pub static ref INDEX_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "index_cache_events_total",
        "Home-page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register index_cache_events_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

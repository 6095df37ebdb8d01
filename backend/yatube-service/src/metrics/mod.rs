//! Prometheus metrics for yatube-service.
//!
//! Exposes authoring, follow-graph and listing-cache collectors and an HTTP
//! handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref POSTS_CREATED: IntCounter = register_int_counter!(
        "yatube_posts_created_total",
        "Total number of posts created"
    )
    .expect("Failed to register yatube_posts_created_total");

    pub static ref POSTS_EDITED: IntCounter = register_int_counter!(
        "yatube_posts_edited_total",
        "Total number of post edits"
    )
    .expect("Failed to register yatube_posts_edited_total");

    pub static ref COMMENTS_CREATED: IntCounter = register_int_counter!(
        "yatube_comments_created_total",
        "Total number of comments created"
    )
    .expect("Failed to register yatube_comments_created_total");

    /// Follow graph writes labeled by action (follow, unfollow) and outcome (applied, noop)
    pub static ref FOLLOW_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "yatube_follow_operations_total",
        "Follow graph operations by action and outcome",
        &["action", "outcome"]
    )
    .expect("Failed to register yatube_follow_operations_total");

    /// Listing cache lookups labeled by result (hit, miss, bypass)
    pub static ref LISTING_CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "yatube_listing_cache_lookups_total",
        "Listing cache lookups by result",
        &["result"]
    )
    .expect("Failed to register yatube_listing_cache_lookups_total");

    pub static ref LISTING_CACHE_INVALIDATIONS: IntCounter = register_int_counter!(
        "yatube_listing_cache_invalidations_total",
        "Total number of listing cache entries removed by invalidation"
    )
    .expect("Failed to register yatube_listing_cache_invalidations_total");
}

pub fn record_follow(action: &str, applied: bool) {
    let outcome = if applied { "applied" } else { "noop" };
    FOLLOW_OPERATIONS.with_label_values(&[action, outcome]).inc();
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

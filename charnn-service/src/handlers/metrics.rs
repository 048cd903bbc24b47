use std::sync::LazyLock;

use axum::{http::header, response::IntoResponse};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use utoipa::OpenApi;

use crate::error::ServiceError;

pub const METRICS_PATH: &str = "/metrics";

/// Counter metric that tracks the number of text generation requests.
///
/// # Metric Details
/// - Name: `charnn_generation_requests_total`
/// - Type: Counter
/// - Labels: `status` (`success`, `client_error` or `server_error`)
pub static GENERATION_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "charnn_generation_requests_total",
        "Total number of text generation requests",
        &["status"]
    )
    .unwrap()
});

/// Counter metric that tracks the number of characters sampled from the model.
///
/// # Metric Details
/// - Name: `charnn_generated_characters_total`
/// - Type: Counter
pub static GENERATED_CHARACTERS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "charnn_generated_characters_total",
        "Total number of characters generated"
    )
    .unwrap()
});

/// Histogram metric that tracks the latency of a complete generation, warm-up included.
///
/// # Metric Details
/// - Name: `charnn_generation_latency`
/// - Type: Histogram
/// - Unit: seconds
/// - Buckets: [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
pub static GENERATION_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "charnn_generation_latency",
        "The latency of text generation in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap()
});

#[derive(OpenApi)]
#[openapi(paths(metrics_handler))]
pub(crate) struct MetricsOpenApi;

/// Renders every registered metric in the Prometheus text exposition format.
#[utoipa::path(
    get,
    path = "",
    tag = "metrics",
    responses(
        (status = OK, description = "Prometheus metrics", body = String),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to encode metrics")
    )
)]
pub async fn metrics_handler() -> Result<impl IntoResponse, ServiceError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError {
            message: format!("Failed to encode metrics: {e}"),
            endpoint: METRICS_PATH.to_string(),
        })?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    ))
}

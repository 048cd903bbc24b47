use std::sync::Arc;

use axum::{
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use charnn_inference::TextGenerator;
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal, sync::Semaphore};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;

use crate::{
    components::openapi::openapi_routes,
    config::ServiceConfig,
    handlers::{
        generate::{generate_handler, GENERATE_PATH},
        metrics::{metrics_handler, METRICS_PATH},
    },
};

pub const HEALTH_PATH: &str = "/health";

/// Prompts are short texts, anything larger is rejected before it is parsed.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Represents the shared state of the application.
///
/// Cloned into every request; all fields are either `Copy` or reference counted.
#[derive(Clone)]
pub struct AppState {
    /// The loaded generation engine.
    pub generator: Arc<dyn TextGenerator>,

    /// Bounds the number of generations running on the blocking pool.
    pub generation_permits: Arc<Semaphore>,

    /// Length used when a request omits `generate_len`.
    pub default_generate_len: usize,

    /// Largest `generate_len` a request may ask for.
    pub max_generate_len: usize,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &ServiceConfig) -> Self {
        Self {
            generator,
            generation_permits: Arc::new(Semaphore::new(config.max_concurrent_generations)),
            default_generate_len: config.default_generate_len,
            max_generate_len: config.max_generate_len,
        }
    }
}

/// Creates and configures the main router for the application.
///
/// Mounts the generation endpoint, the health and metrics endpoints, the
/// OpenAPI documentation and a redirect from `/` to the documentation.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route(GENERATE_PATH, post(generate_handler))
        .with_state(app_state)
        .route(HEALTH_PATH, get(health))
        .route(METRICS_PATH, get(metrics_handler))
        .route("/", get(|| async { Redirect::temporary("/swagger-ui") }))
        .merge(openapi_routes())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Starts and runs the HTTP server with graceful shutdown handling.
///
/// Requests already in flight are completed once Ctrl+C is received.
///
/// # Errors
///
/// Returns an error if the server fails to serve connections.
pub async fn run_server(app_state: AppState, tcp_listener: TcpListener) -> anyhow::Result<()> {
    let app = create_router(app_state);
    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(
                target = "charnn-service",
                event = "shutdown_signal_error",
                error = %e,
                "Failed to listen for Ctrl+C signal"
            );
        }
        info!(
            target = "charnn-service",
            event = "shutdown",
            "Shutting down server..."
        );
    };
    axum::serve(tcp_listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}

#[derive(OpenApi)]
#[openapi(paths(health))]
pub(crate) struct HealthOpenApi;

/// Handles the health check endpoint.
///
/// Responds as soon as the server is accepting requests; the engine is loaded
/// before the listener is bound.
#[utoipa::path(
    get,
    path = "",
    tag = "health",
    responses(
        (status = OK, description = "Service is healthy", body = Value)
    )
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

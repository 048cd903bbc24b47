use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{info, instrument};
use utoipa::OpenApi;
use validator::Validate;

use crate::{
    error::ServiceError,
    handlers::metrics::{GENERATED_CHARACTERS, GENERATION_LATENCY, GENERATION_REQUESTS},
    server::AppState,
    types::{ErrorResponse, GenerationRequest, GenerationResponse},
};

pub const GENERATE_PATH: &str = "/api/predict";

#[derive(OpenApi)]
#[openapi(
    paths(generate_handler),
    components(schemas(GenerationRequest, GenerationResponse, ErrorResponse))
)]
pub(crate) struct GenerateOpenApi;

/// Continues the submitted prompt with characters sampled from the model.
///
/// The prompt is validated and its length request resolved against the service
/// limits before any work is scheduled. The generation itself runs on the
/// blocking thread pool, with at most `max_concurrent_generations` running at
/// the same time.
///
/// # Errors
///
/// Returns a `422 Unprocessable Entity` if:
/// - The body is not valid JSON or misses `input_prompt`
/// - The prompt is empty or contains a character outside the vocabulary
/// - `generate_len` exceeds the configured maximum
///
/// Returns a `500 Internal Server Error` if the model fails while generating.
#[utoipa::path(
    post,
    path = "",
    tag = "generation",
    request_body = GenerationRequest,
    responses(
        (status = OK, description = "Text generated successfully", body = GenerationResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(level = "info", skip_all, fields(path = GENERATE_PATH))]
pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ServiceError> {
    let result = handle_generate_request(&state, payload).await;
    let status = match &result {
        Ok(_) => "success",
        Err(error) if error.status_code().is_client_error() => "client_error",
        Err(_) => "server_error",
    };
    GENERATION_REQUESTS.with_label_values(&[status]).inc();
    result.map(Json)
}

async fn handle_generate_request(
    state: &AppState,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<GenerationResponse, ServiceError> {
    let Json(request) = payload.map_err(|e| ServiceError::InvalidBody {
        message: e.body_text(),
        endpoint: GENERATE_PATH.to_string(),
    })?;
    request.validate().map_err(|e| ServiceError::InvalidBody {
        message: e.to_string(),
        endpoint: GENERATE_PATH.to_string(),
    })?;

    let generate_len = request.generate_len.unwrap_or(state.default_generate_len);
    if generate_len > state.max_generate_len {
        return Err(ServiceError::InvalidBody {
            message: format!(
                "generate_len must not exceed {}, got {generate_len}",
                state.max_generate_len
            ),
            endpoint: GENERATE_PATH.to_string(),
        });
    }

    let permit = state
        .generation_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ServiceError::InternalError {
            message: format!("Generation permits closed: {e}"),
            endpoint: GENERATE_PATH.to_string(),
        })?;

    let generator = state.generator.clone();
    let GenerationRequest {
        input_prompt,
        random_seed,
        ..
    } = request;
    let start = Instant::now();
    let generation = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        generator.generate_text(&input_prompt, generate_len, random_seed)
    })
    .await
    .map_err(|e| ServiceError::InternalError {
        message: format!("Generation task failed: {e}"),
        endpoint: GENERATE_PATH.to_string(),
    })?
    .map_err(|e| ServiceError::from_inference(e, GENERATE_PATH))?;

    let elapsed = start.elapsed();
    GENERATION_LATENCY.observe(elapsed.as_secs_f64());
    GENERATED_CHARACTERS.inc_by(generate_len as u64);
    info!(
        target = "charnn-service",
        event = "generation_completed",
        generate_len,
        elapsed_ms = elapsed.as_millis() as u64,
        "Generation completed"
    );

    Ok(GenerationResponse {
        text: generation.text,
    })
}

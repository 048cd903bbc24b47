use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Input values for the text generation model
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct GenerationRequest {
    /// Seed text the generated continuation starts from. Every character must be
    /// part of the model vocabulary.
    #[schema(example = "This ship is taking me far away")]
    #[validate(length(min = 1, message = "input_prompt must not be empty"))]
    pub input_prompt: String,

    /// Number of characters to generate. Defaults to the service's configured length.
    #[schema(example = 500)]
    pub generate_len: Option<usize>,

    /// Makes the sampling reproducible when set.
    pub random_seed: Option<u64>,
}

/// Generation result from the model
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GenerationResponse {
    /// The input prompt followed by the generated characters.
    #[schema(example = "This ship is taking me far away from the memories")]
    pub text: String,
}

/// API error response
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `true`.
    pub error: bool,
    /// Error message
    pub message: String,
}

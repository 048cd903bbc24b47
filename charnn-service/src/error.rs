use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use charnn_inference::InferenceError;
use thiserror::Error;

use crate::types::ErrorResponse;

/// Represents all possible errors that can occur within the generation service
///
/// Each variant records the endpoint it occurred on, for logging.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Error returned when the request body is malformed or contains invalid data
    #[error("Invalid request body: {message}")]
    InvalidBody {
        /// Description of why the request body is invalid
        message: String,
        /// The endpoint that the error occurred on
        endpoint: String,
    },

    /// Error returned when the prompt cannot be fed to the model, e.g. because it
    /// contains a character outside the vocabulary
    #[error("Invalid prompt: {message}")]
    InvalidPrompt {
        /// Description of the problem with the prompt
        message: String,
        /// The endpoint that the error occurred on
        endpoint: String,
    },

    /// Error returned for unexpected internal server errors
    #[error("Internal server error: {message}")]
    InternalError {
        /// Description of the internal error
        message: String,
        /// The endpoint that the error occurred on
        endpoint: String,
    },
}

impl ServiceError {
    /// Maps an error of the generation core onto the client/server split.
    pub fn from_inference(error: InferenceError, endpoint: &str) -> Self {
        if error.is_client_error() {
            Self::InvalidPrompt {
                message: error.to_string(),
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::InternalError {
                message: error.to_string(),
                endpoint: endpoint.to_string(),
            }
        }
    }

    /// Returns a user-friendly error message for API responses
    ///
    /// Client errors carry their details, internal errors are reported with a
    /// generic message so that no server internals leak to the caller.
    fn client_message(&self) -> String {
        match self {
            Self::InvalidBody { message, .. } => format!("Invalid request body: {message}"),
            Self::InvalidPrompt { message, .. } => format!("Invalid prompt: {message}"),
            Self::InternalError { .. } => "Internal server error occurred".to_string(),
        }
    }

    /// Returns the HTTP status code associated with this error
    ///
    /// - `422 Unprocessable Entity` for request validation failures
    /// - `500 Internal Server Error` for failures of the generation itself
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBody { .. } | Self::InvalidPrompt { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            Self::InvalidBody { endpoint, .. }
            | Self::InvalidPrompt { endpoint, .. }
            | Self::InternalError { endpoint, .. } => endpoint,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        tracing::error!(
            target = "charnn-service",
            event = "error_occurred",
            endpoint = self.endpoint(),
            error = %self,
        );
        let error_response = ErrorResponse {
            error: true,
            message: self.client_message(),
        };
        (self.status_code(), Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_symbol_is_client_error() {
        let error = ServiceError::from_inference(
            InferenceError::UnknownSymbol {
                symbol: '€',
                position: 3,
            },
            "/api/predict",
        );
        assert!(matches!(error, ServiceError::InvalidPrompt { .. }));
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(error.client_message().contains('€'));
    }

    #[test]
    fn test_computation_failure_is_server_error() {
        let error = ServiceError::from_inference(
            InferenceError::InternalComputation("shape mismatch".to_string()),
            "/api/predict",
        );
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.client_message().contains("shape mismatch"));
        assert_eq!(error.endpoint(), "/api/predict");
    }
}

use thiserror::Error;

/// Errors produced by the generation core.
///
/// The variants map onto the three failure classes a caller has to tell apart:
/// startup problems (fatal, never per-request), bad client input, and failures
/// of the scoring function while generating.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The reference corpus or the model parameters are missing, unreadable or
    /// inconsistent with each other.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The prompt contains no characters.
    #[error("Input prompt must not be empty")]
    EmptyPrompt,

    /// A prompt character is not part of the vocabulary.
    #[error("Unknown symbol {symbol:?} at position {position}, not present in the vocabulary")]
    UnknownSymbol {
        /// The offending character
        symbol: char,
        /// Character index of the symbol within the prompt
        position: usize,
    },

    /// The scoring function failed, or returned logits that cannot be sampled.
    #[error("Internal computation error: {0}")]
    InternalComputation(String),
}

impl InferenceError {
    /// Whether the error was caused by the request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyPrompt | Self::UnknownSymbol { .. })
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;

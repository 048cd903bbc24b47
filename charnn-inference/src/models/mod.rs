use crate::{error::Result, vocabulary::SymbolId};

pub mod candle;

/// A pre-trained recurrent scoring function over a fixed vocabulary.
///
/// Implementations are treated as opaque: the generation engine only relies on
/// the contract below. `step` must be deterministic, i.e. the same
/// `(symbol_id, state)` pair always yields the same logits and next state.
/// Learned parameters are shared read-only between concurrent generations,
/// while every generation owns its own `State`.
pub trait SequenceModel: Send + Sync {
    /// Recurrent memory threaded through consecutive steps of one generation.
    type State;

    /// Number of symbols the model scores, i.e. the length of every logits vector.
    fn vocab_size(&self) -> usize;

    /// Returns a zero-initialized recurrent state for `batch_size` sequences.
    fn init_state(&self, batch_size: usize) -> Result<Self::State>;

    /// Consumes one symbol and returns unnormalized log-scores over the
    /// vocabulary together with the updated state.
    fn step(&self, symbol_id: SymbolId, state: &Self::State) -> Result<(Vec<f32>, Self::State)>;
}

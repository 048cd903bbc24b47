use std::{path::Path, time::Instant};

use candle::{DType, Device, Module, Tensor};
use candle_nn::{
    embedding, linear,
    rnn::{lstm, LSTMConfig, LSTMState, LSTM, RNN},
    Embedding, Linear, VarBuilder,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{InferenceError, Result},
    models::{
        candle::{load_var_builder, Precision},
        SequenceModel,
    },
    vocabulary::SymbolId,
};

/// Hyperparameters of the character-level LSTM network.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CharLstmConfig {
    /// Number of symbols, always taken from the vocabulary the network was trained on.
    pub vocab_size: usize,
    /// Width of the symbol embeddings fed into the recurrent cell.
    pub embed_dim: usize,
    /// Width of the hidden and cell state.
    pub hidden_size: usize,
}

/// Embedding, a single LSTM layer and a linear projection back onto the
/// vocabulary.
///
/// Parameter names follow the PyTorch state dict layout
/// (`embedding.weight`, `rnn.weight_ih_l0`, ..., `fc.weight`, `fc.bias`).
pub struct CharLstm {
    embedding: Embedding,
    rnn: LSTM,
    fc: Linear,
    config: CharLstmConfig,
    device: Device,
}

impl CharLstm {
    pub fn new(config: CharLstmConfig, var_builder: VarBuilder) -> candle::Result<Self> {
        let embedding = embedding(
            config.vocab_size,
            config.embed_dim,
            var_builder.pp("embedding"),
        )?;
        let rnn = lstm(
            config.embed_dim,
            config.hidden_size,
            LSTMConfig::default(),
            var_builder.pp("rnn"),
        )?;
        let fc = linear(config.hidden_size, config.vocab_size, var_builder.pp("fc"))?;
        let device = var_builder.device().clone();
        Ok(Self {
            embedding,
            rnn,
            fc,
            config,
            device,
        })
    }

    /// Loads the network parameters from `weights_path`.
    ///
    /// Any failure, including parameter shapes that do not match `config`, is a
    /// configuration error.
    pub fn load(
        config: CharLstmConfig,
        weights_path: &Path,
        precision: Precision,
        device: &Device,
    ) -> Result<Self> {
        info!(
            target = "charnn-inference",
            event = "model_load",
            weights_path = %weights_path.display(),
            vocab_size = config.vocab_size,
            embed_dim = config.embed_dim,
            hidden_size = config.hidden_size,
            "Loading character LSTM model ..."
        );
        let start = Instant::now();

        let var_builder = load_var_builder(weights_path, precision.into_dtype(), device)?;
        let model = Self::new(config, var_builder).map_err(|e| {
            InferenceError::Configuration(format!(
                "model weights at {} do not match the network layout: {e}",
                weights_path.display()
            ))
        })?;

        info!(
            target = "charnn-inference",
            event = "model_loaded",
            elapsed = ?start.elapsed(),
            "Loaded character LSTM model"
        );
        Ok(model)
    }

    pub fn config(&self) -> &CharLstmConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    fn forward_step(
        &self,
        symbol_id: SymbolId,
        state: &LSTMState,
    ) -> candle::Result<(Vec<f32>, LSTMState)> {
        let input = Tensor::new(&[symbol_id], &self.device)?;
        // (1,) -> (1, embed_dim)
        let embedded = self.embedding.forward(&input)?;
        let state = self.rnn.step(&embedded, state)?;
        // (1, hidden_size) -> (1, vocab_size)
        let logits = self.fc.forward(state.h())?;
        let logits = logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        Ok((logits, state))
    }
}

impl SequenceModel for CharLstm {
    type State = LSTMState;

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn init_state(&self, batch_size: usize) -> Result<Self::State> {
        self.rnn
            .zero_state(batch_size)
            .map_err(|e| InferenceError::InternalComputation(e.to_string()))
    }

    fn step(&self, symbol_id: SymbolId, state: &Self::State) -> Result<(Vec<f32>, Self::State)> {
        if symbol_id as usize >= self.config.vocab_size {
            return Err(InferenceError::InternalComputation(format!(
                "symbol id {symbol_id} out of range for vocabulary of size {}",
                self.config.vocab_size
            )));
        }
        self.forward_step(symbol_id, state)
            .map_err(|e| InferenceError::InternalComputation(e.to_string()))
    }
}

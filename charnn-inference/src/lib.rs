pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod sampling;
pub mod vocabulary;

use std::sync::Arc;

use tracing::{info, instrument};

pub use crate::{
    config::InferenceConfig,
    engine::{GenerationEngine, GenerationResult, TextGenerator},
    error::InferenceError,
    models::{
        candle::char_lstm::{CharLstm, CharLstmConfig},
        SequenceModel,
    },
    vocabulary::{SymbolId, Vocabulary},
};

/// Builds the vocabulary and loads the trained network described by `config`.
///
/// Both inputs are required; any failure is a [`InferenceError::Configuration`]
/// and should prevent the process from serving requests.
#[instrument(level = "info", skip_all)]
pub fn load_engine(config: &InferenceConfig) -> error::Result<GenerationEngine<CharLstm>> {
    let vocabulary = Vocabulary::from_corpus_file(&config.corpus_path)?;
    let device = models::candle::device(config.device_id)
        .map_err(|e| InferenceError::Configuration(format!("failed to open device: {e}")))?;
    let model = CharLstm::load(
        CharLstmConfig {
            vocab_size: vocabulary.len(),
            embed_dim: config.embed_dim,
            hidden_size: config.hidden_size,
        },
        &config.weights_path,
        config.precision,
        &device,
    )?;
    let engine = GenerationEngine::new(Arc::new(vocabulary), Arc::new(model))?;
    info!(
        target = "charnn-inference",
        event = "engine_ready",
        vocab_size = engine.vocabulary().len(),
        "Generation engine ready"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use candle::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    use super::*;

    const CORPUS: &str = "The Call of the Wild\n\nBuck did not read the newspapers.";

    #[test]
    fn test_load_engine_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("input.txt");
        std::fs::write(&corpus_path, CORPUS).unwrap();
        let vocab_size = Vocabulary::build(CORPUS).unwrap().len();

        let varmap = VarMap::new();
        let var_builder = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        CharLstm::new(
            CharLstmConfig {
                vocab_size,
                embed_dim: 8,
                hidden_size: 12,
            },
            var_builder,
        )
        .unwrap();
        let weights_path = dir.path().join("model.safetensors");
        varmap.save(&weights_path).unwrap();

        let engine = load_engine(&InferenceConfig {
            corpus_path,
            weights_path,
            embed_dim: 8,
            hidden_size: 12,
            precision: models::candle::Precision::F32,
            device_id: 0,
        })
        .unwrap();

        let result = engine.generate_seeded("Buck ", 25, 5).unwrap();
        assert_eq!(result.text.chars().count(), 30);
        assert!(result.text.starts_with("Buck "));
        assert_eq!(result, engine.generate_seeded("Buck ", 25, 5).unwrap());
    }

    #[test]
    fn test_load_engine_without_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_engine(&InferenceConfig {
            corpus_path: dir.path().join("input.txt"),
            weights_path: dir.path().join("model.pt"),
            embed_dim: 8,
            hidden_size: 12,
            precision: Default::default(),
            device_id: 0,
        });
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }
}

use std::{sync::Arc, time::Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{InferenceError, Result},
    models::SequenceModel,
    sampling,
    vocabulary::Vocabulary,
};

/// Batch size used for every generation; requests are never batched together.
const BATCH_SIZE: usize = 1;

/// Output of a single generation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationResult {
    /// The prompt followed by exactly the requested number of sampled characters.
    pub text: String,
}

/// Runs character-level autoregressive generation.
///
/// The engine owns the vocabulary and the scoring model, both read-only after
/// construction. Each call to [`GenerationEngine::generate`] allocates a fresh
/// recurrent state, so a single engine can serve concurrent requests.
pub struct GenerationEngine<M: SequenceModel> {
    vocabulary: Arc<Vocabulary>,
    model: Arc<M>,
}

/// Object-safe view of a generation engine, so callers can hold any engine
/// behind `Arc<dyn TextGenerator>` regardless of its model type.
pub trait TextGenerator: Send + Sync {
    /// Continues `input_prompt` by `generate_len` characters. With a
    /// `random_seed` the result is reproducible, otherwise it draws from
    /// process entropy.
    fn generate_text(
        &self,
        input_prompt: &str,
        generate_len: usize,
        random_seed: Option<u64>,
    ) -> Result<GenerationResult>;

    /// Number of symbols in the vocabulary.
    fn vocab_size(&self) -> usize;
}

impl<M: SequenceModel> Clone for GenerationEngine<M> {
    fn clone(&self) -> Self {
        Self {
            vocabulary: self.vocabulary.clone(),
            model: self.model.clone(),
        }
    }
}

impl<M: SequenceModel> GenerationEngine<M> {
    /// Creates a new engine, checking that the model scores exactly the symbols
    /// of `vocabulary`.
    pub fn new(vocabulary: Arc<Vocabulary>, model: Arc<M>) -> Result<Self> {
        if model.vocab_size() != vocabulary.len() {
            return Err(InferenceError::Configuration(format!(
                "model scores {} symbols but the vocabulary has {}",
                model.vocab_size(),
                vocabulary.len()
            )));
        }
        Ok(Self { vocabulary, model })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Continues `input_prompt` by `generate_len` characters, drawing from the
    /// thread-local random generator.
    pub fn generate(&self, input_prompt: &str, generate_len: usize) -> Result<GenerationResult> {
        self.generate_with_rng(input_prompt, generate_len, &mut rand::thread_rng())
    }

    /// Same as [`GenerationEngine::generate`], but reproducible: the same seed
    /// always yields the same text.
    pub fn generate_seeded(
        &self,
        input_prompt: &str,
        generate_len: usize,
        random_seed: u64,
    ) -> Result<GenerationResult> {
        let mut rng = StdRng::seed_from_u64(random_seed);
        self.generate_with_rng(input_prompt, generate_len, &mut rng)
    }

    /// Continues `input_prompt` by `generate_len` characters, drawing every
    /// sampled symbol from `rng`.
    ///
    /// The whole prompt is encoded before the model is touched, so an unknown
    /// symbol fails without any recurrent computation. All prompt symbols but
    /// the last are fed through the model to warm up the state; the last one
    /// seeds the first sampling step.
    #[instrument(level = "debug", skip(self, input_prompt, rng), fields(prompt_len = tracing::field::Empty))]
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        input_prompt: &str,
        generate_len: usize,
        rng: &mut R,
    ) -> Result<GenerationResult> {
        let encoded = self.vocabulary.encode(input_prompt)?;
        let Some((&last, warm_up)) = encoded.split_last() else {
            return Err(InferenceError::EmptyPrompt);
        };
        tracing::Span::current().record("prompt_len", encoded.len());

        let start = Instant::now();
        let mut state = self.model.init_state(BATCH_SIZE)?;
        for &symbol_id in warm_up {
            let (_, next_state) = self.model.step(symbol_id, &state)?;
            state = next_state;
        }
        debug!(
            target = "charnn-inference",
            event = "warm_up_finished",
            warm_up_steps = warm_up.len(),
            elapsed = ?start.elapsed(),
            "Recurrent state warmed up on prompt"
        );

        let mut output = String::with_capacity(input_prompt.len() + generate_len);
        output.push_str(input_prompt);
        let mut current = last;
        for _ in 0..generate_len {
            let (logits, next_state) = self.model.step(current, &state)?;
            state = next_state;
            if logits.len() != self.vocabulary.len() {
                return Err(InferenceError::InternalComputation(format!(
                    "model returned {} logits for a vocabulary of size {}",
                    logits.len(),
                    self.vocabulary.len()
                )));
            }
            current = sampling::sample(&logits, rng)?;
            output.push(self.vocabulary.decode(current));
        }
        debug!(
            target = "charnn-inference",
            event = "generation_finished",
            generated = generate_len,
            elapsed = ?start.elapsed(),
            "Generation finished"
        );

        Ok(GenerationResult { text: output })
    }
}

impl<M: SequenceModel> TextGenerator for GenerationEngine<M> {
    fn generate_text(
        &self,
        input_prompt: &str,
        generate_len: usize,
        random_seed: Option<u64>,
    ) -> Result<GenerationResult> {
        match random_seed {
            Some(seed) => self.generate_seeded(input_prompt, generate_len, seed),
            None => self.generate(input_prompt, generate_len),
        }
    }

    fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }
}

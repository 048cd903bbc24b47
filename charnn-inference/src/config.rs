use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::{
    error::{InferenceError, Result},
    models::candle::Precision,
};

const DEFAULT_EMBED_DIM: usize = 256;
const DEFAULT_HIDDEN_SIZE: usize = 512;

/// Configuration for the generation core.
///
/// Read from the `charnn_inference` section of the configuration file, with
/// `CHARNN_INFERENCE__*` environment variables taking precedence.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct InferenceConfig {
    /// Path to the plain-text reference corpus the vocabulary is built from.
    pub corpus_path: PathBuf,

    /// Path to the trained network parameters (`.safetensors`, `.pt` or `.pth`).
    pub weights_path: PathBuf,

    /// Width of the symbol embeddings.
    #[serde(default = "default_embed_dim")]
    pub embed_dim: usize,

    /// Width of the LSTM hidden and cell state.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Precision the weights are loaded with.
    #[serde(default)]
    pub precision: Precision,

    /// Index of the accelerator to run on, ignored on CPU.
    #[serde(default)]
    pub device_id: usize,
}

fn default_embed_dim() -> usize {
    DEFAULT_EMBED_DIM
}

fn default_hidden_size() -> usize {
    DEFAULT_HIDDEN_SIZE
}

impl InferenceConfig {
    /// Creates a new `InferenceConfig` instance from a configuration file.
    ///
    /// # Arguments
    ///
    /// * `config_file_path` - Path to the configuration file. The file should be in a format
    ///   supported by the `config` crate (e.g., YAML, JSON, TOML) and contain a
    ///   "charnn_inference" section.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Configuration`] if the file cannot be read or parsed, or if
    /// the section is missing or incomplete.
    pub fn from_file_path<P: AsRef<Path>>(config_file_path: P) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(config_file_path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CHARNN_INFERENCE")
                    .keep_prefix(true)
                    .separator("__"),
            );
        let config = builder.build().map_err(|e| {
            InferenceError::Configuration(format!(
                "failed to read configuration file {}: {e}",
                config_file_path.as_ref().display()
            ))
        })?;
        config.get::<Self>("charnn_inference").map_err(|e| {
            InferenceError::Configuration(format!("invalid charnn_inference section: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_config_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[charnn_inference]\ncorpus_path = \"model/input.txt\"\nweights_path = \"model/model.pt\""
        )
        .unwrap();

        let config = InferenceConfig::from_file_path(file.path()).unwrap();
        assert_eq!(
            config,
            InferenceConfig {
                corpus_path: "model/input.txt".into(),
                weights_path: "model/model.pt".into(),
                embed_dim: 256,
                hidden_size: 512,
                precision: Precision::F32,
                device_id: 0,
            }
        );
    }

    #[test]
    fn test_config_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[charnn_inference]\ncorpus_path = \"c.txt\"\nweights_path = \"w.safetensors\"\nembed_dim = 64\nhidden_size = 128\nprecision = \"f16\"\ndevice_id = 1"
        )
        .unwrap();

        let config = InferenceConfig::from_file_path(file.path()).unwrap();
        assert_eq!(config.embed_dim, 64);
        assert_eq!(config.hidden_size, 128);
        assert_eq!(config.precision, Precision::F16);
        assert_eq!(config.device_id, 1);
    }

    #[test]
    fn test_missing_section_is_configuration_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[charnn_service]\nservice_bind_address = \"0.0.0.0:8000\"").unwrap();
        let result = InferenceConfig::from_file_path(file.path());
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = InferenceConfig::from_file_path(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }
}

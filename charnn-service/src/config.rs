use std::path::Path;

use config::{Config, File};
use serde::Deserialize;
use validator::Validate;

const DEFAULT_GENERATE_LEN: usize = 500;
const DEFAULT_MAX_GENERATE_LEN: usize = 10_000;
const DEFAULT_MAX_CONCURRENT_GENERATIONS: usize = 4;

/// Configuration for the text generation HTTP service.
///
/// This struct holds the configuration options for the service, loaded from the
/// `charnn_service` section of the configuration file.
#[derive(Debug, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Bind address for the service.
    ///
    /// This field specifies the address and port on which the service will bind,
    /// e.g. "0.0.0.0:8000".
    pub service_bind_address: String,

    /// Number of characters generated when a request does not specify one.
    #[serde(default = "default_generate_len")]
    pub default_generate_len: usize,

    /// Upper bound on the number of characters a single request may ask for.
    ///
    /// Generation cannot be interrupted once started, so this is the only bound
    /// on the work a request can cause.
    #[serde(default = "default_max_generate_len")]
    pub max_generate_len: usize,

    /// Maximum number of generations running at the same time.
    #[serde(default = "default_max_concurrent_generations")]
    #[validate(range(min = 1))]
    pub max_concurrent_generations: usize,
}

fn default_generate_len() -> usize {
    DEFAULT_GENERATE_LEN
}

fn default_max_generate_len() -> usize {
    DEFAULT_MAX_GENERATE_LEN
}

fn default_max_concurrent_generations() -> usize {
    DEFAULT_MAX_CONCURRENT_GENERATIONS
}

impl ServiceConfig {
    /// Creates a new `ServiceConfig` instance from a configuration file.
    ///
    /// # Arguments
    ///
    /// * `config_file_path` - Path to the configuration file. The file should be in a format
    ///   supported by the `config` crate (e.g., YAML, JSON, TOML) and contain a
    ///   "charnn_service" section. `CHARNN_SERVICE__*` environment variables override
    ///   values from the file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The configuration file cannot be read or parsed
    /// * The "charnn_service" section is missing or incomplete
    /// * A value is out of range, or the default length exceeds the maximum length
    pub fn from_file_path<P: AsRef<Path>>(config_file_path: P) -> anyhow::Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(config_file_path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CHARNN_SERVICE")
                    .keep_prefix(true)
                    .separator("__"),
            );
        let config = builder.build()?.get::<Self>("charnn_service")?;
        config.validate()?;
        anyhow::ensure!(
            config.default_generate_len <= config.max_generate_len,
            "default_generate_len ({}) exceeds max_generate_len ({})",
            config.default_generate_len,
            config.max_generate_len
        );
        Ok(config)
    }
}

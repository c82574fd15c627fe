use crate::summarization::GenerationParams;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_MAX_INPUT_TOKENS: usize = 1024;
const DEFAULT_PROMPT_PREFIX: &str = "summarize: ";
const DEFAULT_TOKENIZER_ENCODING: &str = "r50k_base";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was installed more than once.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the Rusty Summary server and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend that produces abstractive summaries.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the provider.
    pub summarization_model: String,
    /// Optional base URL override for the provider endpoint.
    pub summarization_url: Option<String>,
    /// Optional bearer token sent to the provider.
    pub summarization_api_token: Option<String>,
    /// Tokenizer model or encoding name used for chunking.
    pub tokenizer_encoding: String,
    /// Default number of tokens per chunk.
    pub chunk_size: usize,
    /// Token ceiling applied to each model input after the prompt prefix is added.
    pub max_input_tokens: usize,
    /// Text prepended to every chunk before it reaches the model.
    pub prompt_prefix: String,
    /// Fixed generation parameters forwarded with every chunk.
    pub generation: GenerationParams,
    /// Largest accepted upload on the HTTP surface.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProvider {
    /// Hugging Face inference endpoint (hosted or self-hosted TGI/Inference API).
    HuggingFace,
    /// Local Ollama runtime.
    Ollama,
    /// Offline sentence-ranking summarizer; no model server required.
    Extractive,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let summarization_provider = required("SUMMARIZATION_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string()))?;

        let chunk_size = parse_optional(optional("SUMMARY_CHUNK_SIZE"), "SUMMARY_CHUNK_SIZE")?
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CHUNK_SIZE".into()));
        }

        let max_input_tokens = parse_optional(
            optional("SUMMARY_MAX_INPUT_TOKENS"),
            "SUMMARY_MAX_INPUT_TOKENS",
        )?
        .unwrap_or(DEFAULT_MAX_INPUT_TOKENS);
        if max_input_tokens == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_MAX_INPUT_TOKENS".into()));
        }

        let defaults = GenerationParams::default();
        let generation = GenerationParams {
            max_length: parse_optional(optional("SUMMARY_MAX_LENGTH"), "SUMMARY_MAX_LENGTH")?
                .unwrap_or(defaults.max_length),
            min_length: parse_optional(optional("SUMMARY_MIN_LENGTH"), "SUMMARY_MIN_LENGTH")?
                .unwrap_or(defaults.min_length),
            length_penalty: parse_optional(
                optional("SUMMARY_LENGTH_PENALTY"),
                "SUMMARY_LENGTH_PENALTY",
            )?
            .unwrap_or(defaults.length_penalty),
            num_beams: parse_optional(optional("SUMMARY_NUM_BEAMS"), "SUMMARY_NUM_BEAMS")?
                .unwrap_or(defaults.num_beams),
            early_stopping: optional("SUMMARY_EARLY_STOPPING")
                .map(|value| {
                    parse_flag(&value)
                        .ok_or_else(|| ConfigError::InvalidValue("SUMMARY_EARLY_STOPPING".into()))
                })
                .transpose()?
                .unwrap_or(defaults.early_stopping),
        };
        if generation.min_length > generation.max_length {
            return Err(ConfigError::InvalidValue("SUMMARY_MIN_LENGTH".into()));
        }
        if generation.num_beams == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_NUM_BEAMS".into()));
        }

        Ok(Self {
            summarization_provider,
            summarization_model: required("SUMMARIZATION_MODEL")?,
            summarization_url: optional("SUMMARIZATION_URL"),
            summarization_api_token: optional("SUMMARIZATION_API_TOKEN"),
            tokenizer_encoding: optional("TOKENIZER_ENCODING")
                .unwrap_or_else(|| DEFAULT_TOKENIZER_ENCODING.to_string()),
            chunk_size,
            max_input_tokens,
            // Not trimmed: the trailing space of the default prefix is significant.
            prompt_prefix: lookup("SUMMARY_PROMPT_PREFIX")
                .unwrap_or_else(|| DEFAULT_PROMPT_PREFIX.to_string()),
            generation,
            max_upload_bytes: parse_optional(optional("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: parse_optional(optional("SERVER_PORT"), "SERVER_PORT")?,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            "extractive" | "none" => Ok(Self::Extractive),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Call after tracing is initialized so the loaded settings are logged.
pub fn init_config() -> Result<(), ConfigError> {
    dotenvy::dotenv().ok();
    install_config(Config::from_env()?)
}

fn install_config(config: Config) -> Result<(), ConfigError> {
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        tokenizer = %config.tokenizer_encoding,
        chunk_size = config.chunk_size,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

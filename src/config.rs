use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docsearch server and ingestion tool.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the OpenSearch cluster holding the document index.
    pub opensearch_url: String,
    /// Basic-auth user for OpenSearch.
    pub opensearch_user: String,
    /// Optional basic-auth password for OpenSearch.
    pub opensearch_password: Option<String>,
    /// Name of the index storing documents.
    pub opensearch_index_name: String,
    /// How many pings to attempt while waiting for OpenSearch at startup.
    pub opensearch_startup_attempts: u32,
    /// Delay between startup pings, in seconds.
    pub opensearch_startup_delay_secs: u64,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime serving embeddings and chat.
    pub ollama_url: String,
    /// Chat model used to summarize chunks.
    pub summarization_model: String,
    /// Number of nearest-neighbour candidates requested by the vector clause.
    pub search_knn_k: usize,
    /// Boost applied to title matches relative to body matches.
    pub search_title_boost: f32,
    /// Largest page size a search may request.
    pub search_max_limit: usize,
    /// Largest offset a search may request.
    pub search_max_offset: usize,
    /// Largest `offset + limit` the index serves (OpenSearch `index.max_result_window`).
    pub search_max_result_window: usize,
    /// Largest number of documents a single summarize call may reference.
    pub summarize_max_documents: usize,
    /// Maximum chunk length, in characters, handed to the LLM.
    pub summarize_chunk_chars: usize,
    /// Number of document fetches allowed in flight during summarization.
    pub summarize_fetch_concurrency: usize,
    /// Timeout applied to embedding and index store calls, in seconds.
    pub upstream_timeout_secs: u64,
    /// Timeout applied to LLM chat calls, in seconds.
    pub llm_timeout_secs: u64,
    /// Retries attempted after a failed or timed-out upstream call.
    pub upstream_retries: u32,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-hashing embedder that needs no model runtime.
    Hashing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opensearch_url: "http://opensearch:9200".into(),
            opensearch_user: "admin".into(),
            opensearch_password: None,
            opensearch_index_name: "documents".into(),
            opensearch_startup_attempts: 30,
            opensearch_startup_delay_secs: 5,
            embedding_provider: EmbeddingProvider::Ollama,
            embedding_model: "all-minilm".into(),
            embedding_dimension: 384,
            ollama_url: "http://127.0.0.1:11434".into(),
            summarization_model: "mistral".into(),
            search_knn_k: 12,
            search_title_boost: 2.0,
            search_max_limit: 100,
            search_max_offset: 10_000,
            search_max_result_window: 10_000,
            summarize_max_documents: 50,
            summarize_chunk_chars: 5000,
            summarize_fetch_concurrency: 4,
            upstream_timeout_secs: 30,
            llm_timeout_secs: 120,
            upstream_retries: 1,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to deployment defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            opensearch_url: load_env_optional("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            opensearch_user: load_env_optional("OPENSEARCH_USER")
                .unwrap_or(defaults.opensearch_user),
            opensearch_password: load_env_optional("OPENSEARCH_PASSWORD"),
            opensearch_index_name: load_env_optional("OPENSEARCH_INDEX_NAME")
                .unwrap_or(defaults.opensearch_index_name),
            opensearch_startup_attempts: parse_env_or(
                "OPENSEARCH_STARTUP_ATTEMPTS",
                defaults.opensearch_startup_attempts,
            )?,
            opensearch_startup_delay_secs: parse_env_or(
                "OPENSEARCH_STARTUP_DELAY_SECS",
                defaults.opensearch_startup_delay_secs,
            )?,
            embedding_provider: parse_env_or("EMBEDDING_PROVIDER", defaults.embedding_provider)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: positive(
                "EMBEDDING_DIMENSION",
                parse_env_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            )?,
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            search_knn_k: positive(
                "SEARCH_KNN_K",
                parse_env_or("SEARCH_KNN_K", defaults.search_knn_k)?,
            )?,
            search_title_boost: parse_env_or("SEARCH_TITLE_BOOST", defaults.search_title_boost)?,
            search_max_limit: positive(
                "SEARCH_MAX_LIMIT",
                parse_env_or("SEARCH_MAX_LIMIT", defaults.search_max_limit)?,
            )?,
            search_max_offset: parse_env_or("SEARCH_MAX_OFFSET", defaults.search_max_offset)?,
            search_max_result_window: positive(
                "SEARCH_MAX_RESULT_WINDOW",
                parse_env_or(
                    "SEARCH_MAX_RESULT_WINDOW",
                    defaults.search_max_result_window,
                )?,
            )?,
            summarize_max_documents: parse_env_or(
                "SUMMARIZE_MAX_DOCUMENTS",
                defaults.summarize_max_documents,
            )?,
            summarize_chunk_chars: positive(
                "SUMMARIZE_CHUNK_CHARS",
                parse_env_or("SUMMARIZE_CHUNK_CHARS", defaults.summarize_chunk_chars)?,
            )?,
            summarize_fetch_concurrency: positive(
                "SUMMARIZE_FETCH_CONCURRENCY",
                parse_env_or(
                    "SUMMARIZE_FETCH_CONCURRENCY",
                    defaults.summarize_fetch_concurrency,
                )?,
            )?,
            upstream_timeout_secs: parse_env_or(
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout_secs,
            )?,
            llm_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", defaults.llm_timeout_secs)?,
            upstream_retries: parse_env_or("UPSTREAM_RETRIES", defaults.upstream_retries)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn positive(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(value)
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
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
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

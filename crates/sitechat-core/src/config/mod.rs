//! Configuration management
//!
//! Configuration is read from `config.yml` under the platform config directory.
//! Every field has a default, most of which can be overridden with a
//! `SITECHAT_*` environment variable so a bare install works without a file.

use crate::error::{Result, SiteChatError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default site/run scope used when the caller does not supply one
    #[serde(default)]
    pub site: SiteConfig,

    /// Retrieval and re-ranking tunables
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding service
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cross-encoder re-ranking service
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Answer-generation service
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Vector store
    #[serde(default)]
    pub store: StoreConfig,
}

/// Default query scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_id")]
    pub site_id: Option<String>,

    #[serde(default = "default_run_id")]
    pub run_id: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            run_id: default_run_id(),
        }
    }
}

fn default_site_id() -> Option<String> {
    env_opt("SITECHAT_SITE")
}

fn default_run_id() -> Option<String> {
    env_opt("SITECHAT_RUN_ID")
}

/// Retrieval pipeline tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours fetched from the store
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,

    /// Number of ranked chunks handed to the synthesizer
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Characters of chunk text sent to the relevance model
    #[serde(default = "default_rerank_text_chars")]
    pub rerank_text_chars: usize,

    /// Advisory wall-clock budget for the relevance model, in milliseconds
    #[serde(default = "default_rerank_timeout_ms")]
    pub rerank_timeout_ms: u64,

    /// Maximum tokens requested from the answer generator
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for answer generation
    #[serde(default)]
    pub temperature: f32,
}

impl RetrievalConfig {
    /// Re-rank budget as a duration
    pub fn rerank_budget(&self) -> Duration {
        Duration::from_millis(self.rerank_timeout_ms)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: default_candidate_k(),
            final_k: default_final_k(),
            rerank_text_chars: default_rerank_text_chars(),
            rerank_timeout_ms: default_rerank_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

fn default_candidate_k() -> usize {
    env_or("SITECHAT_CANDIDATE_K", 40)
}

fn default_final_k() -> usize {
    env_or("SITECHAT_FINAL_K", 5)
}

fn default_rerank_text_chars() -> usize {
    1200
}

fn default_rerank_timeout_ms() -> u64 {
    env_or("SITECHAT_RERANK_TIMEOUT_MS", 300)
}

fn default_max_tokens() -> u32 {
    600
}

/// Embedding service configuration (OpenAI-compatible `/v1/embeddings`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: Option<String>,

    /// Model name; must match the model used when the chunks were ingested
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector length
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            api_key: default_embedding_api_key(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_embedding_url() -> Option<String> {
    env_opt("SITECHAT_EMBEDDING_URL")
}

fn default_embedding_model() -> String {
    std::env::var("SITECHAT_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-mpnet-base-v2".to_string())
}

fn default_embedding_dimensions() -> usize {
    env_or("SITECHAT_EMBEDDING_DIMS", 768)
}

fn default_embedding_api_key() -> Option<String> {
    env_opt("SITECHAT_EMBEDDING_API_KEY")
}

/// Cross-encoder re-ranking service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL of the `/rerank` service. Without it every query uses the
    /// keyword fallback ranking.
    #[serde(default = "default_reranker_url")]
    pub url: Option<String>,

    #[serde(default = "default_reranker_model")]
    pub model: String,

    #[serde(default = "default_reranker_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_reranker_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            url: default_reranker_url(),
            model: default_reranker_model(),
            api_key: default_reranker_api_key(),
            timeout_secs: default_reranker_timeout(),
        }
    }
}

fn default_reranker_url() -> Option<String> {
    env_opt("SITECHAT_RERANKER_URL")
}

fn default_reranker_model() -> String {
    std::env::var("SITECHAT_RERANKER_MODEL")
        .unwrap_or_else(|_| "cross-encoder/ms-marco-TinyBERT-L-2-v2".to_string())
}

fn default_reranker_api_key() -> Option<String> {
    env_opt("SITECHAT_RERANKER_API_KEY")
}

fn default_reranker_timeout() -> u64 {
    10
}

/// Which answer-generation backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// OpenAI-compatible `/v1/chat/completions` (vLLM, OpenAI, Ollama, ...)
    OpenAi,
    /// IBM watsonx.ai text chat
    Watsonx,
}

impl FromStr for GeneratorKind {
    type Err = SiteChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "watsonx" => Ok(Self::Watsonx),
            other => Err(SiteChatError::Config(format!(
                "unknown generator provider '{}'",
                other
            ))),
        }
    }
}

/// Answer-generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_kind")]
    pub provider: GeneratorKind,

    #[serde(default = "default_generator_url")]
    pub url: Option<String>,

    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Bearer key (OpenAI) or IBM Cloud API key (watsonx)
    #[serde(default = "default_generator_api_key")]
    pub api_key: Option<String>,

    /// watsonx project id
    #[serde(default = "default_project_id")]
    pub project_id: Option<String>,

    /// IAM token endpoint used by watsonx
    #[serde(default = "default_iam_url")]
    pub iam_url: String,

    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_kind(),
            url: default_generator_url(),
            model: default_generator_model(),
            api_key: default_generator_api_key(),
            project_id: default_project_id(),
            iam_url: default_iam_url(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

fn default_generator_kind() -> GeneratorKind {
    env_opt("SITECHAT_LLM_PROVIDER")
        .and_then(|s| s.parse().ok())
        .unwrap_or(GeneratorKind::OpenAi)
}

fn default_generator_url() -> Option<String> {
    env_opt("SITECHAT_LLM_URL")
}

fn default_generator_model() -> String {
    std::env::var("SITECHAT_LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/llama-3-3-70b-instruct".to_string())
}

fn default_generator_api_key() -> Option<String> {
    env_opt("SITECHAT_LLM_API_KEY")
}

fn default_project_id() -> Option<String> {
    env_opt("SITECHAT_WATSONX_PROJECT_ID")
}

fn default_iam_url() -> String {
    "https://iam.cloud.ibm.com/identity/token".to_string()
}

fn default_generator_timeout() -> u64 {
    60
}

/// Which vector store backend to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Astra DB Data API collection
    Astra,
    /// Chunks loaded from a local JSONL file
    Memory,
}

impl FromStr for StoreKind {
    type Err = SiteChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "astra" => Ok(Self::Astra),
            "memory" => Ok(Self::Memory),
            other => Err(SiteChatError::Config(format!(
                "unknown store kind '{}'",
                other
            ))),
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,

    /// Astra Data API endpoint
    #[serde(default = "default_store_endpoint")]
    pub endpoint: Option<String>,

    /// Astra application token
    #[serde(default = "default_store_token")]
    pub token: Option<String>,

    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// JSONL chunk file for the memory store
    #[serde(default = "default_chunks_path")]
    pub chunks_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            endpoint: default_store_endpoint(),
            token: default_store_token(),
            keyspace: default_keyspace(),
            collection: default_collection(),
            chunks_path: default_chunks_path(),
        }
    }
}

fn default_store_kind() -> StoreKind {
    env_opt("SITECHAT_STORE")
        .and_then(|s| s.parse().ok())
        .unwrap_or(StoreKind::Astra)
}

fn default_store_endpoint() -> Option<String> {
    env_opt("SITECHAT_ASTRA_ENDPOINT")
}

fn default_store_token() -> Option<String> {
    env_opt("SITECHAT_ASTRA_TOKEN")
}

fn default_keyspace() -> String {
    "default_keyspace".to_string()
}

fn default_collection() -> String {
    std::env::var("SITECHAT_COLLECTION").unwrap_or_else(|_| "chatbot_chunks".to_string())
}

fn default_chunks_path() -> Option<PathBuf> {
    env_opt("SITECHAT_CHUNKS_PATH").map(PathBuf::from)
}

fn default_timeout() -> u64 {
    30
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Check that every service needed to answer a query is wired up.
    ///
    /// The re-ranker is optional: without it queries use the fallback ranking.
    pub fn validate(&self) -> Result<()> {
        self.validate_retrieval()?;
        self.validate_generator()
    }

    /// Check the services needed to retrieve and rank sources, without
    /// generating an answer.
    pub fn validate_retrieval(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.candidate_k == 0 || r.final_k == 0 {
            return Err(SiteChatError::Config(
                "retrieval.candidate_k and retrieval.final_k must be positive".to_string(),
            ));
        }
        if r.rerank_text_chars == 0 {
            return Err(SiteChatError::Config(
                "retrieval.rerank_text_chars must be positive".to_string(),
            ));
        }

        require(&self.embedding.url, "embedding.url (SITECHAT_EMBEDDING_URL)")?;
        if self.embedding.dimensions == 0 {
            return Err(SiteChatError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        match self.store.kind {
            StoreKind::Astra => {
                require(&self.store.endpoint, "store.endpoint (SITECHAT_ASTRA_ENDPOINT)")?;
                require(&self.store.token, "store.token (SITECHAT_ASTRA_TOKEN)")?;
            }
            StoreKind::Memory => {
                if self.store.chunks_path.is_none() {
                    return Err(SiteChatError::Config(
                        "missing store.chunks_path (SITECHAT_CHUNKS_PATH)".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn validate_generator(&self) -> Result<()> {
        require(&self.generator.url, "generator.url (SITECHAT_LLM_URL)")?;
        if self.generator.provider == GeneratorKind::Watsonx {
            require(&self.generator.api_key, "generator.api_key (SITECHAT_LLM_API_KEY)")?;
            require(
                &self.generator.project_id,
                "generator.project_id (SITECHAT_WATSONX_PROJECT_ID)",
            )?;
        }
        Ok(())
    }
}

/// Return the configured value or a configuration error naming the setting
pub(crate) fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SiteChatError::Config(format!("missing {}", what)))
}

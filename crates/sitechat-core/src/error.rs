//! Error types for sitechat

use thiserror::Error;

/// Result type alias using SiteChatError
pub type Result<T> = std::result::Result<T, SiteChatError>;

/// Error type alias for convenience
pub type Error = SiteChatError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for sitechat
#[derive(Debug, Error)]
pub enum SiteChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding dimension mismatch: model configured for {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Answer generation failed: {0}")]
    AnswerGeneration(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),
}

impl SiteChatError {
    /// Whether this error means the system is wired incorrectly.
    ///
    /// Such errors are fatal: retrying the query cannot fix them.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::DimensionMismatch { .. })
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::DimensionMismatch { .. } | Self::InvalidInput(_) => {
                exit_codes::INVALID_INPUT
            }
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

//! Model provider trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait
///
/// Implementations must be deterministic for a given model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Pairwise relevance scoring trait (cross-encoder style)
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score `(query, passage)` pairs.
    ///
    /// Returns one score per pair, in input order. Higher is more relevant.
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f64>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Single-turn answer generation trait
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Run one chat turn with no session state
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

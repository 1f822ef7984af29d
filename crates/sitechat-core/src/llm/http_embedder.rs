//! HTTP-based embedder using an OpenAI-compatible `/v1/embeddings` service

use super::cache::{embedding_cache_key, EmbeddingCache};
use super::{Embedder, OpenAIClient};
use crate::config::{require, EmbeddingConfig};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use std::time::Duration;

/// Embedder that uses an external HTTP service
pub struct HttpEmbedder {
    client: OpenAIClient,
    dimensions: usize,
    cache: EmbeddingCache,
}

impl HttpEmbedder {
    /// Create from client and the dimensionality used at ingestion time
    pub fn new(client: OpenAIClient, dimensions: usize) -> Self {
        Self {
            client,
            dimensions,
            cache: EmbeddingCache::new(),
        }
    }

    /// Create from configuration
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let url = require(&config.url, "embedding.url (SITECHAT_EMBEDDING_URL)")?;
        let client = OpenAIClient::new(
            url,
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(client, config.dimensions))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = embedding_cache_key(self.client.model(), text);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Query embedding served from cache");
            return Ok(cached);
        }

        let vector = self
            .client
            .embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SiteChatError::Llm("No embedding returned".to_string()))?;

        if vector.len() != self.dimensions {
            return Err(SiteChatError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        self.cache.set(key, vector.clone());
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        self.client.model()
    }
}

//! HTTP client for OpenAI-compatible services (vLLM, OpenAI, Ollama, etc.)

use super::AnswerGenerator;
use crate::config::{require, GeneratorConfig};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible client
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAIClient {
    /// Create a client for `base_url` (without the `/v1` suffix)
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SiteChatError::Http)?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    /// Create the answer-generation client from configuration
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let url = require(&config.url, "generator.url (SITECHAT_LLM_URL)")?;
        Self::new(
            url,
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    /// Generate chat completion
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Option<String>,
        }

        let start = Instant::now();
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .authorize(self.http_client.post(&url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteChatError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SiteChatError::Llm("No response from LLM".to_string()))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(
            "Chat completion from {} in {} ms",
            self.model,
            start.elapsed().as_millis()
        );

        Ok(content.trim().to_string())
    }

    /// Generate embeddings for multiple texts
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            #[serde(default)]
            index: Option<usize>,
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let url = format!("{}/v1/embeddings", self.base_url);
        let response = self
            .authorize(self.http_client.post(&url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteChatError::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let mut embed_response: EmbedResponse = response.json().await?;
        if embed_response.data.len() != texts.len() {
            return Err(SiteChatError::Llm(format!(
                "Embedding service returned {} vectors for {} inputs",
                embed_response.data.len(),
                texts.len()
            )));
        }

        // Servers may answer out of order when `index` is present
        embed_response
            .data
            .sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        Ok(embed_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }

    /// Get model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIClient {
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ];
        self.chat_completion(messages, temperature, max_tokens).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

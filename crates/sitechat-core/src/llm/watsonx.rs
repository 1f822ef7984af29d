//! IBM watsonx.ai chat client
//!
//! Authenticates by exchanging an IBM Cloud API key for an IAM bearer token,
//! which is reused until shortly before it expires.

use super::AnswerGenerator;
use crate::config::{require, GeneratorConfig};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const CHAT_API_VERSION: &str = "2023-05-29";

/// Tokens are refreshed this long before IAM says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// watsonx.ai answer generator
pub struct WatsonxClient {
    http_client: reqwest::Client,
    base_url: String,
    iam_url: String,
    api_key: String,
    project_id: String,
    model: String,
    token: Mutex<Option<CachedToken>>,
}

impl WatsonxClient {
    /// Create from configuration
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let base_url = require(&config.url, "generator.url (SITECHAT_LLM_URL)")?;
        let api_key = require(&config.api_key, "generator.api_key (SITECHAT_LLM_API_KEY)")?;
        let project_id = require(
            &config.project_id,
            "generator.project_id (SITECHAT_WATSONX_PROJECT_ID)",
        )?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SiteChatError::Http)?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            iam_url: config.iam_url.clone(),
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
            model: config.model.clone(),
            token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(ref cached) = *guard {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }

        let response = self
            .http_client
            .post(&self.iam_url)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteChatError::ExternalError(format!(
                "IAM token exchange failed (HTTP {}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);

        tracing::debug!("Obtained IAM token valid for {}s", lifetime.as_secs());
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at,
        });

        Ok(token.access_token)
    }
}

/// Pull the reply text out of a watsonx chat response.
///
/// `content` is either a plain string or a list of typed blocks, of which only
/// `text` blocks are kept.
fn extract_content(body: &Value) -> String {
    let content = &body["choices"][0]["message"]["content"];
    match content {
        Value::String(s) => s.trim().to_string(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl AnswerGenerator for WatsonxClient {
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let token = self.bearer_token().await?;

        let body = json!({
            "project_id": self.project_id,
            "model_id": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": [{"type": "text", "text": user_prompt}]},
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let url = format!(
            "{}/ml/v1/text/chat?version={}",
            self.base_url, CHAT_API_VERSION
        );
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SiteChatError::ExternalError(format!(
                "watsonx chat error (HTTP {}): {}",
                status, text
            )));
        }

        let payload: Value = response.json().await?;
        Ok(extract_content(&payload))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_content() {
        let body = json!({"choices": [{"message": {"content": "  We build AI roadmaps. "}}]});
        assert_eq!(extract_content(&body), "We build AI roadmaps.");
    }

    #[test]
    fn test_extract_block_content_keeps_text_blocks() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "First."},
            {"type": "image_url", "image_url": "ignored"},
            {"type": "text", "text": "Second."}
        ]}}]});
        assert_eq!(extract_content(&body), "First.\nSecond.");
    }

    #[test]
    fn test_extract_missing_choices_is_empty() {
        assert_eq!(extract_content(&json!({"results": []})), "");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = GeneratorConfig {
            url: Some("https://us-south.ml.cloud.ibm.com".to_string()),
            api_key: None,
            project_id: Some("p".to_string()),
            ..GeneratorConfig::default()
        };
        let err = WatsonxClient::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("generator.api_key"));
    }
}

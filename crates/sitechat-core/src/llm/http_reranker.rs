//! HTTP cross-encoder scorer
//!
//! Talks to a text-embeddings-inference style `/rerank` endpoint:
//! `{"query": .., "texts": [..], "raw_scores": true}` answered with
//! `[{"index": i, "score": s}, ..]`, possibly in score order.

use super::RelevanceScorer;
use crate::config::{require, RerankerConfig};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relevance scorer backed by an external cross-encoder service
pub struct HttpReranker {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f64,
}

impl HttpReranker {
    /// Create from configuration
    pub fn from_config(config: &RerankerConfig) -> Result<Self> {
        let url = require(&config.url, "reranker.url (SITECHAT_RERANKER_URL)")?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SiteChatError::Http)?;

        Ok(Self {
            http_client,
            base_url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn score_group(&self, query: &str, texts: &[&str]) -> Result<Vec<f64>> {
        #[derive(Serialize)]
        struct RerankRequest<'a> {
            query: &'a str,
            texts: &'a [&'a str],
            raw_scores: bool,
            truncate: bool,
        }

        let request = RerankRequest {
            query,
            texts,
            raw_scores: true,
            truncate: true,
        };

        let url = format!("{}/rerank", self.base_url);
        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteChatError::ExternalError(format!(
                "Rerank service error (HTTP {}): {}",
                status, body
            )));
        }

        let hits: Vec<RerankHit> = response.json().await?;
        assemble_scores(texts.len(), hits)
    }
}

/// Put index-tagged scores back into input order, rejecting gaps.
fn assemble_scores(expected: usize, hits: Vec<RerankHit>) -> Result<Vec<f64>> {
    let mut scores: Vec<Option<f64>> = vec![None; expected];
    for hit in hits {
        let slot = scores.get_mut(hit.index).ok_or_else(|| {
            SiteChatError::Llm(format!(
                "Rerank index {} out of range for {} texts",
                hit.index, expected
            ))
        })?;
        *slot = Some(hit.score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(idx, s)| {
            s.ok_or_else(|| SiteChatError::Llm(format!("Rerank service skipped text {}", idx)))
        })
        .collect()
}

#[async_trait]
impl RelevanceScorer for HttpReranker {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
        if pairs.is_empty() {
            return Ok(vec![]);
        }

        // The endpoint takes one query per request; group consecutive pairs that
        // share a query (the pipeline always sends a single group).
        let mut scores = Vec::with_capacity(pairs.len());
        let mut start = 0;
        while start < pairs.len() {
            let query = &pairs[start].0;
            let end = pairs[start..]
                .iter()
                .position(|(q, _)| q != query)
                .map(|offset| start + offset)
                .unwrap_or(pairs.len());

            let texts: Vec<&str> = pairs[start..end].iter().map(|(_, t)| t.as_str()).collect();
            scores.extend(self.score_group(query, &texts).await?);
            start = end;
        }

        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

//! Astra DB Data API vector store
//!
//! Issues `find` commands against a vector-enabled collection. Filters are
//! rendered as `{"field": {"$eq": value}}`; ranking uses `sort.$vector`.

use super::{EqualityFilter, StoreDocument, VectorStore, RUN_FIELD, SITE_FIELD};
use crate::config::{require, StoreConfig};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Collection in an Astra DB database
pub struct AstraStore {
    http_client: reqwest::Client,
    collection_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<StoreDocument>,
}

impl AstraStore {
    /// Create from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let endpoint = require(&config.endpoint, "store.endpoint (SITECHAT_ASTRA_ENDPOINT)")?;
        let token = require(&config.token, "store.token (SITECHAT_ASTRA_TOKEN)")?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SiteChatError::Http)?;

        Ok(Self {
            http_client,
            collection_url: format!(
                "{}/api/json/v1/{}/{}",
                endpoint.trim_end_matches('/'),
                config.keyspace,
                config.collection
            ),
            token: token.to_string(),
        })
    }

    async fn find(&self, command: Value) -> Result<Vec<StoreDocument>> {
        let response = self
            .http_client
            .post(&self.collection_url)
            .header("Token", &self.token)
            .json(&command)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SiteChatError::Store(format!(
                "Astra DB error (HTTP {}): {}",
                status, body
            )));
        }

        parse_find_response(&response.text().await?)
    }
}

/// Documents of a `find` reply, or the errors Astra reported
fn parse_find_response(body: &str) -> Result<Vec<StoreDocument>> {
    let body: FindResponse = serde_json::from_str(body)?;
    if !body.errors.is_empty() {
        return Err(SiteChatError::Store(format!(
            "Astra DB rejected find: {}",
            Value::Array(body.errors)
        )));
    }

    Ok(body.data.map(|d| d.documents).unwrap_or_default())
}

fn render_filter(filter: &EqualityFilter) -> Value {
    let mut rendered = Map::new();
    for (field, value) in filter.iter() {
        rendered.insert(field.to_string(), json!({ "$eq": value }));
    }
    Value::Object(rendered)
}

fn projection(include_vector: bool) -> Value {
    let mut fields = json!({
        "url": 1,
        "title": 1,
        "text": 1,
        "chunk_index": 1,
    });
    fields[SITE_FIELD] = json!(1);
    fields[RUN_FIELD] = json!(1);
    if include_vector {
        fields["$vector"] = json!(1);
    }
    fields
}

/// Build a `find` command, vector-sorted when `query_vector` is given
fn find_command(filter: &EqualityFilter, query_vector: Option<&[f32]>, limit: usize) -> Value {
    let mut find = json!({
        "filter": render_filter(filter),
        "projection": projection(query_vector.is_none()),
        "options": { "limit": limit },
    });
    if let Some(vector) = query_vector {
        find["sort"] = json!({ "$vector": vector });
        find["options"]["includeSimilarity"] = json!(true);
    }
    json!({ "find": find })
}

#[async_trait]
impl VectorStore for AstraStore {
    async fn search(
        &self,
        filter: &EqualityFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreDocument>> {
        let docs = self
            .find(find_command(filter, Some(query_vector), limit))
            .await?;
        tracing::debug!("Astra returned {} documents", docs.len());
        Ok(docs)
    }

    async fn sample(&self, filter: &EqualityFilter, limit: usize) -> Result<Vec<StoreDocument>> {
        self.find(find_command(filter, None, limit)).await
    }

    fn name(&self) -> &str {
        "Astra DB"
    }
}

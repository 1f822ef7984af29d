//! Vector store access
//!
//! The pipeline only needs equality filters plus nearest-neighbour ranking,
//! which every backend here supports. No pattern or regex predicates.

mod astra;
mod memory;

pub use astra::AstraStore;
pub use memory::{cosine_similarity, MemoryStore};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored field holding the site/tenant identifier
pub const SITE_FIELD: &str = "site_name";

/// Stored field holding the ingestion run identifier
pub const RUN_FIELD: &str = "run_id";

/// Conjunction of `field == value` predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EqualityFilter {
    predicates: BTreeMap<String, String>,
}

impl EqualityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate (replacing any earlier one on the same field)
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.insert(field.into(), value.into());
        self
    }

    /// Filter for one site and, optionally, one ingestion run
    pub fn for_scope(site_id: &str, run_id: Option<&str>) -> Self {
        let filter = Self::new().eq(SITE_FIELD, site_id);
        match run_id {
            Some(run) => filter.eq(RUN_FIELD, run),
            None => filter,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.predicates.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// A stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    #[serde(alias = "site_name")]
    pub site_id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    pub chunk_index: u32,
    pub text: String,
    #[serde(alias = "$vector")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Value of a filterable field, by stored field name
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            SITE_FIELD | "site_id" => Some(&self.site_id),
            RUN_FIELD => self.run_id.as_deref(),
            "url" => Some(&self.url),
            "title" => self.title.as_deref(),
            _ => None,
        }
    }

    pub fn matches(&self, filter: &EqualityFilter) -> bool {
        filter
            .iter()
            .all(|(field, value)| self.field(field) == Some(value))
    }
}

/// Document returned by a store query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(rename = "$similarity", default)]
    pub similarity: f64,
    #[serde(rename = "site_name", default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    /// Only populated by [`VectorStore::sample`]
    #[serde(rename = "$vector", default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Nearest-neighbour search over stored chunks
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `limit` documents matching `filter`, most similar first
    async fn search(
        &self,
        filter: &EqualityFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreDocument>>;

    /// Arbitrary documents matching `filter`, with their vectors
    async fn sample(&self, filter: &EqualityFilter, limit: usize) -> Result<Vec<StoreDocument>>;

    /// Display name, e.g. "Astra DB"
    fn name(&self) -> &str;
}

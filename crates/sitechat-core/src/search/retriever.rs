//! Vector retrieval stage

use super::{Candidate, QueryContext};
use crate::error::{Result, SiteChatError};
use crate::llm::Embedder;
use crate::store::{EqualityFilter, VectorStore};
use std::sync::Arc;

/// Embeds the question and fetches the nearest chunks in scope
pub struct CandidateRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl CandidateRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Up to `top_k` candidates for the question, most similar first.
    ///
    /// Only chunks of `ctx.site_id` (and `ctx.run_id`, when set) are
    /// considered. A query vector of the wrong length is a configuration
    /// error, never an empty result.
    pub async fn vector_search(&self, ctx: &QueryContext, top_k: usize) -> Result<Vec<Candidate>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(&ctx.question).await?;
        let expected = self.embedder.dimensions();
        if query_vector.len() != expected {
            return Err(SiteChatError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        let filter = EqualityFilter::for_scope(&ctx.site_id, ctx.run_id.as_deref());
        let docs = self.store.search(&filter, &query_vector, top_k).await?;

        let mut candidates: Vec<Candidate> = docs
            .into_iter()
            .map(|doc| Candidate::from_document(doc, ctx))
            .collect();
        candidates.truncate(top_k);

        tracing::debug!(
            "Retrieved {} candidates from {} for site {}",
            candidates.len(),
            self.store.name(),
            ctx.site_id
        );
        Ok(candidates)
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

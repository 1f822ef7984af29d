//! On-demand scorer construction
//!
//! The relevance model is only needed once a query gets past retrieval, so it
//! is built on first use. Concurrent first callers wait on the same
//! initialisation instead of building twice.

use super::RelevanceScorer;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

type ScorerFactory = dyn Fn() -> Result<Arc<dyn RelevanceScorer>> + Send + Sync;

/// Relevance scorer initialised once, on first use
pub struct LazyScorer {
    model: String,
    cell: OnceCell<Arc<dyn RelevanceScorer>>,
    factory: Box<ScorerFactory>,
}

impl LazyScorer {
    /// Wrap a scorer factory. `model` is reported before initialisation.
    pub fn new<F>(model: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RelevanceScorer>> + Send + Sync + 'static,
    {
        Self {
            model: model.into(),
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Get the scorer, building it if needed.
    ///
    /// A failed build is not cached; the next call tries again.
    pub async fn get(&self) -> Result<&Arc<dyn RelevanceScorer>> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!("Initializing relevance scorer {}", self.model);
                (self.factory)()
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl RelevanceScorer for LazyScorer {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
        self.get().await?.score(pairs).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

//! Provider bundle handed to the pipeline
//!
//! Every external dependency of a query (embedding model, vector store,
//! relevance model, answer generator) is built here once and shared through
//! `Arc`. Nothing downstream reads configuration or the environment.

use crate::config::{Config, GeneratorConfig, GeneratorKind, RerankerConfig, StoreConfig, StoreKind};
use crate::error::{Result, SiteChatError};
use crate::llm::{
    AnswerGenerator, Embedder, HttpEmbedder, HttpReranker, LazyScorer, OpenAIClient,
    RelevanceScorer, WatsonxClient,
};
use crate::store::{AstraStore, MemoryStore, VectorStore};
use std::sync::Arc;

/// External services used by [`crate::search::RetrievalPipeline`]
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub scorer: Arc<dyn RelevanceScorer>,
    /// `None` for retrieval-only use, where no answer is generated
    pub generator: Option<Arc<dyn AnswerGenerator>>,
}

impl Providers {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        scorer: Arc<dyn RelevanceScorer>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            embedder,
            store,
            scorer,
            generator: Some(generator),
        }
    }

    /// Providers that can retrieve and rank, but not answer
    pub fn retrieval_only(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Self {
        Self {
            embedder,
            store,
            scorer,
            generator: None,
        }
    }

    /// Build every provider from configuration.
    ///
    /// Fails fast on missing endpoints or credentials. The relevance model is
    /// the exception: it is only built on first use, and if that fails the
    /// query falls back to keyword ranking.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_config(&config.embedding)?);
        let store = build_store(&config.store)?;
        let scorer = build_scorer(&config.reranker);
        let generator = build_generator(&config.generator)?;

        tracing::info!(
            "Providers ready: embedder={} store={} scorer={} generator={}",
            embedder.model_name(),
            store.name(),
            scorer.model_name(),
            generator.model_name()
        );

        Ok(Self::new(embedder, store, scorer, generator))
    }

    /// Build the retrieval providers only.
    ///
    /// Generator settings are neither checked nor used.
    pub fn retrieval_from_config(config: &Config) -> Result<Self> {
        config.validate_retrieval()?;

        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_config(&config.embedding)?);
        let store = build_store(&config.store)?;
        let scorer = build_scorer(&config.reranker);

        tracing::info!(
            "Retrieval providers ready: embedder={} store={} scorer={}",
            embedder.model_name(),
            store.name(),
            scorer.model_name()
        );

        Ok(Self::retrieval_only(embedder, store, scorer))
    }
}

/// Vector store for the configured backend
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.kind {
        StoreKind::Astra => Ok(Arc::new(AstraStore::from_config(config)?)),
        StoreKind::Memory => {
            let path = config.chunks_path.as_deref().ok_or_else(|| {
                SiteChatError::Config(
                    "missing store.chunks_path (SITECHAT_CHUNKS_PATH)".to_string(),
                )
            })?;
            Ok(Arc::new(MemoryStore::from_jsonl(path)?))
        }
    }
}

pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider {
        GeneratorKind::OpenAi => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        GeneratorKind::Watsonx => Ok(Arc::new(WatsonxClient::from_config(config)?)),
    }
}

/// Lazily built HTTP relevance scorer
pub fn build_scorer(config: &RerankerConfig) -> Arc<dyn RelevanceScorer> {
    let config = config.clone();
    Arc::new(LazyScorer::new(config.model.clone(), move || {
        Ok(Arc::new(HttpReranker::from_config(&config)?) as Arc<dyn RelevanceScorer>)
    }))
}

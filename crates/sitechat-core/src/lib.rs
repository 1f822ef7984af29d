//! SiteChat Core Library
//!
//! Question answering over a crawled website's chunks.
//!
//! # Features
//! - Vector retrieval scoped to one site and ingestion run
//! - Client-side keyword gate with safe pass-through
//! - Cross-encoder re-ranking under a latency budget, with a deterministic
//!   keyword fallback
//! - Grounded answers from OpenAI-compatible or watsonx chat models

pub mod config;
pub mod error;
pub mod llm;
pub mod providers;
pub mod search;
pub mod store;

pub use config::{Config, RetrievalConfig};
pub use error::{Error, Result, SiteChatError};
pub use llm::{AnswerGenerator, Embedder, RelevanceScorer};
pub use providers::Providers;
pub use search::{
    extract_terms, keyword_gate, AnswerResult, Candidate, QueryContext, RankedCandidate,
    RankingPath, Retrieval, RetrievalPipeline,
};
pub use store::{Chunk, EqualityFilter, StoreDocument, VectorStore};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "sitechat";

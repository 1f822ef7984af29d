//! Model provider integration
//!
//! Provides traits and HTTP implementations for:
//! - Query embedding via OpenAI-compatible services
//! - Cross-encoder relevance scoring
//! - Answer generation (OpenAI-compatible chat, IBM watsonx)

mod cache;
mod client;
mod http_embedder;
mod http_reranker;
mod lazy;
mod traits;
mod watsonx;

pub use cache::{embedding_cache_key, EmbeddingCache};
pub use client::{ChatMessage, OpenAIClient};
pub use http_embedder::HttpEmbedder;
pub use http_reranker::HttpReranker;
pub use lazy::LazyScorer;
pub use traits::*;
pub use watsonx::WatsonxClient;

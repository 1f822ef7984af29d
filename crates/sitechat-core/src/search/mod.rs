//! Retrieval-and-rerank pipeline
//!
//! question → terms → candidates → gated candidates → ranked candidates →
//! top-N → answer. Each stage lives in its own module; [`RetrievalPipeline`]
//! wires them together.

mod gate;
mod pipeline;
mod rerank;
mod retriever;
mod synthesizer;
mod terms;

pub use gate::{keyword_gate, REQUIRE_ALL_MIN_TERMS};
pub use pipeline::{AnswerResult, PipelineStage, Retrieval, RetrievalPipeline};
pub use rerank::{
    fallback_order, keyword_overlap_score, FallbackReason, Ranking, RankingPath, Reranker,
};
pub use retriever::CandidateRetriever;
pub use synthesizer::{
    build_context, system_prompt, user_prompt, AnswerSynthesizer, NO_CONTENT_PLACEHOLDER,
};
pub use terms::{extract_terms, MAX_TERMS, STOP_WORDS};

use crate::store::StoreDocument;
use serde::Serialize;
use std::ops::Deref;

/// Inputs for one retrieval call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub question: String,
    pub site_id: String,
    pub run_id: Option<String>,
}

impl QueryContext {
    pub fn new(question: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            site_id: site_id.into(),
            run_id: None,
        }
    }

    /// Restrict retrieval to one ingestion run
    pub fn with_run(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }
}

/// A retrieved chunk with its vector similarity to the question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub site_id: String,
    pub url: String,
    pub title: Option<String>,
    pub run_id: Option<String>,
    pub chunk_index: u32,
    pub text: String,
    pub similarity: f64,
}

impl Candidate {
    /// Convert a store hit, filling scope fields the store did not project
    pub fn from_document(doc: StoreDocument, ctx: &QueryContext) -> Self {
        Self {
            site_id: doc.site_id.unwrap_or_else(|| ctx.site_id.clone()),
            url: doc.url,
            title: doc.title,
            run_id: doc.run_id.or_else(|| ctx.run_id.clone()),
            chunk_index: doc.chunk_index,
            text: doc.text,
            similarity: doc.similarity,
        }
    }
}

/// A candidate after re-ranking.
///
/// `rerank_score` is `None` when the keyword fallback produced the order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub rerank_score: Option<f64>,
}

impl Deref for RankedCandidate {
    type Target = Candidate;

    fn deref(&self) -> &Candidate {
        &self.candidate
    }
}

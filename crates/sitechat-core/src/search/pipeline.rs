//! Query orchestration
//!
//! Runs one question through the stages in order:
//!
//! ```text
//! Start → TermsExtracted → CandidatesFetched ─┬─ (none) → EarlyExit
//!                                             └─ Gated → Ranked → Answered
//! ```
//!
//! Stages are awaited one after another. The pipeline holds no per-query
//! state, so one instance can serve concurrent queries.

use super::{
    extract_terms, keyword_gate, AnswerSynthesizer, Candidate, CandidateRetriever, QueryContext,
    RankedCandidate, RankingPath, Reranker,
};
use crate::config::RetrievalConfig;
use crate::error::{Result, SiteChatError};
use crate::providers::Providers;
use serde::Serialize;
use std::fmt;

/// Pipeline state, reported in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    TermsExtracted,
    CandidatesFetched,
    EarlyExit,
    Gated,
    Ranked,
    Answered,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::TermsExtracted => "terms_extracted",
            Self::CandidatesFetched => "candidates_fetched",
            Self::EarlyExit => "early_exit",
            Self::Gated => "gated",
            Self::Ranked => "ranked",
            Self::Answered => "answered",
        };
        f.write_str(name)
    }
}

/// Everything known about a query before answer generation
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub terms: Vec<String>,
    /// Candidates returned by the vector store
    pub fetched: usize,
    /// Candidates left after the keyword gate
    pub gated: usize,
    /// Top `final_k`, best first
    pub ranked: Vec<RankedCandidate>,
    pub path: RankingPath,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.fetched == 0
    }
}

/// Final result of a question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<RankedCandidate>,
}

/// Retrieval, keyword gate, re-ranking and answer generation
pub struct RetrievalPipeline {
    retriever: CandidateRetriever,
    reranker: Reranker,
    synthesizer: Option<AnswerSynthesizer>,
    candidate_k: usize,
    final_k: usize,
}

impl RetrievalPipeline {
    pub fn new(providers: Providers, config: &RetrievalConfig) -> Self {
        Self {
            retriever: CandidateRetriever::new(providers.embedder, providers.store),
            reranker: Reranker::new(
                providers.scorer,
                config.rerank_budget(),
                config.rerank_text_chars,
            ),
            synthesizer: providers.generator.map(|generator| {
                AnswerSynthesizer::new(generator, config.temperature, config.max_tokens)
            }),
            candidate_k: config.candidate_k,
            final_k: config.final_k,
        }
    }

    /// Display name of the backing store
    pub fn store_name(&self) -> &str {
        self.retriever.store().name()
    }

    /// Run every stage up to and including re-ranking
    pub async fn retrieve(&self, ctx: &QueryContext) -> Result<Retrieval> {
        trace_stage(PipelineStage::Start, ctx);

        let terms = extract_terms(&ctx.question);
        tracing::debug!(stage = %PipelineStage::TermsExtracted, "Query terms: {:?}", terms);

        let candidates: Vec<Candidate> = self.retriever.vector_search(ctx, self.candidate_k).await?;
        let fetched = candidates.len();
        tracing::debug!(stage = %PipelineStage::CandidatesFetched, "{} candidates", fetched);

        if candidates.is_empty() {
            tracing::info!(
                stage = %PipelineStage::EarlyExit,
                "No candidates in {} for site {}",
                self.store_name(),
                ctx.site_id
            );
            return Ok(Retrieval {
                terms,
                fetched: 0,
                gated: 0,
                ranked: Vec::new(),
                path: RankingPath::Empty,
            });
        }

        let gated = keyword_gate(candidates, &terms);
        let gated_len = gated.len();
        tracing::debug!(stage = %PipelineStage::Gated, "{} of {} candidates kept", gated_len, fetched);

        let mut ranking = self.reranker.rerank(&ctx.question, gated, &terms).await;
        ranking.ranked.truncate(self.final_k);
        tracing::debug!(stage = %PipelineStage::Ranked, "Top {} via {:?}", ranking.ranked.len(), ranking.path);

        Ok(Retrieval {
            terms,
            fetched,
            gated: gated_len,
            ranked: ranking.ranked,
            path: ranking.path,
        })
    }

    /// Answer a question with sources.
    ///
    /// When nothing is retrieved the answer is `No results in <store>.` with
    /// no sources, and neither the relevance model nor the generator is
    /// called. A pipeline built without a generator fails with a
    /// configuration error before retrieving anything.
    pub async fn retrieve_and_answer(&self, ctx: &QueryContext) -> Result<AnswerResult> {
        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            SiteChatError::Config("no answer generator configured".to_string())
        })?;

        let retrieval = self.retrieve(ctx).await?;
        if retrieval.is_empty() {
            return Ok(AnswerResult {
                answer: format!("No results in {}.", self.store_name()),
                sources: Vec::new(),
            });
        }

        let answer = synthesizer.synthesize(ctx, &retrieval.ranked).await?;
        tracing::debug!(stage = %PipelineStage::Answered, "{} chars", answer.len());

        Ok(AnswerResult {
            answer,
            sources: retrieval.ranked,
        })
    }
}

fn trace_stage(stage: PipelineStage, ctx: &QueryContext) {
    tracing::debug!(
        stage = %stage,
        site = %ctx.site_id,
        run = ?ctx.run_id,
        "Question: {}",
        ctx.question
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::EarlyExit.to_string(), "early_exit");
        assert_eq!(PipelineStage::CandidatesFetched.to_string(), "candidates_fetched");
    }

    #[test]
    fn test_answer_result_serializes() {
        let result = AnswerResult {
            answer: "No results in Astra DB.".to_string(),
            sources: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["answer"], "No results in Astra DB.");
        assert_eq!(json["sources"].as_array().map(Vec::len), Some(0));
    }
}

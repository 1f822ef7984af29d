//! Cross-encoder re-ranking with a deterministic fallback
//!
//! The relevance model is trusted only when it answers within budget. The
//! budget is checked after the call returns: the call itself is never
//! interrupted, so a slow model still costs its full latency, but its scores
//! are then discarded wholesale in favour of the keyword ordering.

use super::{Candidate, RankedCandidate};
use crate::llm::RelevanceScorer;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Score added per literal hit of a multi-word phrase
const PHRASE_WEIGHT: f64 = 2.0;

/// Score added per whole-word hit of a single-word term
const WORD_WEIGHT: f64 = 1.0;

/// Why the model scores were not used
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Model answered but took longer than the budget
    OverBudget { elapsed: Duration, budget: Duration },
    /// Model call failed
    ScorerFailed(String),
    /// Model returned the wrong number of scores
    ScoreCountMismatch { expected: usize, actual: usize },
    /// Model returned NaN or infinity
    NonFiniteScore,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverBudget { elapsed, budget } => write!(
                f,
                "exceeded budget: {} ms > {} ms",
                elapsed.as_millis(),
                budget.as_millis()
            ),
            Self::ScorerFailed(err) => write!(f, "scorer failed: {}", err),
            Self::ScoreCountMismatch { expected, actual } => {
                write!(f, "expected {} scores, got {}", expected, actual)
            }
            Self::NonFiniteScore => write!(f, "non-finite score"),
        }
    }
}

/// Which scorer produced a ranking
#[derive(Debug, Clone, PartialEq)]
pub enum RankingPath {
    /// Nothing to rank
    Empty,
    /// Relevance model scores
    Model,
    /// Keyword overlap, ties broken by vector similarity
    Fallback(FallbackReason),
}

impl RankingPath {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Output of [`Reranker::rerank`]
#[derive(Debug, Clone)]
pub struct Ranking {
    pub ranked: Vec<RankedCandidate>,
    pub path: RankingPath,
}

/// Re-ranking stage
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
    budget: Duration,
    text_chars: usize,
}

impl Reranker {
    /// `text_chars` bounds the passage sent per candidate; `budget` bounds how
    /// long the model may take for its answer to be trusted.
    pub fn new(scorer: Arc<dyn RelevanceScorer>, budget: Duration, text_chars: usize) -> Self {
        Self {
            scorer,
            budget,
            text_chars,
        }
    }

    /// Order `candidates` by relevance to `question`, most relevant first.
    ///
    /// Never fails: any problem with the model yields the fallback ordering.
    pub async fn rerank(
        &self,
        question: &str,
        candidates: Vec<Candidate>,
        terms: &[String],
    ) -> Ranking {
        if candidates.is_empty() {
            return Ranking {
                ranked: Vec::new(),
                path: RankingPath::Empty,
            };
        }

        let pairs: Vec<(String, String)> = candidates
            .iter()
            .map(|c| {
                (
                    question.to_string(),
                    truncate_chars(&c.text, self.text_chars).to_string(),
                )
            })
            .collect();

        let start = Instant::now();
        let result = self.scorer.score(&pairs).await;
        let elapsed = start.elapsed();

        let reason = match result {
            Err(e) => {
                if e.is_config_error() {
                    tracing::debug!("Relevance model unavailable: {}", e);
                } else {
                    tracing::warn!("Relevance model failed: {}", e);
                }
                FallbackReason::ScorerFailed(e.to_string())
            }
            Ok(scores) if scores.len() != candidates.len() => FallbackReason::ScoreCountMismatch {
                expected: candidates.len(),
                actual: scores.len(),
            },
            Ok(_) if elapsed > self.budget => FallbackReason::OverBudget {
                elapsed,
                budget: self.budget,
            },
            Ok(scores) if scores.iter().any(|s| !s.is_finite()) => FallbackReason::NonFiniteScore,
            Ok(scores) => {
                tracing::debug!(
                    "Re-ranked {} candidates with {} in {} ms",
                    candidates.len(),
                    self.scorer.model_name(),
                    elapsed.as_millis()
                );
                return Ranking {
                    ranked: model_order(candidates, scores),
                    path: RankingPath::Model,
                };
            }
        };

        tracing::debug!("Using keyword fallback ranking ({})", reason);
        Ranking {
            ranked: fallback_order(candidates, terms),
            path: RankingPath::Fallback(reason),
        }
    }
}

fn model_order(candidates: Vec<Candidate>, scores: Vec<f64>) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, score)| RankedCandidate {
            candidate,
            rerank_score: Some(score),
        })
        .collect();

    ranked.sort_by(|a, b| {
        let a = a.rerank_score.unwrap_or(f64::NEG_INFINITY);
        let b = b.rerank_score.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    ranked
}

/// Deterministic ordering by `(keyword_overlap_score, similarity)`, descending.
///
/// The sort is stable, so candidates tied on both keys keep their input order.
pub fn fallback_order(candidates: Vec<Candidate>, terms: &[String]) -> Vec<RankedCandidate> {
    let matchers = TermMatcher::compile(terms);

    let mut scored: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .map(|c| (overlap_score(&matchers, &c.text), c))
        .collect();

    scored.sort_by(|(kw_a, a), (kw_b, b)| {
        kw_b.total_cmp(kw_a)
            .then_with(|| b.similarity.total_cmp(&a.similarity))
    });

    scored
        .into_iter()
        .map(|(_, candidate)| RankedCandidate {
            candidate,
            rerank_score: None,
        })
        .collect()
}

/// Keyword overlap between query terms and a passage.
///
/// Phrase terms (containing a space) add 2.0 when they occur literally;
/// single words add 1.0 when they occur as a whole word.
pub fn keyword_overlap_score(terms: &[String], text: &str) -> f64 {
    overlap_score(&TermMatcher::compile(terms), text)
}

fn overlap_score(matchers: &[TermMatcher], text: &str) -> f64 {
    if matchers.is_empty() || text.is_empty() {
        return 0.0;
    }

    let text = text.to_lowercase();
    matchers
        .iter()
        .filter(|m| m.is_match(&text))
        .map(|m| m.weight())
        .sum()
}

enum TermMatcher {
    Phrase(String),
    Word(Regex),
}

impl TermMatcher {
    fn compile(terms: &[String]) -> Vec<Self> {
        terms
            .iter()
            .filter_map(|term| {
                let term = term.to_lowercase();
                if term.contains(' ') {
                    Some(Self::Phrase(term))
                } else {
                    Regex::new(&format!(r"\b{}\b", regex::escape(&term)))
                        .ok()
                        .map(Self::Word)
                }
            })
            .collect()
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Phrase(phrase) => text.contains(phrase.as_str()),
            Self::Word(re) => re.is_match(text),
        }
    }

    fn weight(&self) -> f64 {
        match self {
            Self::Phrase(_) => PHRASE_WEIGHT,
            Self::Word(_) => WORD_WEIGHT,
        }
    }
}

/// First `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SiteChatError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn candidate(idx: u32, text: &str, similarity: f64) -> Candidate {
        Candidate {
            site_id: "example.com".to_string(),
            url: format!("https://example.com/{}", idx),
            title: None,
            run_id: None,
            chunk_index: idx,
            text: text.to_string(),
            similarity,
        }
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn order(ranked: &[RankedCandidate]) -> Vec<u32> {
        ranked.iter().map(|r| r.chunk_index).collect()
    }

    enum Behavior {
        Scores(Vec<f64>),
        Fail,
        Slow(Vec<f64>, Duration),
    }

    struct StubScorer {
        behavior: Behavior,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl StubScorer {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RelevanceScorer for StubScorer {
        async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().extend(pairs.iter().cloned());
            match &self.behavior {
                Behavior::Scores(s) => Ok(s.clone()),
                Behavior::Fail => Err(SiteChatError::ExternalError("model crashed".into())),
                Behavior::Slow(s, delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(s.clone())
                }
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn test_overlap_phrase_and_word_weights() {
        let text = "We offer Machine Learning consulting and data engineering.";
        let score = keyword_overlap_score(&terms(&["machine learning", "data", "cloud"]), text);
        assert_eq!(score, 3.0);
    }

    #[test]
    fn test_overlap_words_need_word_boundaries() {
        assert_eq!(keyword_overlap_score(&terms(&["data"]), "database design"), 0.0);
        assert_eq!(keyword_overlap_score(&terms(&["data"]), "big-data platforms"), 1.0);
    }

    #[test]
    fn test_overlap_phrase_is_plain_substring() {
        assert_eq!(
            keyword_overlap_score(&terms(&["ai road"]), "our ai roadmapping offer"),
            2.0
        );
    }

    #[test]
    fn test_overlap_empty_inputs() {
        assert_eq!(keyword_overlap_score(&[], "anything"), 0.0);
        assert_eq!(keyword_overlap_score(&terms(&["x"]), ""), 0.0);
    }

    #[test]
    fn test_fallback_keyword_score_beats_similarity() {
        // A: kw=2.0 sim=0.5, B: kw=1.0 sim=0.9
        let a = candidate(0, "our cloud migration practice", 0.5);
        let b = candidate(1, "cloud only", 0.9);
        let ranked = fallback_order(vec![b, a], &terms(&["cloud", "migration"]));
        assert_eq!(order(&ranked), vec![0, 1]);
        assert!(ranked.iter().all(|r| r.rerank_score.is_none()));
    }

    #[test]
    fn test_fallback_similarity_breaks_ties() {
        let ranked = fallback_order(
            vec![
                candidate(0, "pricing", 0.2),
                candidate(1, "pricing", 0.8),
                candidate(2, "unrelated", 0.99),
            ],
            &terms(&["pricing"]),
        );
        assert_eq!(order(&ranked), vec![1, 0, 2]);
    }

    #[test]
    fn test_fallback_full_ties_keep_input_order() {
        let ranked = fallback_order(
            vec![candidate(3, "x", 0.5), candidate(1, "y", 0.5), candidate(2, "z", 0.5)],
            &terms(&["absent"]),
        );
        assert_eq!(order(&ranked), vec![3, 1, 2]);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_empty_input_skips_scorer() {
        let scorer = StubScorer::new(Behavior::Scores(vec![]));
        let reranker = Reranker::new(scorer.clone(), Duration::from_millis(300), 1200);
        let ranking = reranker.rerank("q", vec![], &terms(&["a"])).await;
        assert!(ranking.ranked.is_empty());
        assert_eq!(ranking.path, RankingPath::Empty);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_scores_order_descending() {
        let scorer = StubScorer::new(Behavior::Scores(vec![0.1, 0.9, 0.5]));
        let reranker = Reranker::new(scorer, Duration::from_secs(5), 1200);
        let ranking = reranker
            .rerank(
                "q",
                vec![candidate(0, "a", 0.0), candidate(1, "b", 0.0), candidate(2, "c", 0.0)],
                &[],
            )
            .await;
        assert_eq!(ranking.path, RankingPath::Model);
        assert_eq!(order(&ranking.ranked), vec![1, 2, 0]);
        assert_eq!(ranking.ranked[0].rerank_score, Some(0.9));
    }

    #[tokio::test]
    async fn test_pairs_are_truncated() {
        let scorer = StubScorer::new(Behavior::Scores(vec![1.0]));
        let reranker = Reranker::new(scorer.clone(), Duration::from_secs(5), 4);
        reranker
            .rerank("question", vec![candidate(0, "abcdefgh", 0.0)], &[])
            .await;
        let seen = scorer.seen.lock().unwrap();
        assert_eq!(seen[0], ("question".to_string(), "abcd".to_string()));
    }

    #[tokio::test]
    async fn test_failing_scorer_uses_exact_fallback_order() {
        let candidates = vec![
            candidate(0, "nothing relevant", 0.95),
            candidate(1, "AI roadmapping for banks", 0.40),
            candidate(2, "roadmapping", 0.60),
            candidate(3, "AI roadmapping workshop", 0.70),
        ];
        let t = terms(&["ai roadmapping", "banks"]);
        let expected = fallback_order(candidates.clone(), &t);

        let reranker = Reranker::new(
            StubScorer::new(Behavior::Fail),
            Duration::from_millis(300),
            1200,
        );
        let ranking = reranker.rerank("q", candidates, &t).await;

        assert!(ranking.path.is_fallback());
        assert_eq!(ranking.ranked, expected);
        assert_eq!(order(&ranking.ranked), vec![1, 3, 0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_scorer_results_are_discarded() {
        let scorer = StubScorer::new(Behavior::Slow(
            vec![0.0, 100.0],
            Duration::from_millis(500),
        ));
        let reranker = Reranker::new(scorer, Duration::from_millis(300), 1200);
        let ranking = reranker
            .rerank(
                "q",
                vec![candidate(0, "pricing plans", 0.1), candidate(1, "about us", 0.9)],
                &terms(&["pricing"]),
            )
            .await;

        assert!(matches!(
            ranking.path,
            RankingPath::Fallback(FallbackReason::OverBudget { .. })
        ));
        assert_eq!(order(&ranking.ranked), vec![0, 1]);
        assert!(ranking.ranked.iter().all(|r| r.rerank_score.is_none()));
    }

    #[tokio::test]
    async fn test_wrong_score_count_falls_back() {
        let scorer = StubScorer::new(Behavior::Scores(vec![1.0]));
        let reranker = Reranker::new(scorer, Duration::from_secs(5), 1200);
        let ranking = reranker
            .rerank("q", vec![candidate(0, "a", 0.1), candidate(1, "b", 0.9)], &[])
            .await;
        assert_eq!(
            ranking.path,
            RankingPath::Fallback(FallbackReason::ScoreCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(order(&ranking.ranked), vec![1, 0]);
    }

    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Re-rank one candidate with `scorer`, capturing log lines at INFO and above
    fn rerank_capturing_logs(scorer: Arc<dyn RelevanceScorer>) -> (RankingPath, String) {
        let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || LogSink(sink.clone()))
            .finish();

        let path = tracing::subscriber::with_default(subscriber, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                Reranker::new(scorer, Duration::from_secs(5), 1200)
                    .rerank("q", vec![candidate(0, "pricing", 0.5)], &terms(&["pricing"]))
                    .await
                    .path
            })
        });

        let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        (path, logs)
    }

    struct Unconfigured;

    #[async_trait]
    impl RelevanceScorer for Unconfigured {
        async fn score(&self, _pairs: &[(String, String)]) -> Result<Vec<f64>> {
            Err(SiteChatError::Config("missing reranker.url".into()))
        }

        fn model_name(&self) -> &str {
            "unconfigured"
        }
    }

    #[test]
    fn test_unconfigured_scorer_fallback_is_quiet() {
        let (path, logs) = rerank_capturing_logs(Arc::new(Unconfigured));
        assert!(path.is_fallback());
        assert_eq!(logs, "");
    }

    #[test]
    fn test_scorer_failure_warns_once() {
        let (path, logs) = rerank_capturing_logs(StubScorer::new(Behavior::Fail));
        assert!(path.is_fallback());
        assert_eq!(logs.matches("Relevance model failed").count(), 1);
        assert!(logs.contains("WARN"));
        assert!(!logs.contains("keyword fallback"));
    }

    #[tokio::test]
    async fn test_nan_score_falls_back() {
        let scorer = StubScorer::new(Behavior::Scores(vec![f64::NAN, 1.0]));
        let reranker = Reranker::new(scorer, Duration::from_secs(5), 1200);
        let ranking = reranker
            .rerank("q", vec![candidate(0, "a", 0.1), candidate(1, "b", 0.9)], &[])
            .await;
        assert_eq!(ranking.path, RankingPath::Fallback(FallbackReason::NonFiniteScore));
    }
}

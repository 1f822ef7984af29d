//! Terminal output formatter

use super::Inspection;
use sitechat_core::{AnswerResult, RankedCandidate, RankingPath, Retrieval};

/// `url  (vec=…, ce=…)`, with `ce` only for model-ranked sources
pub fn format_source(source: &RankedCandidate) -> String {
    match source.rerank_score {
        Some(ce) => format!("{}  (vec={:.4}, ce={:.4})", source.url, source.similarity, ce),
        None => format!("{}  (vec={:.4})", source.url, source.similarity),
    }
}

pub fn format_answer(result: &AnswerResult) -> String {
    let mut output = String::new();
    output.push_str("\n--- Answer ---\n");
    output.push_str(&result.answer);
    output.push('\n');

    if !result.sources.is_empty() {
        output.push_str("\n--- Sources ---\n");
        for source in &result.sources {
            output.push_str(&format_source(source));
            output.push('\n');
        }
    }
    output
}

pub fn format_retrieval(retrieval: &Retrieval, store: &str) -> String {
    if retrieval.is_empty() {
        return format!("No results in {}.\n", store);
    }

    let ranking = match &retrieval.path {
        RankingPath::Model => "model".to_string(),
        RankingPath::Fallback(reason) => format!("keyword fallback ({})", reason),
        RankingPath::Empty => "none".to_string(),
    };

    let mut output = format!(
        "terms: {}\ncandidates: {} fetched, {} after keyword gate\nranking: {}\n\n",
        retrieval.terms.join(", "),
        retrieval.fetched,
        retrieval.gated,
        ranking
    );
    for (i, source) in retrieval.ranked.iter().enumerate() {
        output.push_str(&format!("{:>2}. {}\n", i + 1, format_source(source)));
    }
    output
}

pub fn format_terms(terms: &[String]) -> String {
    terms.iter().map(|t| format!("{}\n", t)).collect()
}

pub fn format_inspection(inspection: &Inspection) -> String {
    let mut output = format!(
        "{} | site_name={}{}\n",
        inspection.store,
        inspection.site_id,
        inspection
            .run_id
            .as_deref()
            .map(|r| format!(" | run_id={}", r))
            .unwrap_or_default()
    );

    if inspection.documents.is_empty() {
        output.push_str("No documents found.\n");
        return output;
    }

    for doc in &inspection.documents {
        let len = doc
            .vector
            .as_ref()
            .map(|v| v.len().to_string())
            .unwrap_or_else(|| "none".to_string());
        output.push_str(&format!("#{:<3} {}  (vector length: {})\n", doc.chunk_index, doc.url, len));
    }

    let mismatched = inspection.mismatched();
    if mismatched.is_empty() {
        output.push_str(&format!(
            "Vector lengths match embedding.dimensions ({}).\n",
            inspection.expected_dimensions
        ));
    } else {
        output.push_str(&format!(
            "{} of {} sampled vectors differ from embedding.dimensions ({}).\n",
            mismatched.len(),
            inspection.documents.len(),
            inspection.expected_dimensions
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitechat_core::Candidate;

    fn source(url: &str, similarity: f64, rerank_score: Option<f64>) -> RankedCandidate {
        RankedCandidate {
            candidate: Candidate {
                site_id: "acme.io".to_string(),
                url: url.to_string(),
                title: None,
                run_id: None,
                chunk_index: 0,
                text: String::new(),
                similarity,
            },
            rerank_score,
        }
    }

    #[test]
    fn test_source_line_with_and_without_model_score() {
        assert_eq!(
            format_source(&source("https://acme.io/a", 0.81234, Some(4.5))),
            "https://acme.io/a  (vec=0.8123, ce=4.5000)"
        );
        assert_eq!(
            format_source(&source("https://acme.io/b", 0.5, None)),
            "https://acme.io/b  (vec=0.5000)"
        );
    }

    #[test]
    fn test_answer_without_sources() {
        let out = format_answer(&AnswerResult {
            answer: "No results in Astra DB.".to_string(),
            sources: vec![],
        });
        assert!(out.contains("No results in Astra DB."));
        assert!(!out.contains("Sources"));
    }
}

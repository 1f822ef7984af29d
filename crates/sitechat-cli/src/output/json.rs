//! JSON output formatter

use super::Inspection;
use sitechat_core::{AnswerResult, RankingPath, Retrieval};

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_answer(result: &AnswerResult) -> String {
    pretty(&serde_json::to_value(result).unwrap_or_default())
}

pub fn format_retrieval(retrieval: &Retrieval) -> String {
    let (ranking, fallback_reason) = match &retrieval.path {
        RankingPath::Model => ("model", None),
        RankingPath::Fallback(reason) => ("fallback", Some(reason.to_string())),
        RankingPath::Empty => ("none", None),
    };

    pretty(&serde_json::json!({
        "terms": retrieval.terms,
        "fetched": retrieval.fetched,
        "gated": retrieval.gated,
        "ranking": ranking,
        "fallback_reason": fallback_reason,
        "sources": retrieval.ranked,
    }))
}

pub fn format_terms(terms: &[String]) -> String {
    pretty(&serde_json::json!(terms))
}

pub fn format_inspection(inspection: &Inspection) -> String {
    let documents: Vec<serde_json::Value> = inspection
        .documents
        .iter()
        .map(|d| {
            serde_json::json!({
                "url": d.url,
                "title": d.title,
                "chunk_index": d.chunk_index,
                "run_id": d.run_id,
                "vector_length": d.vector.as_ref().map(Vec::len),
            })
        })
        .collect();

    pretty(&serde_json::json!({
        "store": inspection.store,
        "site_id": inspection.site_id,
        "run_id": inspection.run_id,
        "expected_dimensions": inspection.expected_dimensions,
        "dimensions_match": inspection.mismatched().is_empty(),
        "documents": documents,
    }))
}

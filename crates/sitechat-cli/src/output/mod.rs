//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use sitechat_core::{AnswerResult, Retrieval, StoreDocument};

/// Sampled store contents for one site
pub struct Inspection {
    pub store: String,
    pub site_id: String,
    pub run_id: Option<String>,
    pub expected_dimensions: usize,
    pub documents: Vec<StoreDocument>,
}

impl Inspection {
    /// Stored vector lengths that differ from the configured dimensions
    pub fn mismatched(&self) -> Vec<usize> {
        self.documents
            .iter()
            .filter_map(|d| d.vector.as_ref().map(Vec::len))
            .filter(|len| *len != self.expected_dimensions)
            .collect()
    }
}

pub fn format_answer(result: &AnswerResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_answer(result),
        OutputFormat::Cli => terminal::format_answer(result),
    }
}

pub fn format_retrieval(retrieval: &Retrieval, store: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_retrieval(retrieval),
        OutputFormat::Cli => terminal::format_retrieval(retrieval, store),
    }
}

pub fn format_terms(terms: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_terms(terms),
        OutputFormat::Cli => terminal::format_terms(terms),
    }
}

pub fn format_inspection(inspection: &Inspection, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_inspection(inspection),
        OutputFormat::Cli => terminal::format_inspection(inspection),
    }
}

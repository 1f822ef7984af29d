//! Query term extraction
//!
//! Pulls the salient keywords out of a natural-language question. Quoted
//! phrases are kept verbatim and come first; the rest of the question is
//! tokenized and stripped of stop words.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Upper bound on extracted terms
pub const MAX_TERMS: usize = 10;

/// Tokens shorter than this (in characters) are dropped
pub const MIN_TERM_CHARS: usize = 3;

/// Function words that carry no retrieval signal
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "for", "to", "in", "on", "at", "by", "with", "from",
    "about", "what", "which", "who", "whom", "whose", "is", "are", "was", "were", "be", "been",
    "being", "do", "does", "did", "can", "could", "should", "would", "may", "might", "will",
    "shall", "we", "our", "us", "you", "your", "they", "their", "it", "its", "this", "that",
    "these", "those", "please", "show", "tell", "give", "list", "explain", "how", "why", "when",
];

lazy_static! {
    static ref QUOTED_PHRASE: Regex = Regex::new(r#""([^"]+)""#).expect("valid regex");
    // `+` counts as a word character so "c++" survives as a token
    static ref TOKEN_SEPARATOR: Regex = Regex::new(r"[^\w+]+").expect("valid regex");
}

/// Extract up to [`MAX_TERMS`] distinct search terms, phrases first
pub fn extract_terms(question: &str) -> Vec<String> {
    let question = question.trim();

    let phrases = QUOTED_PHRASE
        .captures_iter(question)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|p| !p.is_empty());

    let remainder = QUOTED_PHRASE.replace_all(question, " ").to_lowercase();
    let words = TOKEN_SEPARATOR
        .split(&remainder)
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut seen = HashSet::new();
    phrases
        .chain(words)
        .filter(|term| seen.insert(term.clone()))
        .take(MAX_TERMS)
        .collect()
}

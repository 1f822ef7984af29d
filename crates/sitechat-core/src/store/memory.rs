//! In-process vector store over chunks loaded from JSONL
//!
//! Each line of the file is one [`Chunk`]. Ranking is brute-force cosine
//! similarity, which is fine for a single site's worth of chunks.

use super::{Chunk, EqualityFilter, StoreDocument, VectorStore};
use crate::error::{Result, SiteChatError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Vector store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: Vec<Chunk>,
    dimensions: Option<usize>,
}

impl MemoryStore {
    /// Build a store, checking `(site_id, url, chunk_index)` uniqueness and
    /// that every embedding has the same length.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut dimensions = None;

        for chunk in &chunks {
            if !seen.insert((chunk.site_id.as_str(), chunk.url.as_str(), chunk.chunk_index)) {
                return Err(SiteChatError::InvalidInput(format!(
                    "duplicate chunk {} #{} for site {}",
                    chunk.url, chunk.chunk_index, chunk.site_id
                )));
            }
            match dimensions {
                None => dimensions = Some(chunk.embedding.len()),
                Some(expected) if expected != chunk.embedding.len() => {
                    return Err(SiteChatError::DimensionMismatch {
                        expected,
                        actual: chunk.embedding.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { chunks, dimensions })
    }

    /// Load chunks from a JSONL file
    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut chunks = Vec::new();

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let chunk: Chunk = serde_json::from_str(&line).map_err(|e| {
                SiteChatError::InvalidInput(format!(
                    "{}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                ))
            })?;
            chunks.push(chunk);
        }

        tracing::info!("Loaded {} chunks from {}", chunks.len(), path.display());
        Self::new(chunks)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn to_document(chunk: &Chunk, similarity: f64, with_vector: bool) -> StoreDocument {
        StoreDocument {
            url: chunk.url.clone(),
            title: chunk.title.clone(),
            text: chunk.text.clone(),
            chunk_index: chunk.chunk_index,
            similarity,
            site_id: Some(chunk.site_id.clone()),
            run_id: chunk.run_id.clone(),
            vector: with_vector.then(|| chunk.embedding.clone()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn search(
        &self,
        filter: &EqualityFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreDocument>> {
        if let Some(expected) = self.dimensions {
            if expected != query_vector.len() {
                return Err(SiteChatError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let mut scored: Vec<(f64, &Chunk)> = self
            .chunks
            .iter()
            .filter(|c| c.matches(filter))
            .map(|c| (cosine_similarity(query_vector, &c.embedding) as f64, c))
            .collect();

        // Stable sort keeps file order among equal similarities
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(sim, c)| Self::to_document(c, sim, false))
            .collect())
    }

    async fn sample(&self, filter: &EqualityFilter, limit: usize) -> Result<Vec<StoreDocument>> {
        Ok(self
            .chunks
            .iter()
            .filter(|c| c.matches(filter))
            .take(limit)
            .map(|c| Self::to_document(c, 0.0, true))
            .collect())
    }

    fn name(&self) -> &str {
        "memory store"
    }
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

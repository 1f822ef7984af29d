//! Query embedding cache
//!
//! Users tend to repeat questions (and the interactive loop retries them),
//! so query vectors are kept for a while instead of re-encoding.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    vector: Vec<f32>,
    expires_at: SystemTime,
}

/// In-memory TTL cache of embedding vectors
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl EmbeddingCache {
    /// Create new cache with default TTL of 1 hour
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    /// Create cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: 4096,
        }
    }

    /// Get cached vector if present and not expired
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if SystemTime::now() < entry.expires_at {
            Some(entry.vector.clone())
        } else {
            None
        }
    }

    /// Store a vector
    pub fn set(&self, key: String, vector: Vec<f32>) {
        let expires_at = SystemTime::now() + self.ttl;

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.capacity {
                let now = SystemTime::now();
                entries.retain(|_, entry| now < entry.expires_at);
                if entries.len() >= self.capacity {
                    entries.clear();
                }
            }
            entries.insert(key, CacheEntry { vector, expires_at });
        }
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate cache key for embeddings
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    text.hash(&mut hasher);
    format!("embed:{}:{:x}", model, hasher.finish())
}

//! Vector-memory backends.

use super::embedding::{Embedder, cosine_similarity};
use super::types::{MemoryHit, MemoryRecord};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Vector-memory collaborator.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Up to `limit` records by descending similarity to `query`.
    async fn similar(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>>;

    /// Every record filed under `category`.
    async fn by_category(&self, category: &str) -> Result<Vec<MemoryRecord>>;

    async fn insert(&self, record: MemoryRecord) -> Result<()>;

    async fn len(&self) -> Result<usize>;
}

struct Entry {
    record: MemoryRecord,
    vector: Vec<f32>,
}

/// Brute-force cosine search over records held in process memory.
pub struct InMemoryMemoryStore {
    embedder: Arc<dyn Embedder>,
    entries: Mutex<Vec<Entry>>,
}

impl InMemoryMemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MemoryBackend for InMemoryMemoryStore {
    async fn similar(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>> {
        let q = self.embedder.embed(query)?;
        let mut hits: Vec<MemoryHit> = self
            .lock()
            .iter()
            .map(|e| MemoryHit {
                record: e.record.clone(),
                score: cosine_similarity(&q, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn by_category(&self, category: &str) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .lock()
            .iter()
            .filter(|e| e.record.category == category)
            .map(|e| e.record.clone())
            .collect())
    }

    async fn insert(&self, record: MemoryRecord) -> Result<()> {
        if record.text.trim().is_empty() {
            return Err(AgentError::Memory("refusing to store empty memory".to_owned()));
        }
        let vector = self.embedder.embed(&record.text)?;
        if vector.len() != self.embedder.dim() {
            return Err(AgentError::Memory(format!(
                "embedding has {} dims, expected {}",
                vector.len(),
                self.embedder.dim()
            )));
        }
        self.lock().push(Entry { record, vector });
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}

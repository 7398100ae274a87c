//! Memory retrieval and storage on top of a [`MemoryBackend`].

use super::store::MemoryBackend;
use super::types::{MemoryHit, MemoryRecord};
use crate::classify::{Classifier, GENERAL_CHAT};
use crate::config::{MemoryConfig, SeedMemory};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Finds the one prior memory most relevant to a query.
///
/// Candidates are similarity hits at or above the threshold plus every
/// memory filed under the query's category (scored 1.0). Candidates in the
/// query's category rank ahead of the rest; within each group, higher score
/// wins.
pub struct MemoryLookup {
    backend: Arc<dyn MemoryBackend>,
    classifier: Arc<dyn Classifier>,
    config: MemoryConfig,
}

impl MemoryLookup {
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        classifier: Arc<dyn Classifier>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            backend,
            classifier,
            config,
        }
    }

    /// Best memory for `query`, or `None`. Failures are logged, never raised.
    pub async fn lookup(&self, query: &str) -> Option<MemoryHit> {
        match self.try_lookup(query).await {
            Ok(hit) => {
                debug!(found = hit.is_some(), "memory lookup finished");
                hit
            }
            Err(e) => {
                warn!("memory lookup failed: {e}");
                None
            }
        }
    }

    async fn try_lookup(&self, query: &str) -> Result<Option<MemoryHit>> {
        let category = self.category_of(query).await;
        let threshold = self.config.similarity_threshold;

        let mut candidates: Vec<MemoryHit> = self
            .backend
            .similar(query, self.config.search_limit)
            .await?
            .into_iter()
            .filter(|hit| hit.score >= threshold)
            .collect();

        if category != GENERAL_CHAT {
            for record in self.backend.by_category(&category).await? {
                match candidates.iter_mut().find(|c| c.record.id == record.id) {
                    Some(existing) => existing.score = 1.0,
                    None => candidates.push(MemoryHit { record, score: 1.0 }),
                }
            }
        }

        Ok(rank(candidates, &category, threshold))
    }

    /// Classify `text` and store it. Returns the stored record.
    pub async fn remember(&self, text: &str) -> Result<MemoryRecord> {
        let category = self.category_of(text).await;
        let record = MemoryRecord::new(text, category);
        self.backend.insert(record.clone()).await?;
        info!(id = %record.id, category = %record.category, "memory stored");
        Ok(record)
    }

    /// Insert `seeds` if the backend is empty. Returns how many were stored.
    pub async fn seed(&self, seeds: &[SeedMemory]) -> Result<usize> {
        if self.backend.len().await? > 0 {
            debug!("memory store not empty, skipping seed");
            return Ok(0);
        }
        for seed in seeds {
            self.backend
                .insert(MemoryRecord::new(&seed.text, &seed.category))
                .await?;
        }
        info!(count = seeds.len(), "memory store seeded");
        Ok(seeds.len())
    }

    async fn category_of(&self, text: &str) -> String {
        match self.classifier.category(text).await {
            Ok(guess) => guess.resolve(self.config.category_confidence).to_owned(),
            Err(e) => {
                warn!("category classification failed: {e}");
                GENERAL_CHAT.to_owned()
            }
        }
    }
}

fn rank(candidates: Vec<MemoryHit>, category: &str, threshold: f32) -> Option<MemoryHit> {
    let (mut same, mut other): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .filter(|hit| hit.score >= threshold)
        .partition(|hit| hit.record.category == category);
    same.sort_by(|a, b| b.score.total_cmp(&a.score));
    other.sort_by(|a, b| b.score.total_cmp(&a.score));
    same.into_iter().chain(other).next()
}

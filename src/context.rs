//! Extractive summary of the recent conversation, used to enrich a memory
//! follow-up.

use crate::config::SpeechConfig;
use crate::history::Message;
use crate::memory::embedding::{Embedder, cosine_similarity};
use crate::text::{filter_reply, split_into_sentences};
use std::sync::Arc;
use tracing::warn;

/// Returned when there is nothing to summarize.
pub const NO_CONTEXT: &str = "No relevant context available.";

/// Number of sentences kept by default.
pub const SUMMARY_SENTENCES: usize = 3;

/// Keeps the sentences closest to the centroid of the conversation.
pub struct ContextSummarizer {
    embedder: Arc<dyn Embedder>,
    max_sentences: usize,
    speech: SpeechConfig,
}

impl ContextSummarizer {
    pub fn new(embedder: Arc<dyn Embedder>, speech: SpeechConfig) -> Self {
        Self {
            embedder,
            max_sentences: SUMMARY_SENTENCES,
            speech,
        }
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }

    /// Summarize `window`, skipping system prompts and coaching lines.
    ///
    /// Sentences are kept in conversation order.
    pub fn summarize(&self, window: &[Message]) -> String {
        let transcript: String = window
            .iter()
            .filter(|m| !m.is_coaching())
            .map(|m| format!("user: {}, message: {}. ", m.speaker_id, m.content))
            .collect();

        let sentences = split_into_sentences(&transcript);
        if sentences.is_empty() {
            return NO_CONTEXT.to_owned();
        }

        let picked = if sentences.len() <= self.max_sentences {
            sentences
        } else {
            self.most_central(sentences)
        };

        let summary = filter_reply(&format!("{}.", picked.join(". ")), &self.speech);
        if summary.trim_matches('.').trim().is_empty() {
            NO_CONTEXT.to_owned()
        } else {
            summary
        }
    }

    fn most_central(&self, sentences: Vec<String>) -> Vec<String> {
        let vectors: Vec<Vec<f32>> = match sentences
            .iter()
            .map(|s| self.embedder.embed(s))
            .collect::<crate::error::Result<_>>()
        {
            Ok(v) => v,
            Err(e) => {
                warn!("context embedding failed, keeping latest sentences: {e}");
                let skip = sentences.len().saturating_sub(self.max_sentences);
                return sentences.into_iter().skip(skip).collect();
            }
        };

        let dim = self.embedder.dim();
        let mut centroid = vec![0.0f32; dim];
        for v in &vectors {
            for (c, x) in centroid.iter_mut().zip(v) {
                *c += x;
            }
        }

        let mut scored: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(v, &centroid)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut keep: Vec<usize> = scored
            .into_iter()
            .take(self.max_sentences)
            .map(|(i, _)| i)
            .collect();
        keep.sort_unstable();

        keep.into_iter().map(|i| sentences[i].clone()).collect()
    }
}

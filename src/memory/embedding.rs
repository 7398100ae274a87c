//! Text embeddings for similarity search.
//!
//! [`HashingEmbedder`] is a dependency-free bag-of-words embedder: each
//! normalized word (and each adjacent word pair) is hashed into a fixed
//! number of buckets and the vector is L2-normalized. It needs no model
//! download and is deterministic, which is all the in-process store needs.

use crate::error::Result;
use crate::text::normalize_phrase;

/// Default embedding dimension for [`HashingEmbedder`].
pub const EMBEDDING_DIM: usize = 256;

/// Embedding collaborator.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a unit-length vector of [`Embedder::dim`] floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dim(&self) -> usize;
}

/// Feature-hashing embedder over words and word bigrams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dim as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let normalized = normalize_phrase(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();

        let mut v = vec![0.0f32; self.dim];
        for word in &words {
            v[self.bucket(word)] += 1.0;
        }
        for pair in words.windows(2) {
            v[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
        }
        Ok(l2_normalize(&v))
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < 1e-12 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns 0.0 when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have equal length");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < 1e-12 {
        return 0.0;
    }
    dot / denom
}

//! Long-term conversational memory.
//!
//! - [`MemoryLookup`]: category-aware retrieval, storing and seeding.
//! - [`MemoryBackend`]: the vector-store collaborator, with the in-process
//!   [`InMemoryMemoryStore`] as default.
//! - [`Embedder`]: text to vector, with [`HashingEmbedder`] as default.

pub mod embedding;
pub mod lookup;
pub mod store;
pub mod types;

pub use embedding::{Embedder, HashingEmbedder, cosine_similarity};
pub use lookup::MemoryLookup;
pub use store::{InMemoryMemoryStore, MemoryBackend};
pub use types::{MemoryHit, MemoryRecord};

//! Shared types for the memory subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub text: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// A new record with a fresh id, timestamped now.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            category: category.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHit {
    pub record: MemoryRecord,
    pub score: f32,
}

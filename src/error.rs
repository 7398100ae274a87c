//! Error types for the turn orchestration core.

/// Top-level error type for the conversational agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// `delete_most_recent` called on an empty history.
    #[error("turn history is empty")]
    EmptyHistory,

    /// Chat-completion call failed or produced nothing usable.
    #[error("completion error: {0}")]
    Completion(String),

    /// Speech synthesis failed for a segment.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Vector-memory lookup or store error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Intent / decision / category classification error.
    #[error("classification error: {0}")]
    Classification(String),

    /// Dialogue graph error (unknown state, handler failure).
    #[error("dialogue error: {0}")]
    Dialogue(String),

    /// Status/UI sink error.
    #[error("status error: {0}")]
    Status(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AgentError>;

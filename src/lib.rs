//! BunnyBot: turn orchestration core for a voice conversational agent.
//!
//! Speech-to-text, text-to-speech, the language model and the vector store
//! are collaborators behind traits; this crate coordinates them:
//! Transcript → Dialogue state → Completion (+ Memory) → Playback → Idle
//!
//! # Architecture
//!
//! - **Idle timer**: debounced "no input" countdown with generation-checked
//!   expiries, driving self-prompts
//! - **Playback queue**: strictly ordered utterances drained by one synthesis
//!   worker; re-arms the idle timer once empty
//! - **Turn history**: serialized message log read in bounded windows
//! - **Dialogue graph**: named states whose handlers return commands and an
//!   explicit transition
//! - **Turn orchestrator**: consumes transcripts and idle expiries, executes
//!   handler commands, runs memory lookups concurrently with completions

pub mod classify;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod idle_timer;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod playback;
pub mod self_prompt;
pub mod status;
pub mod text;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use history::{Message, Role, TurnHistory};
pub use idle_timer::IdleTimer;
pub use pipeline::coordinator::{Collaborators, TranscriptSender, TurnOrchestrator};
pub use pipeline::dialogue::{DialogueGraph, StateId};
pub use playback::{PlaybackQueue, SpeechSynthesizer};

//! The turn pipeline: events, dialogue states and the orchestrator.

pub mod coordinator;
pub mod dialogue;
pub mod messages;

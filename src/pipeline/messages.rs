//! Message types passed between pipeline tasks.

use std::time::Instant;

/// A transcription result pushed by the speech-to-text collaborator.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// The transcribed text.
    pub text: String,
    /// Time the transcription reached the core.
    pub received_at: Instant,
}

impl Transcription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Instant::now(),
        }
    }
}

/// Emitted by the idle timer when a countdown expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleFired {
    /// Timer generation the expiry belongs to.
    pub generation: u64,
}

/// One reply split into speakable segments, the unit of the playback queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackItem {
    /// Sentence-sized segments, spoken in order.
    pub segments: Vec<String>,
}

impl PlaybackItem {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PlaybackItem {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

//! One chat-completion call, turned into a speakable reply.

use crate::config::SpeechConfig;
use crate::error::Result;
use crate::history::{Message, TurnHistory};
use crate::pipeline::messages::PlaybackItem;
use crate::text::{filter_reply, split_into_sentences};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Chat-completion collaborator.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Complete the conversation. `Ok(None)` means the backend produced no
    /// content.
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>>;
}

/// A usable reply: filtered text plus its speakable segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub segments: Vec<String>,
}

impl Reply {
    pub fn playback_item(&self) -> PlaybackItem {
        PlaybackItem::new(self.segments.clone())
    }
}

/// Wraps one completion call per invocation. Never retries.
pub struct CompletionPipeline {
    backend: Arc<dyn ChatCompletion>,
    window: usize,
    speech: SpeechConfig,
}

impl CompletionPipeline {
    pub fn new(backend: Arc<dyn ChatCompletion>, window: usize, speech: SpeechConfig) -> Self {
        Self {
            backend,
            window,
            speech,
        }
    }

    /// Complete over the most recent `window` messages of `history`.
    pub async fn complete(&self, history: &TurnHistory) -> Option<Reply> {
        let messages = history.recent(self.window);
        self.complete_messages(&messages).await
    }

    /// Complete over an explicit message window.
    ///
    /// Backend failures are logged and reported as `None`, as is a reply that
    /// is empty after filtering or has no speakable segment.
    pub async fn complete_messages(&self, messages: &[Message]) -> Option<Reply> {
        let raw = match self.backend.complete(messages).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("completion returned no content");
                return None;
            }
            Err(e) => {
                warn!("completion failed: {e}");
                return None;
            }
        };

        let text = filter_reply(&raw, &self.speech);
        let segments = split_into_sentences(&text);
        if segments.is_empty() {
            debug!(raw = %raw, "completion had nothing speakable");
            return None;
        }
        Some(Reply { text, segments })
    }
}

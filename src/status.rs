//! Fire-and-forget status posts to a UI.
//!
//! [`StatusPoster`] owns a bounded outbound queue drained by one worker, so
//! a slow or unreachable sink never blocks the turn pipeline: when the
//! queue is full the post is dropped with a warning.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Who a status line is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusRole {
    User,
    Assistant,
    System,
    /// The agent's inner monologue while it looks things up.
    Thoughts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    #[serde(rename = "user_id")]
    pub speaker_id: String,
    pub role: StatusRole,
    pub content: String,
}

/// Status/UI collaborator.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn post(&self, update: &StatusUpdate) -> Result<()>;
}

/// Logs status lines instead of sending them anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

#[async_trait]
impl StatusSink for LogStatusSink {
    async fn post(&self, update: &StatusUpdate) -> Result<()> {
        info!(role = ?update.role, speaker = %update.speaker_id, "{}", update.content);
        Ok(())
    }
}

/// POSTs each update as JSON to `<url>/messages`.
pub struct HttpStatusSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusSink {
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/messages", url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl StatusSink for HttpStatusSink {
    async fn post(&self, update: &StatusUpdate) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(update)
            .send()
            .await
            .map_err(|e| AgentError::Status(format!("status post failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Status(format!(
                "status sink returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

/// Buffered, non-blocking front of a [`StatusSink`].
pub struct StatusPoster {
    tx: Mutex<Option<mpsc::Sender<StatusUpdate>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StatusPoster {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn StatusSink>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let worker = tokio::spawn(run_status_worker(rx, sink));
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a status line. Never waits; drops the post if the queue is
    /// full or the poster has shut down.
    pub fn post(&self, role: StatusRole, speaker_id: &str, content: &str) {
        let update = StatusUpdate {
            speaker_id: speaker_id.to_owned(),
            role,
            content: content.to_owned(),
        };
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            return;
        };
        match tx.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                warn!(role = ?update.role, "status queue full, dropping post");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Close the queue and wait for queued posts to be delivered.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("status worker ended abnormally: {e}");
        }
    }
}

async fn run_status_worker(mut rx: mpsc::Receiver<StatusUpdate>, sink: Arc<dyn StatusSink>) {
    while let Some(update) = rx.recv().await {
        if let Err(e) = sink.post(&update).await {
            warn!("status sink unavailable: {e}");
        }
    }
}

//! Ordered playback queue drained by a single synthesis worker.
//!
//! Items are spoken strictly in enqueue order and segments within an item in
//! order; one segment is fully synthesized before the next begins. Every
//! enqueue cancels the idle timer, and the worker re-arms it only once the
//! queue has fully drained.

use crate::error::{AgentError, Result};
use crate::idle_timer::IdleTimer;
use crate::pipeline::messages::PlaybackItem;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Text-to-speech collaborator.
///
/// Must be safe to call repeatedly; a failure only affects the one segment.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `segment`, returning once playback of it has finished.
    async fn synthesize(&self, segment: &str) -> Result<()>;
}

enum PlaybackCommand {
    Play(PlaybackItem),
    Stop,
}

/// Count of items enqueued but not yet fully spoken.
///
/// Guarded by a mutex shared by `enqueue` and the worker so that the
/// "queue drained, start the idle timer" step cannot interleave with a
/// concurrent enqueue's cancel.
struct Pending {
    items: Mutex<usize>,
    idle: IdleTimer,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_item(&self) {
        let mut items = self.lock();
        *items = items.saturating_sub(1);
        if *items == 0 {
            debug!("playback queue drained");
            self.idle.start();
        }
    }
}

/// FIFO of utterances with one dedicated synthesis worker.
pub struct PlaybackQueue {
    tx: mpsc::UnboundedSender<PlaybackCommand>,
    pending: Arc<Pending>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackQueue {
    /// Spawn the worker task. Must be called from within a tokio runtime.
    pub fn spawn(synthesizer: Arc<dyn SpeechSynthesizer>, idle: IdleTimer) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Pending {
            items: Mutex::new(0),
            idle,
        });
        let worker = tokio::spawn(run_playback_worker(rx, synthesizer, Arc::clone(&pending)));
        Self {
            tx,
            pending,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append an item to the tail. Never blocks; always cancels the idle timer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Channel`] once the worker has stopped.
    pub fn enqueue(&self, item: PlaybackItem) -> Result<()> {
        let mut items = self.pending.lock();
        self.pending.idle.cancel();
        self.tx
            .send(PlaybackCommand::Play(item))
            .map_err(|_| AgentError::Channel("playback worker stopped".to_owned()))?;
        *items += 1;
        Ok(())
    }

    /// Items enqueued but not yet fully spoken (including the one playing).
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// True when nothing is queued or playing.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Send the stop sentinel and wait for the worker to exit.
    ///
    /// Items enqueued before the sentinel are still spoken. Safe to call more
    /// than once; later calls return immediately.
    pub async fn stop(&self) {
        let _ = self.tx.send(PlaybackCommand::Stop);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("playback worker ended abnormally: {e}");
        }
    }
}

async fn run_playback_worker(
    mut rx: mpsc::UnboundedReceiver<PlaybackCommand>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    pending: Arc<Pending>,
) {
    let mut spoken: HashSet<String> = HashSet::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            PlaybackCommand::Stop => {
                info!("playback worker stopping");
                break;
            }
            PlaybackCommand::Play(item) => {
                for segment in item.segments {
                    if !spoken.insert(segment.clone()) {
                        debug!(%segment, "skipping segment already spoken");
                        continue;
                    }
                    if let Err(e) = synthesizer.synthesize(&segment).await {
                        warn!("synthesis failed for segment {segment:?}: {e}");
                    }
                }
                pending.finish_item();
            }
        }
    }
}

//! Turn orchestrator: wires transcripts, the dialogue graph, completions,
//! memory, the idle timer and the playback queue together.

use crate::classify::Classifier;
use crate::completion::{ChatCompletion, CompletionPipeline, Reply};
use crate::config::AgentConfig;
use crate::context::{ContextSummarizer, NO_CONTEXT};
use crate::error::{AgentError, Result};
use crate::history::{Message, Role, TurnHistory};
use crate::idle_timer::IdleTimer;
use crate::memory::{Embedder, MemoryBackend, MemoryLookup};
use crate::pipeline::dialogue::{Command, DialogueGraph, HandlerContext, StateId};
use crate::pipeline::messages::{IdleFired, Transcription};
use crate::playback::{PlaybackQueue, SpeechSynthesizer};
use crate::self_prompt::{COACH_SPEAKER, SelfPrompt};
use crate::status::{StatusPoster, StatusRole, StatusSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// External collaborators the orchestrator drives.
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub completion: Arc<dyn ChatCompletion>,
    pub classifier: Arc<dyn Classifier>,
    pub memory: Arc<dyn MemoryBackend>,
    pub embedder: Arc<dyn Embedder>,
    pub status: Arc<dyn StatusSink>,
}

/// Input side of the orchestrator, handed to the speech-to-text collaborator.
///
/// Every call cancels the idle timer before anything else happens.
#[derive(Clone)]
pub struct TranscriptSender {
    tx: mpsc::UnboundedSender<Transcription>,
    idle: IdleTimer,
}

impl TranscriptSender {
    /// Deliver a finished transcript.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Channel`] once the orchestrator has stopped.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.idle.cancel();
        self.tx
            .send(Transcription::new(text))
            .map_err(|_| AgentError::Channel("turn orchestrator stopped".to_owned()))
    }

    /// Raw audio activity was detected; the user may be speaking.
    pub fn audio_detected(&self) {
        self.idle.cancel();
    }
}

/// The conversation coordinator.
///
/// Owns the turn history, dialogue graph, idle timer and playback queue for
/// one session. Transcripts and idle expiries are handled one at a time on
/// the task running [`TurnOrchestrator::run`].
pub struct TurnOrchestrator {
    config: AgentConfig,
    history: Arc<TurnHistory>,
    graph: DialogueGraph,
    candidate: Option<String>,
    idle: IdleTimer,
    idle_rx: mpsc::UnboundedReceiver<IdleFired>,
    transcripts: mpsc::UnboundedReceiver<Transcription>,
    playback: PlaybackQueue,
    completion: CompletionPipeline,
    memory: Arc<MemoryLookup>,
    summarizer: Arc<ContextSummarizer>,
    status: StatusPoster,
}

impl TurnOrchestrator {
    /// Build the session and spawn its workers. Must be called from within
    /// a tokio runtime.
    pub fn new(config: AgentConfig, collaborators: Collaborators) -> (Self, TranscriptSender) {
        let (fire_tx, idle_rx) = mpsc::unbounded_channel();
        let idle = IdleTimer::new(
            Duration::from_secs(config.conversation.idle_timeout_secs),
            fire_tx,
        );
        let (tx, transcripts) = mpsc::unbounded_channel();

        let history = Arc::new(TurnHistory::seeded(
            COACH_SPEAKER,
            config.conversation.system_prompt.clone(),
        ));
        let graph = DialogueGraph::standard(Arc::clone(&collaborators.classifier));
        let playback = PlaybackQueue::spawn(collaborators.synthesizer, idle.clone());
        let completion = CompletionPipeline::new(
            collaborators.completion,
            config.llm.history_window,
            config.speech.clone(),
        );
        let memory = Arc::new(MemoryLookup::new(
            collaborators.memory,
            collaborators.classifier,
            config.memory.clone(),
        ));
        let summarizer = Arc::new(ContextSummarizer::new(
            collaborators.embedder,
            config.speech.clone(),
        ));
        let status = StatusPoster::spawn(collaborators.status, config.status.buffer);

        let sender = TranscriptSender {
            tx,
            idle: idle.clone(),
        };
        let orchestrator = Self {
            config,
            history,
            graph,
            candidate: None,
            idle,
            idle_rx,
            transcripts,
            playback,
            completion,
            memory,
            summarizer,
            status,
        };
        (orchestrator, sender)
    }

    pub fn history(&self) -> Arc<TurnHistory> {
        Arc::clone(&self.history)
    }

    pub fn current_state(&self) -> StateId {
        self.graph.current()
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn idle_timer(&self) -> &IdleTimer {
        &self.idle
    }

    /// Items queued or playing.
    pub fn pending_playback(&self) -> usize {
        self.playback.pending()
    }

    /// Insert the configured seed memories if the store is empty.
    pub async fn seed_memory(&self) -> Result<usize> {
        self.memory.seed(&self.config.memory.seed).await
    }

    /// Process transcripts and idle expiries until `cancel` fires or every
    /// [`TranscriptSender`] is dropped, then shut down.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(state = %self.graph.current(), "turn orchestrator started");
        self.idle.start();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                transcript = self.transcripts.recv() => {
                    let Some(transcript) = transcript else { break };
                    self.on_transcript(transcript).await;
                }
                Some(fired) = self.idle_rx.recv() => self.on_idle_fired(fired).await,
            }
        }

        self.shutdown().await;
    }

    /// Handle one transcript against the current dialogue state.
    ///
    /// A failing handler leaves the graph in its current state.
    pub async fn on_transcript(&mut self, transcript: Transcription) {
        self.idle.cancel();
        let text = transcript.text.trim();
        if text.is_empty() {
            debug!("ignoring blank transcript");
            self.rearm_if_idle();
            return;
        }

        let state = self.graph.current();
        info!(%state, "transcript: {text}");
        self.status
            .post(StatusRole::User, &self.config.conversation.user_id, text);

        let outcome = match self.graph.handler() {
            Ok(handler) => {
                let recent = self.history.recent(self.config.conversation.candidate_window);
                let ctx = HandlerContext {
                    transcript: text,
                    recent: &recent,
                    candidate: self.candidate.as_deref(),
                    conversation: &self.config.conversation,
                };
                handler.handle(&ctx).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                self.execute(outcome.commands).await;
                if let Some(next) = outcome.transition
                    && let Err(e) = self.graph.transition_to(next)
                {
                    error!("dialogue transition failed: {e}");
                }
            }
            Err(e) => {
                error!(%state, "dialogue handler failed: {e}");
                self.rearm_if_idle();
            }
        }

        debug!(
            elapsed_ms = transcript.received_at.elapsed().as_millis() as u64,
            "turn handled"
        );
    }

    /// Handle an idle-timer expiry.
    ///
    /// Stale expiries and expiries while speech is queued are dropped.
    pub async fn on_idle_fired(&mut self, fired: IdleFired) {
        if !self.idle.is_current(fired.generation) {
            debug!(generation = fired.generation, "stale idle expiry ignored");
            return;
        }
        if !self.playback.is_idle() {
            debug!("playback pending, not idle");
            self.idle.cancel();
            return;
        }

        let last = self.history.most_recent();
        let Some(branch) = SelfPrompt::decide(
            self.history.len(),
            last.as_ref().map(|m| (m.role, m.content.as_str())),
        ) else {
            return;
        };

        info!(?branch, "idle timeout, prompting self");
        self.history
            .push(branch.coaching(&self.config.conversation.user_id));
        self.respond().await;
    }

    async fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Append(message) => self.history.push(message),
                Command::Respond => {
                    self.respond().await;
                }
                Command::RespondWithMemory { transcript } => {
                    self.respond_with_memory(&transcript).await;
                }
                Command::SetCandidate(candidate) => self.candidate = candidate,
                Command::RememberCandidate { saved, failed } => {
                    let stored = match self.candidate.as_deref() {
                        Some(text) => match self.memory.remember(text).await {
                            Ok(_) => true,
                            Err(e) => {
                                warn!("could not store memory: {e}");
                                false
                            }
                        },
                        None => {
                            warn!("no candidate memory to store");
                            false
                        }
                    };
                    self.history.push(if stored { saved } else { failed });
                }
            }
        }
    }

    /// One completion + playback cycle over the current history.
    ///
    /// Returns `true` when a reply was enqueued. With no usable reply the
    /// idle timer is re-armed instead.
    async fn respond(&self) -> bool {
        match self.completion.complete(&self.history).await {
            Some(reply) => self.speak(reply),
            None => {
                info!("no usable reply, returning to idle");
                self.rearm_if_idle();
                false
            }
        }
    }

    fn speak(&self, reply: Reply) -> bool {
        let name = &self.config.conversation.assistant_name;
        self.history.append(Role::Assistant, name.as_str(), &reply.text);
        self.status.post(StatusRole::Assistant, name, &reply.text);
        match self.playback.enqueue(reply.playback_item()) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not enqueue reply: {e}");
                self.rearm_if_idle();
                false
            }
        }
    }

    /// Fast reply, then a memory-enriched follow-up if a memory matches.
    ///
    /// The memory lookup and context summary run concurrently with the
    /// first completion and are joined before the follow-up.
    async fn respond_with_memory(&self, transcript: &str) {
        let user = &self.config.conversation.user_id;
        let name = &self.config.conversation.assistant_name;

        let window = self.history.recent(self.config.conversation.context_window);
        let summarizer = Arc::clone(&self.summarizer);
        let summary_task = tokio::spawn(async move { summarizer.summarize(&window) });

        let memory = Arc::clone(&self.memory);
        let query = transcript.to_owned();
        let memory_task = tokio::spawn(async move { memory.lookup(&query).await });

        self.status.post(
            StatusRole::Thoughts,
            name,
            "💭 Hmm... I think I remember this...",
        );
        self.respond().await;

        let (summary, found) = tokio::join!(summary_task, memory_task);
        let summary = summary.unwrap_or_else(|e| {
            warn!("context summary task failed: {e}");
            NO_CONTEXT.to_owned()
        });
        let found = found.unwrap_or_else(|e| {
            warn!("memory lookup task failed: {e}");
            None
        });

        let Some(hit) = found else {
            self.status.post(
                StatusRole::Thoughts,
                name,
                &format!("💭 Oh, no, {user} hasn't mentioned this before..."),
            );
            return;
        };
        info!(id = %hit.record.id, score = hit.score, "memory matched, enriching reply");
        self.status.post(
            StatusRole::Thoughts,
            name,
            &format!("💭 Oh yeah! I think {user} mentioned this before!"),
        );

        self.history.push(Message::new(
            Role::System,
            COACH_SPEAKER,
            format!(
                "Relevant past information: {}. Relevant context: {summary}. User message: {transcript}",
                hit.record.text
            ),
        ));
        let reply = self.completion.complete(&self.history).await;
        if let Err(e) = self.history.delete_most_recent() {
            error!("could not retract memory context: {e}");
        }

        match reply {
            Some(reply) => {
                self.speak(reply);
            }
            None => self.rearm_if_idle(),
        }
    }

    fn rearm_if_idle(&self) {
        if self.playback.is_idle() {
            self.idle.start();
        }
    }

    /// Cancel the timer, then join the playback and status workers.
    pub async fn shutdown(&self) {
        info!("turn orchestrator shutting down");
        self.idle.shutdown();
        self.playback.stop().await;
        self.status.shutdown().await;
    }
}

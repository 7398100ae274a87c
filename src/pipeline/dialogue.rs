//! Dialogue graph: named conversation states and their handlers.
//!
//! Handlers never touch the history, timer or playback queue. They inspect
//! a [`HandlerContext`] and return an [`Outcome`]: a list of [`Command`]s
//! for the orchestrator to execute plus an optional transition. The graph
//! moves only when the orchestrator applies that transition, and only to a
//! registered state.

use crate::classify::{Classifier, Decision, Intent};
use crate::config::ConversationConfig;
use crate::error::{AgentError, Result};
use crate::history::{Message, Role};
use crate::self_prompt::COACH_SPEAKER;
use crate::text::normalize_phrase;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Identifier of a dialogue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    /// Default state: classify and answer.
    Start,
    /// Waiting for a yes/no on the candidate memory.
    ConfirmRemember,
}

impl StateId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ConfirmRemember => "confirm-remember",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "confirm-remember" => Some(Self::ConfirmRemember),
            _ => None,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side effect requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a message to the turn history.
    Append(Message),
    /// Run one completion and enqueue the reply.
    Respond,
    /// Two-pass reply to a transcript already in history: a fast
    /// completion, then a memory-enriched follow-up once the concurrent
    /// memory lookup and context summary resolve.
    RespondWithMemory { transcript: String },
    /// Replace (or clear) the candidate memory.
    SetCandidate(Option<String>),
    /// Store the current candidate memory, then append `saved` or `failed`
    /// depending on whether the store accepted it.
    RememberCandidate { saved: Message, failed: Message },
}

/// What a handler decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub commands: Vec<Command>,
    /// `None` stays in the current state.
    pub transition: Option<StateId>,
}

impl Outcome {
    pub fn stay(commands: Vec<Command>) -> Self {
        Self {
            commands,
            transition: None,
        }
    }

    pub fn transition(commands: Vec<Command>, to: StateId) -> Self {
        Self {
            commands,
            transition: Some(to),
        }
    }
}

/// Read-only view handed to a state handler.
pub struct HandlerContext<'a> {
    pub transcript: &'a str,
    /// The most recent `candidate_window` history entries.
    pub recent: &'a [Message],
    pub candidate: Option<&'a str>,
    pub conversation: &'a ConversationConfig,
}

#[async_trait]
pub trait StateHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<Outcome>;
}

/// Mapping of state ids to handlers with exactly one current state.
pub struct DialogueGraph {
    states: HashMap<StateId, Arc<dyn StateHandler>>,
    current: StateId,
}

impl DialogueGraph {
    /// A graph holding only `initial`, which becomes the current state.
    pub fn new(initial: StateId, handler: Arc<dyn StateHandler>) -> Self {
        let mut states = HashMap::new();
        states.insert(initial, handler);
        Self {
            states,
            current: initial,
        }
    }

    /// The `start` / `confirm-remember` graph, starting at `start`.
    pub fn standard(classifier: Arc<dyn Classifier>) -> Self {
        let mut graph = Self::new(
            StateId::Start,
            Arc::new(StartState::new(Arc::clone(&classifier))),
        );
        graph.register(
            StateId::ConfirmRemember,
            Arc::new(ConfirmRememberState::new(classifier)),
        );
        graph
    }

    pub fn register(&mut self, id: StateId, handler: Arc<dyn StateHandler>) {
        self.states.insert(id, handler);
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    /// Handler of the current state.
    pub fn handler(&self) -> Result<Arc<dyn StateHandler>> {
        self.states
            .get(&self.current)
            .cloned()
            .ok_or_else(|| AgentError::Dialogue(format!("no handler for state {}", self.current)))
    }

    /// Make `id` the current state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Dialogue`] if `id` is not registered; the
    /// current state is left unchanged.
    pub fn transition_to(&mut self, id: StateId) -> Result<()> {
        if !self.contains(id) {
            return Err(AgentError::Dialogue(format!("unknown state {id}")));
        }
        if id != self.current {
            info!(from = %self.current, to = %id, "dialogue transition");
        }
        self.current = id;
        Ok(())
    }
}

fn coaching(content: String) -> Message {
    Message::new(Role::System, COACH_SPEAKER, content)
}

fn coach(content: String) -> Command {
    Command::Append(coaching(content))
}

// ── start ───────────────────────────────────────────────────────────────

/// Acknowledge attention grabs, begin remember confirmations, or answer.
pub struct StartState {
    classifier: Arc<dyn Classifier>,
}

impl StartState {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    fn is_attention_phrase(transcript: &str, phrases: &[String]) -> bool {
        let said = normalize_phrase(transcript);
        !said.is_empty() && phrases.iter().any(|p| normalize_phrase(p) == said)
    }

    fn candidate_memory(ctx: &HandlerContext<'_>) -> String {
        ctx.recent
            .iter()
            .filter(|m| !m.is_coaching())
            .map(|m| format!("{}: {}", m.speaker_id, m.content))
            .chain(std::iter::once(format!(
                "{}: {}",
                ctx.conversation.user_id, ctx.transcript
            )))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl StateHandler for StartState {
    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let user = &ctx.conversation.user_id;

        if Self::is_attention_phrase(ctx.transcript, &ctx.conversation.attention_phrases) {
            info!("attention phrase, acknowledging");
            return Ok(Outcome::stay(vec![
                coach(format!(
                    "{user} is trying to get your attention. Acknowledge them and ask \
                     what they want to talk about."
                )),
                Command::Respond,
            ]));
        }

        if self.classifier.intent(ctx.transcript).await? == Intent::RememberThat {
            let candidate = Self::candidate_memory(ctx);
            info!("remember request, asking for confirmation");
            return Ok(Outcome::transition(
                vec![
                    coach(format!(
                        "{user} asked you to remember this:\n{candidate}\nRepeat back what \
                         you will remember and ask {user} to confirm with yes or no."
                    )),
                    Command::SetCandidate(Some(candidate)),
                    Command::Respond,
                ],
                StateId::ConfirmRemember,
            ));
        }

        Ok(Outcome::stay(vec![
            Command::Append(Message::new(Role::User, user.as_str(), ctx.transcript)),
            Command::RespondWithMemory {
                transcript: ctx.transcript.to_owned(),
            },
        ]))
    }
}

// ── confirm-remember ────────────────────────────────────────────────────

/// Store or discard the candidate memory, then return to `start`.
pub struct ConfirmRememberState {
    classifier: Arc<dyn Classifier>,
}

impl ConfirmRememberState {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl StateHandler for ConfirmRememberState {
    async fn handle(&self, ctx: &HandlerContext<'_>) -> Result<Outcome> {
        let user = &ctx.conversation.user_id;
        let decision = self.classifier.decision(ctx.transcript).await?;
        info!(?decision, "remember confirmation");

        let mut commands = vec![Command::Append(Message::new(
            Role::User,
            user.as_str(),
            ctx.transcript,
        ))];
        match (decision, ctx.candidate) {
            (Decision::Yes, Some(_)) => {
                commands.push(Command::RememberCandidate {
                    saved: coaching(format!(
                        "You saved that memory. Tell {user} you will remember it."
                    )),
                    failed: coaching(format!(
                        "You tried to save that memory but something went wrong, so \
                         it was not saved. Apologise to {user} and ask them to try \
                         again later."
                    )),
                });
            }
            (Decision::Yes, None) => {
                commands.push(coach(format!(
                    "You lost track of what to remember. Apologise to {user} and ask \
                     them to say it again."
                )));
            }
            (Decision::No, _) => {
                commands.push(coach(format!(
                    "{user} said no, so you did not save the memory. Let them know \
                     you will forget it."
                )));
            }
            (Decision::Unsure, _) => {
                commands.push(coach(format!(
                    "You could not tell whether {user} wanted you to remember it, so \
                     you did not save it. Tell them they can ask again."
                )));
            }
        }
        commands.push(Command::SetCandidate(None));
        commands.push(Command::Respond);

        Ok(Outcome::transition(commands, StateId::Start))
    }
}

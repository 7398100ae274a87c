//! What the agent says when the conversation has gone quiet.

pub use crate::history::COACH_SPEAKER;
use crate::history::{Message, Role};
use crate::text::is_question;
use tracing::info;

/// Branch chosen when the idle timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfPrompt {
    /// Nobody has said anything yet.
    Greet,
    /// The agent spoke first and nobody has answered; bring up something.
    StartTopic,
    /// Shake the conversation up.
    ChangeTopic,
    /// The agent's last message asked something; answer it.
    AnswerOwnQuestion,
    /// Keep talking about the previous message.
    ContinueThoughts,
}

impl SelfPrompt {
    /// Pick a branch from the history length and the most recent message.
    ///
    /// Returns `None` when the last message is from the user: the user's
    /// turn is still being handled, so there is nothing to prompt.
    pub fn decide(history_len: usize, last: Option<(Role, &str)>) -> Option<Self> {
        match last {
            None | Some((Role::System, _)) => Some(Self::Greet),
            Some((Role::Assistant, content)) => {
                let question = is_question(content);
                if history_len < 2 {
                    // The agent's message is the whole conversation.
                    if question {
                        Some(Self::AnswerOwnQuestion)
                    } else {
                        Some(Self::StartTopic)
                    }
                } else if history_len % 5 == 0 {
                    Some(Self::ChangeTopic)
                } else if question {
                    Some(Self::AnswerOwnQuestion)
                } else {
                    Some(Self::ContinueThoughts)
                }
            }
            Some((Role::User, _)) => {
                info!("most recent message is from the user, skipping self-prompt");
                None
            }
        }
    }

    /// The coaching message appended to history for this branch.
    pub fn coaching(self, user_id: &str) -> Message {
        let (role, text) = match self {
            Self::Greet => (
                Role::System,
                format!("{user_id} hasn't said anything yet, greet them."),
            ),
            Self::StartTopic => (
                Role::System,
                format!(
                    "{user_id} hasn't said anything yet. Talk about something you love \
                     to do. Speak as though you prompted this yourself and this was not \
                     a message from {user_id}."
                ),
            ),
            Self::ChangeTopic => (
                Role::System,
                format!(
                    "Change the topic of the conversation. Speak as though you prompted \
                     this yourself and this was not a message from {user_id}."
                ),
            ),
            Self::AnswerOwnQuestion => (
                Role::User,
                format!(
                    "Answer the question you asked in your previous message. Do not ask a \
                     question in your response. Answer as though you prompted this yourself \
                     and this was not a message from {user_id}."
                ),
            ),
            Self::ContinueThoughts => (
                Role::System,
                format!(
                    "Continue your thoughts on the previous message. Speak as though you \
                     prompted this yourself and this was not a message from {user_id}."
                ),
            ),
        };
        Message::new(role, COACH_SPEAKER, text)
    }
}

//! Which coaching prompt an idle expiry produces.

use crate::helpers::{Harness, Speaker};
use bunnybot::pipeline::messages::{IdleFired, Transcription};
use bunnybot::self_prompt::{COACH_SPEAKER, SelfPrompt};
use bunnybot::{Message, Role, TurnOrchestrator};

fn fill(orchestrator: &TurnOrchestrator, len: usize, last_assistant: &str) {
    let history = orchestrator.history();
    while history.len() + 1 < len {
        let role = if history.len() % 2 == 1 {
            Role::User
        } else {
            Role::Assistant
        };
        history.push(Message::new(role, "someone", "filler"));
    }
    history.append(Role::Assistant, "Bunny", last_assistant);
    assert_eq!(history.len(), len);
}

async fn fire(orchestrator: &mut TurnOrchestrator) {
    let generation = orchestrator.idle_timer().generation();
    orchestrator.on_idle_fired(IdleFired { generation }).await;
}

#[tokio::test]
async fn fresh_history_greets_the_user() {
    let mut h = Harness::new(&["Hi Lumi!"]);
    fire(&mut h.orchestrator).await;
    h.orchestrator.shutdown().await;

    let prompt = &h.llm.prompts()[0];
    assert_eq!(prompt.role, Role::System);
    assert_eq!(prompt.content, "Lumi hasn't said anything yet, greet them.");
    assert_eq!(h.speaker.spoken(), vec!["Hi Lumi"]);
}

#[tokio::test]
async fn every_fifth_message_changes_topic() {
    let mut h = Harness::new(&["Anyway, carrots."]);
    fill(&h.orchestrator, 10, "Do you like carrots?");
    fire(&mut h.orchestrator).await;
    h.orchestrator.shutdown().await;

    let prompt = &h.llm.prompts()[0];
    assert_eq!(*prompt, SelfPrompt::ChangeTopic.coaching("Lumi"));
    assert!(prompt.content.starts_with("Change the topic"));
}

#[tokio::test]
async fn own_question_is_answered_as_user_turn() {
    let mut h = Harness::new(&["I drew a carrot."]);
    fill(&h.orchestrator, 7, "Guess what I drew today?");
    fire(&mut h.orchestrator).await;
    h.orchestrator.shutdown().await;

    let prompt = &h.llm.prompts()[0];
    assert_eq!(prompt.role, Role::User);
    assert_eq!(prompt.speaker_id, COACH_SPEAKER);
    assert!(prompt.content.starts_with("Answer the question"));
}

#[tokio::test]
async fn statement_continues_thoughts() {
    let mut h = Harness::new(&["Also, carrots are crunchy."]);
    fill(&h.orchestrator, 7, "Carrots are great.");
    fire(&mut h.orchestrator).await;
    h.orchestrator.shutdown().await;

    assert_eq!(
        h.llm.prompts()[0],
        SelfPrompt::ContinueThoughts.coaching("Lumi")
    );
}

#[tokio::test]
async fn user_turn_in_flight_is_left_alone() {
    let mut h = Harness::new(&["unused"]);
    h.orchestrator
        .history()
        .append(Role::User, "Lumi", "what's up");
    let before = h.orchestrator.history().len();

    fire(&mut h.orchestrator).await;
    h.orchestrator.shutdown().await;

    assert!(h.llm.prompts().is_empty());
    assert_eq!(h.orchestrator.history().len(), before);
}

#[tokio::test]
async fn expiry_while_playback_pending_is_dropped() {
    let speaker = Speaker::gated();
    let mut h = Harness::with_speaker(speaker.clone(), &["First reply.", "unused"]);

    h.orchestrator
        .on_transcript(Transcription::new("hey bunny"))
        .await;
    assert_eq!(h.orchestrator.pending_playback(), 1);

    fire(&mut h.orchestrator).await;
    assert_eq!(h.llm.prompts().len(), 1);
    assert!(!h.orchestrator.idle_timer().is_armed());

    speaker.release(1);
    h.orchestrator.shutdown().await;
}

//! Dialogue transitions and turn handling through the orchestrator.

use crate::helpers::{DecisionOutage, Harness};
use bunnybot::memory::MemoryBackend;
use bunnybot::pipeline::messages::Transcription;
use bunnybot::{AgentConfig, Role, StateId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn remember_then_yes_stores_memory_and_returns_to_start() {
    let mut h = Harness::new(&[
        "You want me to remember your cat is Miso?",
        "Got it, I'll remember Miso!",
    ]);

    h.orchestrator
        .on_transcript(Transcription::new("Remember that my cat is called Miso"))
        .await;
    assert_eq!(h.orchestrator.current_state(), StateId::ConfirmRemember);
    let candidate = h.orchestrator.candidate().unwrap().to_owned();
    assert!(candidate.contains("Miso"));
    assert_eq!(h.store.len().await.unwrap(), 0);

    h.orchestrator.on_transcript(Transcription::new("Yes!")).await;
    assert_eq!(h.orchestrator.current_state(), StateId::Start);
    assert_eq!(h.orchestrator.candidate(), None);

    let stored = h.store.similar("cat called Miso", 1).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.text, candidate);

    h.orchestrator.shutdown().await;
    assert_eq!(
        h.speaker.spoken(),
        vec![
            "You want me to remember your cat is Miso",
            "Got it, I'll remember Miso"
        ]
    );
}

#[tokio::test]
async fn remember_then_no_discards_candidate() {
    let mut h = Harness::new(&["Remember that?", "Okay, forgotten."]);

    h.orchestrator
        .on_transcript(Transcription::new("Don't forget I hate mornings"))
        .await;
    assert_eq!(h.orchestrator.current_state(), StateId::ConfirmRemember);

    h.orchestrator.on_transcript(Transcription::new("Nope")).await;
    assert_eq!(h.orchestrator.current_state(), StateId::Start);
    assert_eq!(h.store.len().await.unwrap(), 0);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn confirm_remember_waits_indefinitely() {
    let mut h = Harness::new(&["Should I remember that?"]);
    h.orchestrator
        .on_transcript(Transcription::new("Remember that I like tea"))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.orchestrator.current_state(), StateId::ConfirmRemember);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn attention_phrase_acknowledges_and_stays_in_start() {
    let mut h = Harness::new(&["Yes Lumi? What's up?"]);
    let before = h.orchestrator.history().len();

    h.orchestrator
        .on_transcript(Transcription::new("Hey bunny!"))
        .await;

    assert_eq!(h.orchestrator.current_state(), StateId::Start);
    let prompts = h.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].role, Role::System);
    assert!(prompts[0].content.contains("attention"));
    // Coaching line plus the reply; the bare phrase itself is not logged.
    assert_eq!(h.orchestrator.history().len(), before + 2);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn exhausted_completion_rearms_timer_and_enqueues_nothing() {
    let mut h = Harness::new(&[]);

    h.orchestrator
        .on_transcript(Transcription::new("hey bunny"))
        .await;

    assert!(h.orchestrator.idle_timer().is_armed());
    assert_eq!(h.orchestrator.pending_playback(), 0);
    h.orchestrator.shutdown().await;
    assert!(h.speaker.spoken().is_empty());
}

#[tokio::test]
async fn handler_failure_leaves_state_unchanged() {
    let mut h = Harness::build(
        AgentConfig::default(),
        &["Should I remember that?"],
        Arc::new(DecisionOutage),
    );

    h.orchestrator
        .on_transcript(Transcription::new("Remember that I like tea"))
        .await;
    assert_eq!(h.orchestrator.current_state(), StateId::ConfirmRemember);
    let len = h.orchestrator.history().len();

    h.orchestrator.on_transcript(Transcription::new("yes")).await;
    assert_eq!(h.orchestrator.current_state(), StateId::ConfirmRemember);
    assert_eq!(h.orchestrator.history().len(), len);
    assert!(h.orchestrator.candidate().is_some());
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn two_pass_reply_without_memory_speaks_once() {
    let mut h = Harness::new(&["Cool drawing!", "unused"]);

    h.orchestrator
        .on_transcript(Transcription::new("Purple monkey dishwasher"))
        .await;
    h.orchestrator.shutdown().await;

    assert_eq!(h.llm.prompts().len(), 1);
    assert_eq!(h.speaker.spoken(), vec!["Cool drawing"]);
}

#[tokio::test(start_paused = true)]
async fn run_loop_greets_after_idle_timeout_and_handles_transcripts() {
    let h = Harness::new(&["Hey Lumi!", "Nice to hear from you."]);
    let Harness {
        mut orchestrator,
        sender,
        speaker,
        llm,
        ..
    } = h;
    let history = orchestrator.history();
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        orchestrator.run(run_cancel).await;
        orchestrator
    });

    tokio::time::sleep(Duration::from_secs(13)).await;
    assert_eq!(speaker.spoken(), vec!["Hey Lumi"]);

    sender.send("I just woke up").unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        history.most_recent_content().as_deref(),
        Some("Nice to hear from you.")
    );

    cancel.cancel();
    let orchestrator = handle.await.unwrap();
    assert!(!orchestrator.idle_timer().is_armed());
    assert_eq!(llm.prompts()[1].content, "I just woke up");
    drop(orchestrator);
    assert!(sender.send("too late").is_err());
}

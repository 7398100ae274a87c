//! HTTP contract of the OpenAI-compatible completion backend.

use bunnybot::completion::{ChatCompletion, CompletionPipeline};
use bunnybot::config::{LlmConfig, SpeechConfig};
use bunnybot::llm::ApiLlm;
use bunnybot::{Message, Role, TurnHistory};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, api_key: &str) -> LlmConfig {
    LlmConfig {
        api_url: format!("{}/v1", server.uri()),
        model: "bunny-test".to_owned(),
        api_key: api_key.to_owned(),
        max_tokens: Some(128),
        ..LlmConfig::default()
    }
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn conversation() -> Vec<Message> {
    vec![
        Message::new(Role::System, "System", "Be brief."),
        Message::new(Role::User, "Lumi", "Hi Bunny"),
    ]
}

#[tokio::test]
async fn request_carries_model_messages_and_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "model": "bunny-test",
            "stream": false,
            "max_tokens": 128,
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Hi Bunny" }
            ]
        })))
        .respond_with(reply("Hello Lumi!"))
        .expect(1)
        .mount(&server)
        .await;

    let llm = ApiLlm::new(&config(&server, "secret")).unwrap();
    let content = llm.complete(&conversation()).await.unwrap();
    assert_eq!(content.as_deref(), Some("Hello Lumi!"));
}

#[tokio::test]
async fn empty_key_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("ok"))
        .mount(&server)
        .await;

    let llm = ApiLlm::new(&config(&server, "")).unwrap();
    llm.complete(&conversation()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn think_blocks_are_stripped_and_blank_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("<think>plan a greeting</think> Hey!"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(reply("<think>nothing to say</think>  "))
        .mount(&server)
        .await;

    let llm = ApiLlm::new(&config(&server, "k")).unwrap();
    assert_eq!(
        llm.complete(&conversation()).await.unwrap().as_deref(),
        Some("Hey!")
    );
    assert_eq!(llm.complete(&conversation()).await.unwrap(), None);
}

#[tokio::test]
async fn http_errors_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "bad key" } })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let llm = ApiLlm::new(&config(&server, "k")).unwrap();
    let unauthorized = llm.complete(&conversation()).await.unwrap_err().to_string();
    assert!(unauthorized.contains("authentication failed: bad key"), "{unauthorized}");
    let server_error = llm.complete(&conversation()).await.unwrap_err().to_string();
    assert!(server_error.contains("HTTP 500"), "{server_error}");
}

#[tokio::test]
async fn pipeline_over_http_segments_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("Hi Lumi! I drew you a Live2D carrot 🥕. Like it?"))
        .mount(&server)
        .await;

    let llm = Arc::new(ApiLlm::new(&config(&server, "k")).unwrap());
    let pipeline = CompletionPipeline::new(llm, 20, SpeechConfig::default());
    let history = TurnHistory::seeded("System", "Be brief.");
    history.append(Role::User, "Lumi", "Draw me something");

    let reply = pipeline.complete(&history).await.unwrap();
    assert_eq!(
        reply.segments,
        vec!["Hi Lumi", "I drew you a live 2D carrot", "Like it"]
    );
}

#[tokio::test]
async fn unreachable_server_yields_no_reply() {
    let server = MockServer::start().await;
    let llm = Arc::new(ApiLlm::new(&config(&server, "k")).unwrap());
    drop(server);

    let pipeline = CompletionPipeline::new(llm, 20, SpeechConfig::default());
    let history = TurnHistory::seeded("System", "Be brief.");
    assert!(pipeline.complete(&history).await.is_none());
}

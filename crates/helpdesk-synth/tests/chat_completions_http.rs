use helpdesk_synth::{ChatCompletionsClient, CompletionPrompt, ModelClient, ModelError};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn prompt() -> CompletionPrompt {
    CompletionPrompt {
        system: "system".to_string(),
        user: "my laptop is slow".to_string(),
        max_tokens: 500,
        temperature: 0.7,
    }
}

#[tokio::test]
async fn chat_completions_client_sends_expected_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body_includes(
                json!({
                    "model": "support-model",
                    "max_tokens": 500,
                    "messages": [{"role": "system"}, {"role": "user"}]
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "choices": [{"message": {"content": "Restart and close unused programs."}}]
        }));
    });

    let client = ChatCompletionsClient::new(
        &format!("{}/v1", server.base_url()),
        "support-model",
        "test-key",
    )
    .expect("client should build");

    let reply = client
        .complete(&prompt(), Duration::from_secs(5))
        .await
        .expect("completion should succeed");

    mock.assert();
    assert_eq!(reply, "Restart and close unused programs.");
}

#[tokio::test]
async fn chat_completions_client_reports_http_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(429).body("slow down");
    });

    let client = ChatCompletionsClient::new(&server.base_url(), "m", "k").unwrap();
    let err = client
        .complete(&prompt(), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        ModelError::HttpStatus { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn chat_completions_client_rejects_malformed_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({"choices": []}));
    });

    let client = ChatCompletionsClient::new(&server.base_url(), "m", "k").unwrap();
    let err = client
        .complete(&prompt(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidResponse(_)));
}

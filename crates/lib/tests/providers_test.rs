//! # Provider Integration Tests
//!
//! Checks each provider's wire format against a `wiremock` server, then the
//! completion client and response cache layered on top.

mod common;

use anyhow::Result;
use autoscribe::cache::CachedProvider;
use autoscribe::errors::PromptError;
use autoscribe::providers::ai::{
    azure::AzureOpenAiProvider, gemini::GeminiProvider, local::LocalAiProvider, AiProvider,
};
use autoscribe::providers::factory::create_provider;
use autoscribe::types::{GenerationSettings, ProviderConfig};
use autoscribe_test_utils::ScriptedAiProvider;
use common::{setup_tracing, test_client};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn settings(temperature: f32) -> GenerationSettings {
    GenerationSettings {
        temperature,
        max_tokens: 512,
    }
}

#[tokio::test]
async fn test_local_provider_sends_chat_request() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer local-key"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "temperature": 0.5,
            "max_tokens": 512,
            "stream": false,
            "messages": [
                { "role": "system", "content": "sys" },
                { "role": "user", "content": "usr" }
            ]
        })))
        .respond_with(chat_reply("Name>> Employee Name: Smith, Jane"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = LocalAiProvider::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("local-key".to_string()),
        Some("llama3".to_string()),
        settings(0.5),
    )?;

    let reply = provider.generate("sys", "usr").await?;
    assert_eq!(reply, "Name>> Employee Name: Smith, Jane");
    Ok(())
}

#[tokio::test]
async fn test_azure_provider_targets_deployment() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt4/chat/completions"))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", "azure-key"))
        .and(body_partial_json(json!({ "temperature": 0.0 })))
        .respond_with(chat_reply("DOB>> Date of Birth: 06/25/1982"))
        .expect(1)
        .mount(&server)
        .await;

    // A trailing slash on the endpoint must not produce a double slash.
    let provider = AzureOpenAiProvider::new(
        format!("{}/", server.uri()),
        "azure-key".to_string(),
        "gpt4".to_string(),
        None,
        settings(0.0),
    )?;

    assert_eq!(
        provider.generate("sys", "usr").await?,
        "DOB>> Date of Birth: 06/25/1982"
    );
    Ok(())
}

#[tokio::test]
async fn test_gemini_provider_joins_parts() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "sys" }] },
            "contents": [{ "role": "user", "parts": [{ "text": "usr" }] }],
            "generationConfig": { "maxOutputTokens": 512 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Name>> Name: " }, { "text": "Smith" }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        format!("{}/v1beta/models/gemini-1.5-flash:generateContent", server.uri()),
        "gemini-key".to_string(),
        settings(0.4),
    )?;

    assert_eq!(provider.generate("sys", "usr").await?, "Name>> Name: Smith");
    Ok(())
}

#[tokio::test]
async fn test_provider_errors_carry_status_and_body() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/unauthorized"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let unauthorized = LocalAiProvider::new(
        format!("{}/unauthorized", server.uri()),
        None,
        None,
        GenerationSettings::default(),
    )?;
    match unauthorized.generate("s", "u").await {
        Err(PromptError::AiApi { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected AiApi error, got {other:?}"),
    }

    let garbage = LocalAiProvider::new(
        format!("{}/garbage", server.uri()),
        None,
        None,
        GenerationSettings::default(),
    )?;
    assert!(matches!(
        garbage.generate("s", "u").await,
        Err(PromptError::AiDeserialization(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_client_retries_transient_status_once() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        provider: "local".to_string(),
        api_url: Some(format!("{}/v1/chat/completions", server.uri())),
        ..Default::default()
    };
    let provider = create_provider(&config, GenerationSettings::default())?;
    let client = autoscribe::CompletionClient::new(
        provider,
        autoscribe::CompletionOptions {
            timeout: std::time::Duration::from_secs(5),
            max_retries: 1,
            retry_delay: std::time::Duration::from_millis(10),
        },
    );

    assert_eq!(client.complete("s", "u").await?, "recovered");
    Ok(())
}

#[tokio::test]
async fn test_client_sentinel_after_exhausted_retries() {
    setup_tracing();
    let provider = ScriptedAiProvider::new(Vec::<String>::new());
    provider.push_failure(500, "down");
    provider.push_failure(500, "still down");
    provider.push_response("too late");
    let client = test_client(provider.clone());

    let answer = client.complete_or_sentinel("s", "u").await;

    assert_eq!(answer, autoscribe::COMPLETION_FAILED_SENTINEL);
    assert_eq!(provider.get_calls().len(), 2);
}

#[tokio::test]
async fn test_client_treats_blank_reply_as_transient() -> Result<()> {
    setup_tracing();
    let provider = ScriptedAiProvider::new(["  \n", "Name>> Name: Smith"]);
    let client = test_client(provider.clone());

    assert_eq!(client.complete("s", "u").await?, "Name>> Name: Smith");
    assert_eq!(provider.get_calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_cached_provider_reuses_stored_reply() -> Result<()> {
    setup_tracing();
    let dir = tempdir()?;
    let inner = ScriptedAiProvider::new(["first"]);
    let cached = CachedProvider::new(Box::new(inner.clone()), dir.path().join("cache"));

    assert_eq!(cached.generate("sys", "usr").await?, "first");
    // The script is exhausted; only the cache can answer now.
    assert_eq!(cached.generate("sys", "usr").await?, "first");
    assert_eq!(inner.get_calls().len(), 1);

    let entry = cached.entry_path("sys", "usr");
    assert!(entry.starts_with(cached.dir()));
    assert_eq!(std::fs::read_to_string(entry)?, "first");

    // A different prompt pair is a different entry.
    assert_ne!(cached.entry_path("sy", "susr"), cached.entry_path("sys", "usr"));
    assert!(cached.generate("other", "usr").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_cached_provider_skips_empty_replies() -> Result<()> {
    setup_tracing();
    let dir = tempdir()?;
    let inner = ScriptedAiProvider::new(["", "second"]);
    let cached = CachedProvider::new(Box::new(inner.clone()), dir.path());

    assert_eq!(cached.generate("sys", "usr").await?, "");
    assert!(!cached.entry_path("sys", "usr").exists());
    assert_eq!(cached.generate("sys", "usr").await?, "second");
    assert_eq!(inner.get_calls().len(), 2);
    Ok(())
}

use integration_tests::{
    TestServer,
    llms::{AnthropicMock, MockModel, OpenAIMock},
};
use serde_json::json;

use super::CONFIG;

#[tokio::test]
async fn lists_configured_models() {
    let openai = OpenAIMock::new("OpenAI").with_models(vec![
        MockModel::new("gpt-4o").with_label("GPT-4o").with_max_tokens(16384),
        MockModel::new("gpt-4o-mini"),
    ]);

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(AnthropicMock::new("Anthropic")).await;

    let server = builder.build(CONFIG).await;
    let body = server.llm_client("/api").list_models().await;

    assert_eq!(
        body,
        json!({
            "data": [
                {"name": "claude-3-5-sonnet-latest", "label": "Claude 3.5 Sonnet", "provider": "Anthropic"},
                {"name": "gpt-4o", "label": "GPT-4o", "provider": "OpenAI", "maxTokenAllowed": 16384},
                {"name": "gpt-4o-mini", "label": "gpt-4o-mini", "provider": "OpenAI"}
            ]
        })
    );
}

#[tokio::test]
async fn discovered_models_follow_configured_ones() {
    let openai = OpenAIMock::new("OpenAI").discovering(&["gpt-4o", "o1-mini"]);
    let anthropic = AnthropicMock::new("Anthropic")
        .with_models(Vec::new())
        .discovering(&[("claude-3-5-haiku-20241022", "Claude Haiku 3.5")]);

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let body = server.llm_client("/api").list_models().await;

    assert_eq!(
        body,
        json!({
            "data": [
                {"name": "claude-3-5-haiku-20241022", "label": "Claude Haiku 3.5", "provider": "Anthropic"},
                {"name": "gpt-4o", "label": "GPT-4o", "provider": "OpenAI"},
                {"name": "o1-mini", "label": "o1-mini", "provider": "OpenAI"}
            ]
        })
    );
}

#[tokio::test]
async fn providers_without_key_are_hidden() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI").without_api_key()).await;
    builder.spawn_llm(AnthropicMock::new("Anthropic")).await;
    builder.spawn_llm(OpenAIMock::new("Ollama").keyless()).await;

    let server = builder.build(CONFIG).await;
    let body = server.llm_client("/api").list_models().await;

    let providers: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|model| model["provider"].as_str().unwrap())
        .collect();

    assert_eq!(providers, ["Anthropic", "Ollama"]);
}

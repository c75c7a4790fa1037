use integration_tests::{
    TestServer,
    llms::{AnthropicMock, OpenAIMock},
};
use serde_json::json;

use super::CONFIG;

#[tokio::test]
async fn enhances_prompt_with_requested_model() {
    let openai = OpenAIMock::new("OpenAI");
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(AnthropicMock::new("Anthropic")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({
            "message": "build a todo app",
            "model": "gpt-4o",
            "provider": {"name": "OpenAI", "staticModels": []}
        }))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.text().await.unwrap(), "Hello from OpenAI using gpt-4o");

    let body = requests.last().body;
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "system");

    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.starts_with("You are a professional prompt engineer"), "{prompt}");
    assert!(prompt.ends_with("<original_prompt>\nbuild a todo app\n</original_prompt>"), "{prompt}");
}

#[tokio::test]
async fn caller_key_reaches_the_provider() {
    let openai = OpenAIMock::new("OpenAI").without_api_key();
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({
            "message": "build a todo app",
            "model": "gpt-4o",
            "provider": {"name": "OpenAI"},
            "apiKeys": {"OpenAI": "sk-caller"}
        }))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    assert_eq!(requests.last().api_key.as_deref(), Some("sk-caller"));
}

#[tokio::test]
async fn missing_model_returns_400() {
    let openai = OpenAIMock::new("OpenAI");
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({"message": "build a todo app", "provider": {"name": "OpenAI"}}))
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Invalid or missing model");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn missing_provider_name_returns_400() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    for provider in [json!(null), json!({}), json!({"name": ""})] {
        let response = llm
            .enhancer(json!({"message": "build a todo app", "model": "gpt-4o", "provider": provider}))
            .await;

        assert_eq!(response.status(), 400, "{provider}");
        assert_eq!(response.text().await.unwrap(), "Invalid or missing provider");
    }
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.post_raw("/enhancer", "not json").await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn rejected_api_key_returns_401() {
    let anthropic = AnthropicMock::new("Anthropic").with_auth_error("invalid x-api-key");

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({
            "message": "build a todo app",
            "model": "claude-3-5-sonnet-latest",
            "provider": {"name": "Anthropic"}
        }))
        .await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), "Invalid or missing API key");
}

#[tokio::test]
async fn unknown_provider_returns_empty_500() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({
            "message": "build a todo app",
            "model": "gpt-4o",
            "provider": {"name": "Mistral"}
        }))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn provider_failure_returns_empty_500() {
    let openai = OpenAIMock::new("OpenAI").with_internal_error("The server had an error");

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .enhancer(json!({
            "message": "build a todo app",
            "model": "gpt-4o",
            "provider": {"name": "OpenAI"}
        }))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "");
}

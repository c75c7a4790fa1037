use integration_tests::{
    TestServer,
    llms::{AnthropicMock, MockModel, OpenAIMock},
};
use serde_json::json;

use super::{CONFIG, user};

#[tokio::test]
async fn directives_route_to_named_provider() {
    let openai = OpenAIMock::new("OpenAI");
    let anthropic = AnthropicMock::new("Anthropic");
    let openai_requests = openai.requests();
    let anthropic_requests = anthropic.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nWrite a haiku")]
        }))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.text().await.unwrap(), "Hello from OpenAI using gpt-4o");

    assert!(anthropic_requests.is_empty());

    let received = openai_requests.last();
    assert_eq!(received.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        received.body,
        json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "You are a test assistant."},
                {"role": "user", "content": "Write a haiku"}
            ],
            "max_tokens": 8000,
            "stream": true
        })
    );
}

#[tokio::test]
async fn conversation_without_directives_uses_defaults() {
    let anthropic = AnthropicMock::new("Anthropic");
    let requests = anthropic.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.chat(json!({"messages": [user("Hello there")]})).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "Hello from Claude using claude-3-5-sonnet-latest"
    );

    let received = requests.last();
    assert_eq!(received.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        received.body,
        json!({
            "model": "claude-3-5-sonnet-latest",
            "messages": [{"role": "user", "content": "Hello there"}],
            "system": "You are a test assistant.",
            "max_tokens": 8000,
            "stream": true
        })
    );
}

#[tokio::test]
async fn last_user_message_decides_the_route() {
    let openai = OpenAIMock::new("OpenAI");
    let anthropic = AnthropicMock::new("Anthropic");
    let openai_requests = openai.requests();
    let anthropic_requests = anthropic.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [
                user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nWrite a haiku"),
                {"role": "assistant", "content": "Autumn moonlight"},
                user("[Model: claude-3-5-sonnet-latest]\n\n[Provider: Anthropic]\n\nNow a limerick")
            ]
        }))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    assert!(openai_requests.is_empty());

    let received = anthropic_requests.last();
    assert_eq!(
        received.body["messages"],
        json!([
            {"role": "user", "content": "Write a haiku"},
            {"role": "assistant", "content": "Autumn moonlight"},
            {"role": "user", "content": "Now a limerick"}
        ])
    );
}

#[tokio::test]
async fn unregistered_model_keeps_default_model() {
    let openai = OpenAIMock::new("OpenAI");
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;
    builder.spawn_llm(AnthropicMock::new("Anthropic")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [user("[Model: gpt-unknown]\n\n[Provider: OpenAI]\n\nHi")]
        }))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    assert_eq!(requests.last().body["model"], "claude-3-5-sonnet-latest");
}

#[tokio::test]
async fn model_token_ceiling_is_applied() {
    let openai = OpenAIMock::new("OpenAI").with_models(vec![MockModel::new("gpt-4o").with_max_tokens(4096)]);
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")]
        }))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    assert_eq!(requests.last().body["max_tokens"], 4096);
}

#[tokio::test]
async fn caller_options_override_the_request() {
    let openai = OpenAIMock::new("OpenAI");
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")],
            "options": {
                "system": "Answer in French.",
                "maxTokens": 100,
                "temperature": 0.5,
                "seed": 7
            }
        }))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    let body = requests.last().body;
    assert_eq!(body["max_tokens"], 100);
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["seed"], 7);
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "Answer in French."}));
}

#[tokio::test]
async fn custom_response_is_streamed_unchanged() {
    let anthropic = AnthropicMock::new("Anthropic").with_response("haiku", "Autumn moonlight, a worm digs silently");

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.chat(json!({"messages": [user("Write a haiku")]})).await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Autumn moonlight, a worm digs silently");
}

#[tokio::test]
async fn caller_api_key_is_forwarded() {
    let openai = OpenAIMock::new("OpenAI").without_api_key();
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({
            "messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")],
            "apiKeys": {"OpenAI": "sk-caller"}
        }))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Hello from OpenAI using gpt-4o");

    assert_eq!(requests.last().api_key.as_deref(), Some("sk-caller"));
}

#[tokio::test]
async fn keyless_provider_sends_no_credentials() {
    let openai = OpenAIMock::new("Ollama").keyless();
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({"messages": [user("[Model: gpt-4o]\n\n[Provider: Ollama]\n\nHi")]}))
        .await;

    assert_eq!(response.status(), 200);
    response.text().await.unwrap();

    assert_eq!(requests.last().api_key, None);
}

#[tokio::test]
async fn missing_api_key_returns_401() {
    let openai = OpenAIMock::new("OpenAI").without_api_key();
    let requests = openai.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({"messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")]}))
        .await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), "Invalid or missing API key");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn rejected_api_key_returns_401() {
    let openai = OpenAIMock::new("OpenAI").with_auth_error("Incorrect API key provided");

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({"messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")]}))
        .await;

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn provider_failure_returns_empty_500() {
    let anthropic = AnthropicMock::new("Anthropic").with_internal_error("Overloaded");

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.chat(json!({"messages": [user("Hi")]})).await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn unknown_provider_returns_empty_500() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({"messages": [user("[Provider: Mistral]\n\nHi")]}))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenAIMock::new("OpenAI")).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.post_raw("/chat", r#"{"messages": ["#).await;
    assert_eq!(response.status(), 400);

    let response = llm.chat(json!({"conversation": []})).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn error_after_first_delta_truncates_the_body() {
    let openai = OpenAIMock::new("OpenAI").with_stream_error("The server had an error");

    let mut builder = TestServer::builder();
    builder.spawn_llm(openai).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm
        .chat(json!({"messages": [user("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nHi")]}))
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.text().await.is_err());
}

#[tokio::test]
async fn anthropic_error_event_truncates_the_body() {
    let anthropic = AnthropicMock::new("Anthropic").with_stream_error("Overloaded");

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;

    let server = builder.build(CONFIG).await;
    let llm = server.llm_client("/api");

    let response = llm.chat(json!({"messages": [user("Hi")]})).await;

    assert_eq!(response.status(), 200);
    assert!(response.text().await.is_err());
}

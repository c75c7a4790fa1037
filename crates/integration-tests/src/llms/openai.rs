use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response, Sse, sse::Event},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use super::common::{Failure, ReceivedRequest, RequestLog, deltas, find_custom_response};
use super::provider::{LlmProviderConfig, MockModel, ProviderType, TestLlmProvider};

/// Builder for a mock server speaking the OpenAI chat completions protocol
pub struct OpenAIMock {
    name: String,
    models: Vec<MockModel>,
    discovered: Vec<String>,
    discover_models: bool,
    api_key: Option<String>,
    requires_api_key: bool,
    custom_responses: BTreeMap<String, String>,
    failure: Option<Failure>,
    log: RequestLog,
}

impl OpenAIMock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: vec![MockModel::new("gpt-4o").with_label("GPT-4o")],
            discovered: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            discover_models: false,
            api_key: Some("test-key".to_string()),
            requires_api_key: true,
            custom_responses: BTreeMap::new(),
            failure: None,
            log: RequestLog::default(),
        }
    }

    /// Replace the statically configured models.
    pub fn with_models(mut self, models: Vec<MockModel>) -> Self {
        self.models = models;
        self
    }

    /// Let the server ask `GET /models`, which answers with the given ids.
    pub fn discovering(mut self, ids: &[&str]) -> Self {
        self.discover_models = true;
        self.discovered = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_response(mut self, trigger: impl Into<String>, response: impl Into<String>) -> Self {
        self.custom_responses.insert(trigger.into(), response.into());
        self
    }

    pub fn with_auth_error(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::Auth(message.into()));
        self
    }

    pub fn with_internal_error(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::Internal(message.into()));
        self
    }

    pub fn with_stream_error(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::MidStream(message.into()));
        self
    }

    /// No key in the configuration, callers have to bring their own.
    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    /// A local server that needs no key at all.
    pub fn keyless(mut self) -> Self {
        self.api_key = None;
        self.requires_api_key = false;
        self
    }

    /// The requests this mock receives once spawned.
    pub fn requests(&self) -> RequestLog {
        self.log.clone()
    }
}

impl TestLlmProvider for OpenAIMock {
    async fn spawn(self) -> anyhow::Result<LlmProviderConfig> {
        let state = Arc::new(TestOpenAIState {
            name: self.name.clone(),
            discovered: self.discovered,
            custom_responses: self.custom_responses,
            failure: self.failure,
            log: self.log,
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(list_models))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(LlmProviderConfig {
            name: self.name,
            address,
            provider_type: ProviderType::OpenAI,
            models: self.models,
            api_key: self.api_key,
            requires_api_key: self.requires_api_key,
            discover_models: self.discover_models,
        })
    }
}

struct TestOpenAIState {
    name: String,
    discovered: Vec<String>,
    custom_responses: BTreeMap<String, String>,
    failure: Option<Failure>,
    log: RequestLog,
}

async fn chat_completions(
    State(state): State<Arc<TestOpenAIState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let api_key = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    state.log.record(ReceivedRequest {
        body: body.clone(),
        api_key,
    });

    match &state.failure {
        Some(Failure::Auth(message)) => {
            let error = json!({
                "error": {
                    "message": message,
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }
            });

            return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
        }
        Some(Failure::Internal(message)) => {
            let error = json!({
                "error": {
                    "message": message,
                    "type": "server_error"
                }
            });

            return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
        }
        _ => {}
    }

    let model = body["model"].as_str().unwrap_or_default().to_string();

    let text = find_custom_response(&body["messages"], &state.custom_responses)
        .unwrap_or_else(|| format!("Hello from {} using {model}", state.name));

    let chunk = |delta: Value, finish_reason: Option<&str>| {
        let chunk = json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
        });

        Event::default().data(chunk.to_string())
    };

    let mut events = vec![chunk(json!({"role": "assistant"}), None)];
    events.extend(deltas(&text).map(|delta| chunk(json!({"content": delta}), None)));

    match &state.failure {
        Some(Failure::MidStream(message)) => {
            events.push(Event::default().data(json!({"error": {"message": message}}).to_string()));
        }
        _ => {
            events.push(chunk(json!({}), Some("stop")));
            events.push(Event::default().data("[DONE]"));
        }
    }

    Sse::new(futures::stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
}

async fn list_models(State(state): State<Arc<TestOpenAIState>>) -> Json<Value> {
    let data: Vec<Value> = state
        .discovered
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": 1_700_000_000,
                "owned_by": "test"
            })
        })
        .collect();

    Json(json!({"object": "list", "data": data}))
}

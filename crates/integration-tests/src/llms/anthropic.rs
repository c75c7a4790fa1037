use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response, Sse, sse::Event},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use super::common::{Failure, ReceivedRequest, RequestLog, deltas, find_custom_response};
use super::provider::{LlmProviderConfig, MockModel, ProviderType, TestLlmProvider};

/// Builder for a mock server speaking the Anthropic messages protocol
pub struct AnthropicMock {
    name: String,
    models: Vec<MockModel>,
    discovered: Vec<(String, String)>,
    discover_models: bool,
    api_key: Option<String>,
    custom_responses: BTreeMap<String, String>,
    failure: Option<Failure>,
    log: RequestLog,
}

impl AnthropicMock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: vec![MockModel::new("claude-3-5-sonnet-latest").with_label("Claude 3.5 Sonnet")],
            discovered: Vec::new(),
            discover_models: false,
            api_key: Some("test-key".to_string()),
            custom_responses: BTreeMap::new(),
            failure: None,
            log: RequestLog::default(),
        }
    }

    pub fn with_models(mut self, models: Vec<MockModel>) -> Self {
        self.models = models;
        self
    }

    /// Let the server ask `GET /models`, which answers with the given id and display name pairs.
    pub fn discovering(mut self, models: &[(&str, &str)]) -> Self {
        self.discover_models = true;
        self.discovered = models
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
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

    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    pub fn requests(&self) -> RequestLog {
        self.log.clone()
    }
}

impl TestLlmProvider for AnthropicMock {
    async fn spawn(self) -> anyhow::Result<LlmProviderConfig> {
        let state = Arc::new(TestAnthropicState {
            discovered: self.discovered,
            custom_responses: self.custom_responses,
            failure: self.failure,
            log: self.log,
        });

        let app = Router::new()
            .route("/v1/messages", post(create_message))
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
            provider_type: ProviderType::Anthropic,
            models: self.models,
            api_key: self.api_key,
            requires_api_key: true,
            discover_models: self.discover_models,
        })
    }
}

struct TestAnthropicState {
    discovered: Vec<(String, String)>,
    custom_responses: BTreeMap<String, String>,
    failure: Option<Failure>,
    log: RequestLog,
}

fn error_body(error_type: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "error": {
            "type": error_type,
            "message": message
        }
    })
}

fn event(name: &str, data: Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

async fn create_message(
    State(state): State<Arc<TestAnthropicState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !headers.contains_key("anthropic-version") {
        let error = error_body("invalid_request_error", "Missing anthropic-version header");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    let api_key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    state.log.record(ReceivedRequest {
        body: body.clone(),
        api_key,
    });

    match &state.failure {
        Some(Failure::Auth(message)) => {
            return (StatusCode::UNAUTHORIZED, Json(error_body("authentication_error", message))).into_response();
        }
        Some(Failure::Internal(message)) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(error_body("api_error", message))).into_response();
        }
        _ => {}
    }

    let model = body["model"].as_str().unwrap_or_default().to_string();

    let text = find_custom_response(&body["messages"], &state.custom_responses)
        .unwrap_or_else(|| format!("Hello from Claude using {model}"));

    let mut events = vec![
        event(
            "message_start",
            json!({
                "type": "message_start",
                "message": {
                    "id": "msg_test",
                    "type": "message",
                    "role": "assistant",
                    "model": model,
                    "content": [],
                    "usage": {"input_tokens": 10, "output_tokens": 1}
                }
            }),
        ),
        event(
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ),
        event("ping", json!({"type": "ping"})),
    ];

    events.extend(deltas(&text).map(|delta| {
        event(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": delta}}),
        )
    }));

    match &state.failure {
        Some(Failure::MidStream(message)) => {
            events.push(event("error", error_body("overloaded_error", message)));
        }
        _ => {
            events.push(event(
                "content_block_stop",
                json!({"type": "content_block_stop", "index": 0}),
            ));
            events.push(event(
                "message_delta",
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 15}}),
            ));
            events.push(event("message_stop", json!({"type": "message_stop"})));
        }
    }

    Sse::new(futures::stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
}

async fn list_models(State(state): State<Arc<TestAnthropicState>>) -> Json<Value> {
    let data: Vec<Value> = state
        .discovered
        .iter()
        .map(|(id, display_name)| {
            json!({
                "type": "model",
                "id": id,
                "display_name": display_name,
                "created_at": "2024-10-22T00:00:00Z"
            })
        })
        .collect();

    Json(json!({"data": data, "has_more": false}))
}

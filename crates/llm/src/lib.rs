use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use config::LlmConfig;

mod directive;
mod dispatch;
mod error;
mod messages;
mod normalize;
mod prompt;
mod provider;
mod registry;
mod relay;
mod request;
mod server;

pub use error::LlmError;

use messages::ConversationMessage;
use relay::{ChatRequest, EnhancerRequest};
use request::RequestContext;
use server::LlmServer;

pub(crate) type Result<T> = std::result::Result<T, LlmError>;

/// Creates an axum router for the LLM endpoints, nested under the configured path.
pub fn router(config: &LlmConfig) -> anyhow::Result<Router> {
    let server = Arc::new(
        LlmServer::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize LLM server: {e}"))?,
    );

    let routes = Router::new()
        .route("/chat", post(chat))
        .route("/enhancer", post(enhancer))
        .route("/models", get(list_models))
        .with_state(server);

    Ok(Router::new().nest(&config.path, routes))
}

/// Streams the answer to a conversation as plain text.
///
/// The model and provider come from directives in the user messages, falling
/// back to the configured defaults.
async fn chat(
    State(server): State<Arc<LlmServer>>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(|rejection| LlmError::InvalidRequest(rejection.body_text()))?;

    log::debug!("Chat request with {} messages", request.messages.len());

    let context = RequestContext::from_api_keys(request.api_keys);
    let options = request.options.unwrap_or_default();

    let stream = server.stream_text(request.messages, &context, options).await?;

    Ok(relay::text_response(stream))
}

/// Rewrites a prompt with the requested model and streams the result as plain text.
async fn enhancer(
    State(server): State<Arc<LlmServer>>,
    body: std::result::Result<Json<EnhancerRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(|rejection| LlmError::InvalidRequest(rejection.body_text()))?;
    let enhancement = request.validate()?;

    log::debug!(
        "Enhancing prompt with model '{}' of provider '{}'",
        enhancement.model,
        enhancement.provider
    );

    let context = RequestContext::from_api_keys(request.api_keys);
    let message = ConversationMessage::user(prompt::enhancement(
        &enhancement.model,
        &enhancement.provider,
        &enhancement.message,
    ));

    let stream = server.stream_text(vec![message], &context, Default::default()).await?;

    Ok(relay::text_response(stream))
}

/// Lists the models reachable with the configured API keys.
async fn list_models(State(server): State<Arc<LlmServer>>) -> impl IntoResponse {
    let response = server.list_models(&RequestContext::default()).await;

    log::debug!("Returning {} models", response.data.len());
    Json(response)
}

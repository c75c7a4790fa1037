//! Request bodies of the text endpoints and the plain text streaming response.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{
        HeaderValue,
        header::{CONTENT_TYPE, TRANSFER_ENCODING, X_CONTENT_TYPE_OPTIONS},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    dispatch::StreamOptions, error::LlmError, messages::ConversationMessage, provider::TextStream,
};

/// Body of the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatRequest {
    pub(crate) messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub(crate) api_keys: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub(crate) options: Option<StreamOptions>,
}

/// Body of the enhancer endpoint.
///
/// Fields are kept loose so that missing or mistyped values turn into the
/// endpoint's own validation errors instead of a generic decoding failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnhancerRequest {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    model: Option<Value>,
    #[serde(default)]
    provider: Option<Value>,
    #[serde(default)]
    pub(crate) api_keys: Option<BTreeMap<String, String>>,
}

/// A validated enhancer request.
#[derive(Debug, PartialEq)]
pub(crate) struct Enhancement {
    pub(crate) message: String,
    pub(crate) model: String,
    pub(crate) provider: String,
}

impl EnhancerRequest {
    /// Checks model and provider name. Nothing is dispatched when this fails.
    pub(crate) fn validate(&self) -> crate::Result<Enhancement> {
        let Some(model) = non_empty_str(self.model.as_ref()) else {
            return Err(LlmError::InvalidRequest("Invalid or missing model".to_string()));
        };

        let provider_name = self.provider.as_ref().and_then(|provider| provider.get("name"));

        let Some(provider) = non_empty_str(provider_name) else {
            return Err(LlmError::InvalidRequest("Invalid or missing provider".to_string()));
        };

        let message = match &self.message {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
        };

        Ok(Enhancement {
            message,
            model: model.to_string(),
            provider: provider.to_string(),
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|value| !value.is_empty())
}

/// Relays the text deltas as a chunked `text/plain` body.
///
/// The deltas are written unchanged. An error after the response has started
/// is logged and cuts the body short, the client sees a truncated transfer.
pub(crate) fn text_response(stream: TextStream) -> Response {
    let body = stream.map(|delta| match delta {
        Ok(text) => Ok(Bytes::from(text)),
        Err(e) => {
            log::error!("Aborting text stream after provider error: {e}");
            Err(e)
        }
    });

    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
        (TRANSFER_ENCODING, HeaderValue::from_static("chunked")),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
    ];

    (headers, Body::from_stream(body)).into_response()
}

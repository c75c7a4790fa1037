use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Text that marks an error as a credentials problem.
const API_KEY_MARKER: &str = "API key";

/// Errors of the routing and streaming pipeline.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request body is missing a required field or is malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// Provider not found in configuration.
    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    /// Neither the caller nor the configuration supplied a key for a provider that needs one.
    #[error("Missing API key for provider '{0}'")]
    MissingApiKey(String),

    /// The provider rejected the key.
    #[error("Invalid API key: {0}")]
    AuthenticationFailed(String),

    /// Provider API returned an error.
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Internal server error.
    /// If Some(message), it came from a provider and can be logged.
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl LlmError {
    /// Whether the error text points at a missing or rejected API key.
    ///
    /// Classification is done on the rendered message, so upstream errors such as
    /// "Incorrect API key provided" are treated as credential problems too.
    pub fn is_api_key_error(&self) -> bool {
        self.to_string().contains(API_KEY_MARKER)
    }

    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ if self.is_api_key_error() => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LlmError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match status {
            StatusCode::BAD_REQUEST => (status, self.to_string()).into_response(),
            StatusCode::UNAUTHORIZED => {
                log::warn!("Rejecting request with credentials error: {self}");
                (status, "Invalid or missing API key").into_response()
            }
            _ => {
                match &self {
                    Self::InternalError(Some(provider_msg)) => {
                        log::error!("Provider returned internal error: {provider_msg}");
                    }
                    _ => log::error!("Request failed: {self}"),
                }

                status.into_response()
            }
        }
    }
}

//! Error taxonomy for the search pipeline.
//!
//! [`ProviderError`] is what the AI provider driver reports. [`SearchError`]
//! is what the orchestrator and HTTP boundary speak; it renders itself as the
//! JSON error envelope returned to callers.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Message fragments the provider uses when it refuses a credential.
const CREDENTIAL_SIGNALS: &[&str] = &[
    "api_key_invalid",
    "api key not valid",
    "api key expired",
    "invalid api key",
    "permission_denied",
    "unauthenticated",
];

/// Failure reported by an [`LlmDriver`](crate::llm::LlmDriver).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the provider's error envelope.
        message: String,
    },

    /// The response body was not the expected shape.
    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// The provider answered but produced no usable text.
    #[error("provider returned no answer ({0})")]
    EmptyResponse(String),

    /// The call did not complete within the configured bound.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether this failure means the credential itself was refused.
    #[must_use]
    pub fn is_credential_rejection(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                if *status == 401 || *status == 403 {
                    return true;
                }
                let lower = message.to_lowercase();
                CREDENTIAL_SIGNALS.iter().any(|signal| lower.contains(signal))
            }
            _ => false,
        }
    }
}

/// Caller-visible failure of a search or follow-up.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A required input was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// Neither the request nor the process configuration carried an API key.
    #[error("An API key is required. Supply one with the request or configure a default key.")]
    MissingCredential,

    /// The provider refused the API key that was used.
    #[error("The API key was rejected by the provider: {0}")]
    CredentialRejected(String),

    /// The follow-up referenced a session this process does not hold.
    #[error("Session '{0}' was not found. Start a new search.")]
    SessionNotFound(String),

    /// Any other upstream failure.
    #[error("{0}")]
    Provider(String),
}

impl SearchError {
    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredential | Self::CredentialRejected(_) => StatusCode::UNAUTHORIZED,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::MissingCredential => "missing_api_key",
            Self::CredentialRejected(_) => "invalid_api_key",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Provider(_) => "provider_failure",
        }
    }

    /// Whether the caller should prompt the user for a credential.
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::CredentialRejected(_))
    }
}

impl From<ProviderError> for SearchError {
    fn from(err: ProviderError) -> Self {
        if err.is_credential_rejection() {
            let message = match err {
                ProviderError::Api { message, .. } => message,
                other => other.to_string(),
            };
            Self::CredentialRejected(message)
        } else {
            Self::Provider(err.to_string())
        }
    }
}

/// JSON error envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    requires_api_key: Option<bool>,
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            requires_api_key: self.requires_api_key().then_some(true),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

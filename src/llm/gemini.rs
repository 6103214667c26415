//! Google Generative Language API driver.
//!
//! This module implements the [`LlmDriver`] trait for the `generateContent`
//! endpoint with the `google_search` grounding tool enabled.

use crate::credential::ApiKey;
use crate::error::ProviderError;

use super::{GenerateRequest, GenerateResponse, LlmDriver, LlmSettings};

/// Header carrying the API key. Keeps the key out of URLs and access logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Driver for the Generative Language API.
#[derive(Clone)]
pub struct GeminiDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for GeminiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiDriver {
    /// Create a new driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl LlmDriver for GeminiDriver {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError> {
        let url = self.settings.generate_url();

        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Pull `error.message` out of the provider's error envelope, falling back to
/// the raw body or the status text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let from_envelope = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|err| err.get("message"))
                .and_then(|msg| msg.as_str())
                .map(ToString::to_string)
        });

    match from_envelope {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown provider error")
            .to_string(),
    }
}

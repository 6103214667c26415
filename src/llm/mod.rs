//! AI provider driver traits and wire types.
//!
//! This module models a `generateContent`-style chat API: a conversation is a
//! list of [`Content`] turns, each request carries a system instruction,
//! generation parameters, and the web-search grounding tool, and each answer
//! comes back with [`GroundingMetadata`] describing the cited web sources.
//!
//! # Drivers
//!
//! - [`GeminiDriver`]: Google Generative Language REST API
//!
//! The [`QueryExecutor`] sits on top of a driver and owns the conversational
//! bookkeeping for a [`Session`](crate::session::Session).

pub mod executor;
pub mod gemini;
pub mod grounding;

#[cfg(test)]
pub(crate) mod testing;

pub use executor::{QueryExecutor, QueryOutcome};
pub use gemini::GeminiDriver;
pub use grounding::{
    GroundingChunk, GroundingMetadata, GroundingSupport, SearchEntryPoint, TextSegment, WebSource,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credential::ApiKey;
use crate::error::ProviderError;

/// Default REST endpoint of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default language answers are written in.
pub const DEFAULT_DISPLAY_LANGUAGE: &str = "English";
/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(45);

/// Provider connection and generation settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the provider API.
    pub base_url: String,
    /// Model identifier (e.g., `gemini-2.5-flash`).
    pub model: String,
    /// Language the final answer must be written in.
    pub display_language: String,
    /// Sampling parameters sent with every request.
    pub generation: GenerationConfig,
    /// Upper bound on one provider round trip.
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            display_language: DEFAULT_DISPLAY_LANGUAGE.to_string(),
            generation: GenerationConfig::default(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl LlmSettings {
    /// Build the `generateContent` URL for the configured model.
    #[must_use]
    pub fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1beta/models/{}:generateContent", self.model)
    }

    /// The single system instruction every conversation is opened with.
    #[must_use]
    pub fn system_instruction(&self) -> String {
        format!(
            "You are a research assistant with live web search. \
             Formulate your web searches in English and prefer English-language sources. \
             Write the final answer in {language}, whatever language the sources use. \
             Organize the answer with short section labels ending in a colon, \
             bullet points for enumerations, and concise paragraphs.",
            language = self.display_language
        )
    }

    /// Assemble a grounded request over the given conversation turns.
    #[must_use]
    pub fn build_request(&self, contents: Vec<Content>) -> GenerateRequest {
        GenerateRequest {
            contents,
            system_instruction: Instruction {
                parts: vec![Part::text(self.system_instruction())],
            },
            generation_config: self.generation.clone(),
            tools: vec![Tool::default()],
        }
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The model answering.
    #[default]
    Model,
}

/// One turn of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// A model turn holding a single text part.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of all non-thought parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

/// A piece of a turn. Only text parts are produced or consumed here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set by thinking models on reasoning parts that are not answer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
            thought: None,
        }
    }
}

/// System instruction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub parts: Vec<Part>,
}

/// Sampling parameters. Kept low-temperature so answers lean deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

/// Tool declaration enabling web-search grounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "google_search")]
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSearch {}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Instruction,
    pub generation_config: GenerationConfig,
    pub tools: Vec<Tool>,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generated answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Why a prompt was refused outright, when it was.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Trait for provider drivers.
///
/// A driver performs exactly one provider round trip per call and never
/// retries. The credential is passed per call so one driver serves every
/// request regardless of whose key it carries.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Send one grounded request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_trims_slash() {
        let settings = LlmSettings {
            base_url: "https://example.test/".to_string(),
            ..LlmSettings::default()
        };
        assert_eq!(
            settings.generate_url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let settings = LlmSettings {
            display_language: "Japanese".to_string(),
            ..LlmSettings::default()
        };
        let request = settings.build_request(vec![Content::user("hello")]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["tools"][0].get("google_search").is_some());
        assert!(json["generationConfig"]["temperature"].as_f64().unwrap() < 0.5);
        let instruction = json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("English-language sources"));
        assert!(instruction.contains("Japanese"));
    }

    #[test]
    fn test_content_text_skips_thoughts() {
        let content = Content {
            role: Role::Model,
            parts: vec![
                Part {
                    text: Some("thinking...".to_string()),
                    thought: Some(true),
                },
                Part::text("Answer "),
                Part::text("here"),
            ],
        };
        assert_eq!(content.text(), "Answer here");
    }
}

//! Grounded query execution.
//!
//! The executor turns "ask this within that conversation" into exactly one
//! provider call:
//! 1. Replay the session's history plus the new user turn
//! 2. Attach the system instruction, generation settings and search tool
//! 3. Bound the call with the configured timeout
//! 4. On success, append the user turn and the raw model turn to the session
//!
//! A failed call leaves the session untouched.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::credential::ApiKey;
use crate::error::ProviderError;
use crate::session::Session;

use super::{Content, GenerateResponse, GroundingMetadata, LlmDriver, LlmSettings};

/// Result of one grounded query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Raw answer text as produced by the model.
    pub answer: String,
    /// Citations attached to the answer.
    pub grounding: GroundingMetadata,
    /// The conversation, now including this exchange.
    pub session: Session,
}

/// Runs grounded queries against an [`LlmDriver`].
#[derive(Clone)]
pub struct QueryExecutor {
    driver: Arc<dyn LlmDriver>,
    settings: LlmSettings,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("settings", &self.settings)
            .field("driver", &"LlmDriver")
            .finish()
    }
}

impl QueryExecutor {
    #[must_use]
    pub fn new(driver: Arc<dyn LlmDriver>, settings: LlmSettings) -> Self {
        Self { driver, settings }
    }

    /// Get the provider settings.
    #[must_use]
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Ask `text`, continuing `session` or opening a new conversation.
    pub async fn query(
        &self,
        session: Option<Session>,
        text: &str,
        api_key: &ApiKey,
    ) -> Result<QueryOutcome, ProviderError> {
        let mut session = session.unwrap_or_default();
        let user_turn = Content::user(text);

        let mut contents = session.history().to_vec();
        contents.push(user_turn.clone());
        let request = self.settings.build_request(contents);

        let started = Instant::now();
        let response = tokio::time::timeout(
            self.settings.timeout,
            self.driver.generate(api_key, request),
        )
        .await
        .map_err(|_elapsed| ProviderError::Timeout(self.settings.timeout))
        .and_then(|result| result)
        .inspect_err(|e| {
            warn!(
                name: "provider.call.failed",
                elapsed_ms = started.elapsed().as_millis(),
                error = %e,
                "Provider call failed"
            );
        })?;

        let (model_turn, grounding) = take_answer(response)?;
        let answer = model_turn.text();

        info!(
            name: "provider.call.completed",
            elapsed_ms = started.elapsed().as_millis(),
            answer_len = answer.len(),
            chunks = grounding.grounding_chunks.len(),
            supports = grounding.grounding_supports.len(),
            "Provider call completed"
        );

        session.record_exchange(user_turn, model_turn);

        Ok(QueryOutcome {
            answer,
            grounding,
            session,
        })
    }
}

/// Split the first candidate into its model turn and grounding metadata.
fn take_answer(response: GenerateResponse) -> Result<(Content, GroundingMetadata), ProviderError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = block_reason.map_or_else(
            || "no candidates".to_string(),
            |reason| format!("prompt blocked: {reason}"),
        );
        return Err(ProviderError::EmptyResponse(reason));
    };

    let finish_reason = candidate
        .finish_reason
        .unwrap_or_else(|| "unspecified".to_string());

    let content = candidate
        .content
        .filter(|c| !c.text().trim().is_empty())
        .ok_or_else(|| ProviderError::EmptyResponse(format!("finish reason {finish_reason}")))?;

    // Stored as the model turn regardless of the role the provider echoed.
    let model_turn = Content {
        role: super::Role::Model,
        parts: content.parts,
    };

    Ok((model_turn, candidate.grounding_metadata.unwrap_or_default()))
}

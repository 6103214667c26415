//! Search orchestration.
//!
//! Composes credential resolution, the grounded query, answer formatting,
//! source extraction and session bookkeeping into the two operations the HTTP
//! boundary exposes: [`SearchService::start_search`] and
//! [`SearchService::continue_follow_up`].
//!
//! Either the full envelope is returned or an error is; nothing partial.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::credential::CredentialResolver;
use crate::error::{ProviderError, SearchError};
use crate::format::format_answer;
use crate::llm::QueryExecutor;
use crate::session::SessionStore;
use crate::sources::{Source, extract_sources};

/// Result of a new search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub session_id: String,
    /// Formatted answer HTML.
    pub summary: String,
    pub sources: Vec<Source>,
}

/// Result of a follow-up; the session id is unchanged so none is returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpOutcome {
    pub summary: String,
    pub sources: Vec<Source>,
}

/// Orchestrates grounded searches and their follow-ups.
#[derive(Debug, Clone)]
pub struct SearchService {
    executor: Arc<QueryExecutor>,
    sessions: SessionStore,
    credentials: CredentialResolver,
}

impl SearchService {
    #[must_use]
    pub fn new(
        executor: Arc<QueryExecutor>,
        sessions: SessionStore,
        credentials: CredentialResolver,
    ) -> Self {
        Self {
            executor,
            sessions,
            credentials,
        }
    }

    /// Get the session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run a query in a brand new conversation.
    pub async fn start_search(
        &self,
        query: &str,
        api_key: Option<&str>,
    ) -> Result<SearchOutcome, SearchError> {
        let query = require("query", query)?;
        let request_id = Uuid::new_v4();
        let credential = self.credentials.resolve(api_key)?;

        info!(
            name: "search.started",
            %request_id,
            credential_source = %credential.source,
            query_len = query.len(),
            "Starting search"
        );

        let outcome = self
            .executor
            .query(None, query, &credential.key)
            .await
            .map_err(|e| classify(request_id, e))?;

        let summary = format_answer(&outcome.answer);
        let sources = extract_sources(&outcome.grounding);

        let session_id = self.sessions.create();
        self.sessions.put(&session_id, outcome.session).await;

        info!(
            name: "session.created",
            %request_id,
            session_id = %session_id,
            sources = sources.len(),
            "Search completed"
        );

        Ok(SearchOutcome {
            session_id,
            summary,
            sources,
        })
    }

    /// Run a query inside an existing conversation.
    ///
    /// The session is held exclusively for the duration of the provider call,
    /// so concurrent follow-ups on one id are applied one after the other.
    pub async fn continue_follow_up(
        &self,
        session_id: &str,
        query: &str,
        api_key: Option<&str>,
    ) -> Result<FollowUpOutcome, SearchError> {
        let session_id = require("sessionId", session_id)?;
        let query = require("query", query)?;
        let request_id = Uuid::new_v4();

        let Some(mut session) = self.sessions.checkout(session_id).await else {
            warn!(
                name: "session.not_found",
                %request_id,
                session_id = %session_id,
                "Follow-up for unknown session"
            );
            return Err(SearchError::SessionNotFound(session_id.to_string()));
        };

        let credential = self.credentials.resolve(api_key)?;

        info!(
            name: "follow_up.started",
            %request_id,
            session_id = %session_id,
            credential_source = %credential.source,
            prior_exchanges = session.exchange_count(),
            "Continuing session"
        );

        let outcome = self
            .executor
            .query(Some((*session).clone()), query, &credential.key)
            .await
            .map_err(|e| classify(request_id, e))?;

        let summary = format_answer(&outcome.answer);
        let sources = extract_sources(&outcome.grounding);
        *session = outcome.session;

        info!(
            name: "follow_up.completed",
            %request_id,
            session_id = %session_id,
            sources = sources.len(),
            "Follow-up completed"
        );

        Ok(FollowUpOutcome { summary, sources })
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, SearchError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SearchError::Validation(format!("'{field}' is required")));
    }
    Ok(trimmed)
}

fn classify(request_id: Uuid, err: ProviderError) -> SearchError {
    let mapped = SearchError::from(err);
    warn!(
        name: "search.failed",
        %request_id,
        kind = ?mapped.status(),
        error = %mapped,
        "Search failed"
    );
    mapped
}

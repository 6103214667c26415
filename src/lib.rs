//! Grounded Web Search
//!
//! An answer service that sends questions to a search-grounded language model,
//! formats the answer as HTML, and returns the web sources it cites. Each
//! search opens a server-side session so follow-up questions keep their
//! conversational context.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP API (`/api/search`, `/api/follow-up`, `/health`)
//! - **Orchestration**: Credential resolution, query, formatting and citation extraction
//! - **Provider**: Driver trait over the `generateContent` API with web-search grounding
//! - **Sessions**: In-memory conversation store with per-session locking
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`credential`]: API key resolution
//! - [`error`]: Provider and boundary error taxonomy
//! - [`format`]: Raw answer to markdown to HTML
//! - [`llm`]: Provider driver, wire types and grounded-query executor
//! - [`search`]: Start-search and follow-up orchestration
//! - [`server`]: Router, handlers and middleware
//! - [`session`]: Conversation sessions
//! - [`sources`]: Citation extraction

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod credential;
pub mod error;
pub mod format;
pub mod llm;
pub mod search;
pub mod server;
pub mod session;
pub mod sources;

use crate::config::AppConfig;

use credential::CredentialResolver;
use llm::{LlmDriver, QueryExecutor};
use search::SearchService;
use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Search and follow-up orchestration.
    pub search: Arc<SearchService>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("search", &self.search)
            .finish()
    }
}

impl AppState {
    /// Wire the services together around a provider driver.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, driver: Arc<dyn LlmDriver>) -> Self {
        let executor = Arc::new(QueryExecutor::new(driver, config.llm_settings()));
        let credentials = CredentialResolver::new(config.provider.api_key.as_deref());
        let search = Arc::new(SearchService::new(
            executor,
            SessionStore::new(),
            credentials,
        ));
        Self { search, config }
    }
}

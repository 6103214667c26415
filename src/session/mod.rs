//! Session and conversation thread management.
//!
//! This module provides in-memory session storage for keeping the
//! conversational context between an initial search and its follow-ups.
//! Sessions are identified by short random tokens and hold the full turn
//! history replayed to the provider.
//!
//! # Architecture
//!
//! - [`Session`]: The turn history of one conversation
//! - [`SessionStore`]: Thread-safe store for all live sessions
//!
//! # Example
//!
//! ```rust
//! use grounded_search::session::{Session, SessionStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SessionStore::new();
//! let id = store.create();
//! store.put(&id, Session::new()).await;
//!
//! assert!(store.get(&id).await.is_some());
//! # }
//! ```

mod thread;

pub use thread::{SESSION_ID_LEN, Session, SessionStore};

//! Catalog storage and refresh for context-lingo
//!
//! This crate keeps the phrase catalog on disk, refreshes it from the remote
//! endpoint in the background and starts engine sessions from the stored
//! snapshot and the user's settings.
//!
//! # Workflow Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use context_lingo::dom::Document;
//! use context_lingo_sync::{CatalogStore, HttpCatalogSource, Settings, start_session_with_refresh};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Settings from file and environment
//!     let settings = Settings::load(None)?;
//!
//!     // 2. Session over the current snapshot, then a refresh for the next run
//!     let store = CatalogStore::new("catalog.json");
//!     let source = Arc::new(HttpCatalogSource::new(&settings.catalog_url)?);
//!     let (mut session, refresh) = start_session_with_refresh(&store, &settings, None, source)?;
//!
//!     let mut doc = Document::parse("<body><p>Good morning</p></body>");
//!     session.run_initial_pass(&mut doc);
//!     refresh.await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod error;
pub mod mock;
pub mod remote;
pub mod settings;
pub mod source;
pub mod store;

// Re-export main types for convenient access
pub use bootstrap::{load_working_set, start_session, start_session_with_refresh};
pub use error::{SyncError, SyncResult};
pub use mock::{MockCatalogSource, MockMode};
pub use remote::HttpCatalogSource;
pub use settings::{DEFAULT_CATALOG_URL, Settings, parse_percentage};
pub use source::{CatalogSource, refresh_catalog, spawn_refresh};
pub use store::CatalogStore;

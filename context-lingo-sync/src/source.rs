//! Catalog source trait and refresh workflow
//!
//! A `CatalogSource` produces a fresh catalog for a user, whether from the
//! remote endpoint ([`crate::HttpCatalogSource`]) or fixed data
//! ([`crate::MockCatalogSource`]). The refresh writes the result to the
//! snapshot store; it never touches a running session.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use context_lingo_sync::{CatalogStore, DEFAULT_CATALOG_URL, HttpCatalogSource, spawn_refresh};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(HttpCatalogSource::new(DEFAULT_CATALOG_URL)?);
//!     let store = CatalogStore::new("catalog.json");
//!     let handle = spawn_refresh(source, store, "learner42".to_string());
//!     // ... run the session against the current snapshot ...
//!     handle.await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use context_lingo::Catalog;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};
use crate::store::CatalogStore;

/// Provider of fresh catalogs
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full catalog for `username`
    ///
    /// # Errors
    ///
    /// `SyncError::CatalogUnavailable` when the source has nothing usable,
    /// `SyncError::Network` for transport failures.
    async fn fetch(&self, username: &str) -> SyncResult<Catalog>;

    /// Name used in logs
    fn source_name(&self) -> &str;
}

/// Fetch a catalog and persist it, returning the number of entries saved
pub async fn refresh_catalog(
    source: &dyn CatalogSource,
    store: &CatalogStore,
    username: &str,
) -> SyncResult<usize> {
    info!("Refreshing catalog from {}", source.source_name());
    let catalog = source.fetch(username).await.map_err(|e| match e {
        unavailable @ SyncError::CatalogUnavailable(_) => unavailable,
        other => SyncError::CatalogUnavailable(other.to_string()),
    })?;
    store.save(&catalog)?;
    Ok(catalog.len())
}

/// Run [`refresh_catalog`] in the background
///
/// The task logs a failure instead of returning it; the handle yields the
/// number of entries saved, or `None` if the refresh failed.
pub fn spawn_refresh(
    source: Arc<dyn CatalogSource>,
    store: CatalogStore,
    username: String,
) -> JoinHandle<Option<usize>> {
    tokio::spawn(async move {
        match refresh_catalog(source.as_ref(), &store, &username).await {
            Ok(count) => {
                info!("Catalog refreshed: {} entries", count);
                Some(count)
            }
            Err(e) => {
                warn!("{}; keeping the current snapshot", e);
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCatalogSource, MockMode};

    fn pairs() -> Vec<(String, Vec<String>)> {
        vec![
            ("hello".to_string(), vec!["bonjour".to_string()]),
            ("thank you".to_string(), vec!["merci".to_string()]),
        ]
    }

    #[tokio::test]
    async fn test_refresh_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        let source = MockCatalogSource::new(MockMode::Entries(pairs()));

        let count = refresh_catalog(&source, &store, "ana").await.unwrap();
        assert_eq!(count, 2);
        let saved = store.load().unwrap();
        assert_eq!(saved.entries()[0].source, "thank you");
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        store
            .save(&Catalog::from_pairs(pairs()))
            .unwrap();

        let source = MockCatalogSource::new(MockMode::Error("offline".to_string()));
        let result = refresh_catalog(&source, &store, "ana").await;
        assert!(matches!(result, Err(SyncError::CatalogUnavailable(_))));
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_network_errors_reported_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        let source = MockCatalogSource::new(MockMode::NetworkError("reset".to_string()));
        match refresh_catalog(&source, &store, "ana").await {
            Err(SyncError::CatalogUnavailable(msg)) => assert!(msg.contains("reset")),
            other => panic!("Expected CatalogUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawned_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        let source: Arc<dyn CatalogSource> =
            Arc::new(MockCatalogSource::with_delay(MockMode::Entries(pairs()), 10));

        let handle = spawn_refresh(source, store.clone(), "ana".to_string());
        assert_eq!(handle.await.unwrap(), Some(2));
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_spawned_refresh_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        let source: Arc<dyn CatalogSource> =
            Arc::new(MockCatalogSource::new(MockMode::Error("down".to_string())));
        let handle = spawn_refresh(source, store.clone(), String::new());
        assert_eq!(handle.await.unwrap(), None);
        assert!(store.load().unwrap().is_empty());
    }
}

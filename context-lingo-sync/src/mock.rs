//! Mock catalog source for tests and offline runs
//!
//! ```ignore
//! use context_lingo_sync::{CatalogSource, MockCatalogSource, MockMode};
//!
//! #[tokio::test]
//! async fn test_fetch() {
//!     let mock = MockCatalogSource::new(MockMode::Entries(vec![
//!         ("hello".to_string(), vec!["bonjour".to_string()]),
//!     ]));
//!     assert_eq!(mock.fetch("anyone").await.unwrap().len(), 1);
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use context_lingo::Catalog;

use crate::error::{SyncError, SyncResult};
use crate::source::CatalogSource;

/// Behaviors the mock can simulate
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Return these `(phrase, variants)` pairs
    Entries(Vec<(String, Vec<String>)>),

    /// Answer as the endpoint would, from a raw response body
    Response(String),

    /// The endpoint has no catalog to offer
    Error(String),

    /// Transport failure
    NetworkError(String),
}

/// Deterministic catalog source
#[derive(Debug, Clone)]
pub struct MockCatalogSource {
    mode: MockMode,
    /// Simulated network delay in milliseconds
    delay_ms: u64,
}

impl MockCatalogSource {
    pub fn new(mode: MockMode) -> Self {
        Self { mode, delay_ms: 0 }
    }

    /// Create a mock that waits `delay_ms` before answering
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self { mode, delay_ms }
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn fetch(&self, _username: &str) -> SyncResult<Catalog> {
        self.apply_delay().await;

        match &self.mode {
            MockMode::Entries(pairs) => Ok(Catalog::from_pairs(pairs.clone())),
            MockMode::Response(body) => crate::remote::HttpCatalogSource::parse_response(body),
            MockMode::Error(msg) => Err(SyncError::CatalogUnavailable(msg.clone())),
            MockMode::NetworkError(msg) => Err(SyncError::Network(msg.clone())),
        }
    }

    fn source_name(&self) -> &str {
        "Mock catalog source"
    }
}

//! HTTP catalog source
//!
//! Posts the user identifier as a form field and reads the phrase table from
//! the response:
//!
//! ```text
//! POST /source_to_target_phrases/
//! username=learner42
//!
//! {"source_to_target_translations": {"hello": ["bonjour", "salut"], ...}}
//! ```
//!
//! The endpoint may answer with a JSON document served as plain text, so the
//! body is read as text and parsed here.

use std::time::Duration;

use async_trait::async_trait;
use context_lingo::Catalog;
use serde_json::Value;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::source::CatalogSource;

/// Key of the phrase table in the response body
pub const TRANSLATIONS_KEY: &str = "source_to_target_translations";

/// Catalog source backed by the remote phrase endpoint
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    /// Request timeout for a refresh
    const TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a source posting to `url`
    ///
    /// # Errors
    ///
    /// `SyncError::Config` if the URL is empty, `SyncError::Network` if the
    /// HTTP client cannot be built.
    pub fn new(url: &str) -> SyncResult<Self> {
        if url.trim().is_empty() {
            return Err(SyncError::Config("Catalog URL cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse a refresh response body into a catalog
    ///
    /// Entries that are not arrays of strings are dropped; a body without the
    /// phrase table is `CatalogUnavailable`.
    pub fn parse_response(body: &str) -> SyncResult<Catalog> {
        let json: Value = serde_json::from_str(body).map_err(|e| {
            SyncError::CatalogUnavailable(format!("Failed to parse response: {}", e))
        })?;
        let table = json.get(TRANSLATIONS_KEY).ok_or_else(|| {
            SyncError::CatalogUnavailable(format!(
                "Invalid response: missing '{}'",
                TRANSLATIONS_KEY
            ))
        })?;
        Catalog::from_json_map(table)
            .map_err(|e| SyncError::CatalogUnavailable(format!("Invalid response: {}", e)))
    }
}

impl std::fmt::Debug for HttpCatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogSource")
            .field("url", &self.url)
            .finish()
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self, username: &str) -> SyncResult<Catalog> {
        debug!("POST {} (username: '{}')", self.url, username);
        let response = self
            .client
            .post(&self.url)
            .form(&[("username", username)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SyncError::CatalogUnavailable(format!(
                "Catalog endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        Self::parse_response(&body)
    }

    fn source_name(&self) -> &str {
        "Remote phrase endpoint"
    }
}

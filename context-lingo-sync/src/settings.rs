//! User settings
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. an optional JSON file (camelCase keys, every field optional),
//! 2. environment variables,
//! 3. command-line flags, applied by the caller.
//!
//! ```json
//! {
//!   "username": "learner42",
//!   "replacementPercentage": 40,
//!   "workingSetSize": 300
//! }
//! ```

use std::fs;
use std::path::Path;

use context_lingo::{DEFAULT_WORKING_SET_SIZE, ExclusionRules, SessionConfig, StyleTokens};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Endpoint the catalog refresh posts to
pub const DEFAULT_CATALOG_URL: &str =
    "https://duolingo-django-api.herokuapp.com/source_to_target_phrases/";

pub const ENV_USERNAME: &str = "CONTEXT_LINGO_USERNAME";
pub const ENV_PERCENTAGE: &str = "CONTEXT_LINGO_PERCENTAGE";
pub const ENV_CATALOG_URL: &str = "CONTEXT_LINGO_CATALOG_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Opaque identifier sent with catalog refreshes
    pub username: String,
    pub replacement_percentage: u8,
    pub catalog_url: String,
    /// Entries sampled from the snapshot for one session
    pub working_set_size: usize,
    pub styles: StyleTokens,
    pub exclusions: ExclusionRules,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            username: String::new(),
            replacement_percentage: 100,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            working_set_size: DEFAULT_WORKING_SET_SIZE,
            styles: StyleTokens::default(),
            exclusions: ExclusionRules::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read settings '{}': {}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            SyncError::Config(format!(
                "Failed to parse settings '{}': {}",
                path.display(),
                e
            ))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// File settings (or defaults) with environment overrides applied
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> SyncResult<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables
    pub fn apply_env_with<F>(&mut self, lookup: F) -> SyncResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup(ENV_USERNAME) {
            debug!("{} overrides username", ENV_USERNAME);
            self.username = username;
        }
        if let Some(raw) = lookup(ENV_PERCENTAGE) {
            self.replacement_percentage = parse_percentage(&raw)
                .map_err(|e| SyncError::Config(format!("{}: {}", ENV_PERCENTAGE, e)))?;
        }
        if let Some(url) = lookup(ENV_CATALOG_URL) {
            self.catalog_url = url;
        }
        self.validate()
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.replacement_percentage > 100 {
            return Err(SyncError::Config(format!(
                "replacementPercentage must be between 0 and 100, got {}",
                self.replacement_percentage
            )));
        }
        if self.catalog_url.trim().is_empty() {
            return Err(SyncError::Config("catalogUrl cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Engine configuration derived from these settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            replacement_percentage: self.replacement_percentage,
            styles: self.styles.clone(),
            exclusions: self.exclusions.clone(),
        }
    }
}

/// Parse a replacement percentage in 0..=100
pub fn parse_percentage(raw: &str) -> Result<u8, String> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", raw))?;
    if value > 100 {
        return Err(format!("{} is out of range 0-100", value));
    }
    Ok(value as u8)
}

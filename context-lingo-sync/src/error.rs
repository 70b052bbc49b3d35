use context_lingo::SwapError;

/// Error types for catalog storage, refresh and settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote catalog could not be obtained or understood
    CatalogUnavailable(String),
    /// Transport-level failure talking to the catalog endpoint
    Network(String),
    /// Reading or writing the local snapshot failed
    Store(String),
    /// Invalid settings, environment or command-line values
    Config(String),
    /// Error reported by the substitution engine
    Engine(SwapError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::CatalogUnavailable(msg) => write!(f, "Catalog unavailable: {}", msg),
            SyncError::Network(msg) => write!(f, "Network error: {}", msg),
            SyncError::Store(msg) => write!(f, "Catalog store error: {}", msg),
            SyncError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SyncError::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Store(format!("invalid JSON: {}", err))
    }
}

impl From<SwapError> for SyncError {
    fn from(err: SwapError) -> Self {
        SyncError::Engine(err)
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Error types for the phrase substitution engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// A catalog entry was rejected (empty phrase, no usable variants)
    InvalidEntry(String),
    /// A phrase pattern could not be compiled
    Pattern(String),
    /// A region's content could not be normalized or re-spliced safely
    MalformedContent(String),
    /// A raw match could not be traced back to a catalog entry
    NoResolvableEntry(String),
    /// A node reference does not fit the requested operation
    InvalidNode(String),
    /// Invalid engine configuration
    Config(String),
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapError::InvalidEntry(msg) => write!(f, "Invalid catalog entry: {}", msg),
            SwapError::Pattern(msg) => write!(f, "Pattern error: {}", msg),
            SwapError::MalformedContent(msg) => write!(f, "Malformed content: {}", msg),
            SwapError::NoResolvableEntry(text) => {
                write!(f, "No catalog entry resolves match '{}'", text)
            }
            SwapError::InvalidNode(msg) => write!(f, "Invalid node: {}", msg),
            SwapError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SwapError {}

impl From<regex::Error> for SwapError {
    fn from(err: regex::Error) -> Self {
        SwapError::Pattern(err.to_string())
    }
}

/// Result type for engine operations
pub type SwapResult<T> = Result<T, SwapError>;

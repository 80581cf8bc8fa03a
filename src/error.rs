use thiserror::Error;

/// Failures reported by a search backend capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached (connect failure, timeout, broken transport)
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but refused the request
    #[error("Search backend rejected request: {0}")]
    Rejected(String),

    /// The backend answered with something this service cannot interpret
    #[error("Invalid response from search backend: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// The backend's own diagnostic, without the classification prefix
    pub fn diagnostic(&self) -> &str {
        match self {
            BackendError::Unavailable(msg) => msg,
            BackendError::Rejected(msg) => msg,
            BackendError::InvalidResponse(msg) => msg,
        }
    }
}

/// Indexer error types
#[derive(Error, Debug)]
pub enum IndexError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document nesting exceeded the flattening limit
    #[error("Document nesting exceeds maximum depth of {max_depth} at path '{path}'")]
    DepthExceeded { max_depth: usize, path: String },

    /// Identifier could not be decoded into a document key
    #[error("Malformed identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    /// Backend returned a record whose identifier cannot be decoded
    #[error("Search result corrupt, identifier '{identifier}' cannot be decoded: {reason}")]
    SearchResultCorrupt { identifier: String, reason: String },

    /// Backend refused an index write
    #[error("Index write failed: {0}")]
    IndexWriteFailed(String),

    /// Backend refused a delete
    #[error("Index delete failed: {0}")]
    IndexDeleteFailed(String),

    /// Backend unreachable or the call failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IndexError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            IndexError::Configuration(_) => "CONFIGURATION_ERROR",
            IndexError::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            IndexError::MalformedIdentifier { .. } => "MALFORMED_IDENTIFIER",
            IndexError::SearchResultCorrupt { .. } => "SEARCH_RESULT_CORRUPT",
            IndexError::IndexWriteFailed(_) => "INDEX_WRITE_FAILED",
            IndexError::IndexDeleteFailed(_) => "INDEX_DELETE_FAILED",
            IndexError::Backend(_) => "BACKEND_ERROR",
        }
    }

    /// Errors caused by the input rather than by the backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IndexError::DepthExceeded { .. }
                | IndexError::MalformedIdentifier { .. }
                | IndexError::SearchResultCorrupt { .. }
        )
    }

    /// Errors raised while talking to the backend
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            IndexError::IndexWriteFailed(_)
                | IndexError::IndexDeleteFailed(_)
                | IndexError::Backend(_)
        )
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for IndexError {
    fn from(err: config::ConfigError) -> Self {
        IndexError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IndexError>;

//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Query construction failed
    #[error("Query construction failed: {0}")]
    QueryBuildFailed(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Document deletion failed: {0}")]
    DeletionFailed(String),

    /// Argument rejected before any mutation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored document could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),
}

impl SearchError {
    /// Whether the failure came from reading or writing index storage
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SearchError::IndexInitFailed(_)
                | SearchError::SearchFailed(_)
                | SearchError::IndexingFailed(_)
                | SearchError::DeletionFailed(_)
                | SearchError::IoError(_)
                | SearchError::TantivyError(_)
        )
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::QueryBuildFailed(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            SearchError::QueryBuildFailed(msg) => AppError::InvalidArgument(msg),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Serialization(msg) => AppError::Serialization(msg),
            SearchError::IoError(err) => AppError::Io(err),
            _ => AppError::Storage(err.to_string()),
        }
    }
}

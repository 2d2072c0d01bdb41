use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Underlying index storage read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Relational collaborator (event table / index queue) failure
    #[error("Database error: {0}")]
    Database(String),

    /// Argument rejected before any mutation took place
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Field type that cannot be encoded or queried
    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Handler failure while preparing or applying a drained batch
    #[error("Processing error: {0}")]
    Processing(String),

    /// Handler failure while completing a drained batch; index state may be
    /// partially committed
    #[error("Fatal indexing error: {0}")]
    IndexingFatal(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::UnsupportedFieldType(_) => "UNSUPPORTED_FIELD_TYPE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Processing(_) => "PROCESSING_ERROR",
            AppError::IndexingFatal(_) => "INDEXING_FATAL",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error came from the index storage layer
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::Io(_))
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Conversion from prometheus::Error
impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Internal(format!("metrics: {}", err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

// Central Error Type for the Application

use thiserror::Error;

/// Ingestion-fatal errors: reported synchronously, no job is created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("CSV has no rows")]
    NoRows,

    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("Malformed CSV: {0}")]
    Malformed(String),
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions live in the adapter crates
// (orphan rules), mapped to AppError::Database / port-specific errors there.

//! Error types for Gjenlyd.

use crate::engine::DocumentState;
use thiserror::Error;

/// Library-level error type for Gjenlyd operations.
#[derive(Error, Debug)]
pub enum GjenlydError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("No index found for document: {0}")]
    IndexNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Document not ready for queries (state: {state})")]
    NotReady { state: DocumentState },

    #[error("Processing was cancelled")]
    Cancelled,

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Gjenlyd operations.
pub type Result<T> = std::result::Result<T, GjenlydError>;

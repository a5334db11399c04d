use thiserror::Error;

/// Result type alias for studylog-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for change detection and log merging
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

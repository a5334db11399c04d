//! Error types for the file and collection stores

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing study data
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No collection.anki2 in the profile directory
    #[error("Could not find collection.anki2 in {}", .0.display())]
    CollectionNotFound(PathBuf),

    /// Profile directory missing
    #[error("Anki data directory not found at {}", .0.display())]
    DataDirNotFound(PathBuf),

    /// No default Anki location for this OS
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    /// A file could not be created, synced or renamed into place
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a write error for `path`
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write { path: path.to_path_buf(), source }
    }

    /// Create a collection-not-found error
    pub fn collection_not_found(dir: impl Into<PathBuf>) -> Self {
        Self::CollectionNotFound(dir.into())
    }

    /// Create a data-dir-not-found error
    pub fn data_dir_not_found(dir: impl Into<PathBuf>) -> Self {
        Self::DataDirNotFound(dir.into())
    }
}

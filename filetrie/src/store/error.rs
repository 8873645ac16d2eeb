//! Store Error Module.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Custom error definitions.
    #[error("invalid key '{}', nothing left after sanitizing", .0)]
    InvalidKey(String),

    #[error("values cannot be ordered: {}", .0)]
    UnsortableValue(String),

    #[error("unknown sort mode '{}'", .0)]
    UnknownSortMode(String),

    #[error("metadata version {} is newer than supported version {}", .0, .1)]
    UnsupportedVersion(u32, u32),

    #[error("path '{}' exists, but is not a directory", .0.display())]
    NotADirectory(std::path::PathBuf),
}

//! Error types shared by the tracking crates.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty field path")]
    Empty,
    #[error("empty token in field path: {0}")]
    EmptyToken(String),
    #[error("path not found: {path} (missing segment `{segment}`)")]
    NotFound { path: String, segment: String },
    #[error("invalid array index `{token}` in path {path}")]
    InvalidIndex { path: String, token: String },
    #[error("`{0}` is a reserved field")]
    Reserved(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    /// The stored version moved on since the record was loaded.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("record store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("path: {0}")]
    Path(#[from] PathError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

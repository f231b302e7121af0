use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FeeError {
    /// Store write failures (the "conflict or I/O" class) as opposed to caller mistakes
    pub fn is_store_failure(&self) -> bool {
        matches!(self, FeeError::Conflict(_) | FeeError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;

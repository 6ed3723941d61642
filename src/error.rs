//! Error handling

use std::fmt;

use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

/// Coarse failure class, used for delivery policy, logs and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    TypeMismatch,
    MissingField,
    StoreFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::StoreFailure => "store_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while turning one message into a stored detection
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed envelope: {0}")]
    Decode(String),

    #[error("attribute '{key}' expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("attribute '{0}' is missing")]
    MissingField(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Decode(_) => ErrorKind::Decode,
            IngestError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            IngestError::MissingField(_) => ErrorKind::MissingField,
            IngestError::Store(_) => ErrorKind::StoreFailure,
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Decode(err.to_string())
    }
}

/// Detection store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Broker transport failure
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),
}

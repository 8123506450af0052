use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("record rejected: {0}")]
    RecordValidation(#[from] RecordValidationError),

    #[error("failed to open database: {0}")]
    StorageOpen(#[source] rusqlite::Error),

    #[error("database schema version {found} is newer than this program's ({supported})")]
    SchemaTooNew { found: usize, supported: usize },

    #[error("failed to write batch: {0}")]
    StorageWrite(#[source] rusqlite::Error),

    #[error("failed to read stored rows: {0}")]
    StorageRead(#[source] rusqlite::Error),

    #[error("no point found inside the polygon after {attempts} attempts")]
    SamplingTimeout { attempts: usize },

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("malformed directions response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("directions response has no route")]
    EmptyResponse,

    #[error("directions provider failed: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why a raw record could not be turned into a [`crate::Record`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordValidationError {
    #[error("expected {expected} fields, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("field #{position} ({field}) must be {expected}, got {actual}")]
    Type {
        position: usize,
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field #{position} ({field}) is not finite")]
    NonFinite { position: usize, field: &'static str },
}

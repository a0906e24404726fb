use marginalia_storage::StorageError;
use std::fmt;

/// Which store call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceOp {
    HasData,
    Load,
    Save,
    Clear,
}

impl fmt::Display for PersistenceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistenceOp::HasData => "has_data",
            PersistenceOp::Load => "load",
            PersistenceOp::Save => "save",
            PersistenceOp::Clear => "clear",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("annotation store {op} failed for document {document}: {source}")]
    Persistence {
        op: PersistenceOp,
        document: String,
        #[source]
        source: StorageError,
    },
    #[error("annotation controller has been dropped")]
    Detached,
}

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {key}")]
    InvalidValue { key: String },
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

use std::path::PathBuf;

use thiserror::Error;

use crate::transform::TransformError;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed attributes at `{path}`: {source}")]
    Attributes {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("attribute `{key}` at `{path}` is invalid: {reason}")]
    InvalidAttribute {
        path: String,
        key: String,
        reason: String,
    },

    #[error("dataset `{0}` does not exist")]
    MissingDataset(String),

    #[error("unsupported compression `{0}`; only raw blocks can be read")]
    UnsupportedCompression(String),

    #[error("unsupported data type `{0}`")]
    UnsupportedDataType(String),

    #[error("corrupt block {grid_position:?} in `{path}`: {reason}")]
    CorruptBlock {
        path: String,
        grid_position: Vec<u64>,
        reason: String,
    },

    #[error("invalid transform: {0}")]
    Transform(#[from] TransformError),
}

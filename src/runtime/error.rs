use crate::crop::CropError;
use crate::formats::IoError;
use crate::source::SourceError;
use crate::storage::StorageError;
use crate::transform::TransformError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage service error: {0}")]
    Storage(#[from] StorageError),

    #[error("source service error: {0}")]
    Source(#[from] SourceError),

    #[error("crop service error: {0}")]
    Crop(#[from] CropError),

    #[error("export service error: {0}")]
    Io(#[from] IoError),

    #[error("invalid transform: {0}")]
    Transform(#[from] TransformError),
}

use crate::crop::CropError;
use crate::model::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported dataset layout for this format: {0}")]
    UnsupportedLayout(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encode failure: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF encode failure: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("sidecar serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core dataset/metadata failure: {0}")]
    Core(#[from] CoreError),

    #[error("cannot lay out crop: {0}")]
    Crop(#[from] CropError),
}

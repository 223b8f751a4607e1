use thiserror::Error;

use crate::storage::StorageError;
use crate::transform::TransformError;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open scale level {level} of channel {channel}: {source}")]
    OpenLevel {
        channel: usize,
        level: usize,
        #[source]
        source: StorageError,
    },

    #[error("failed to read pixels: {0}")]
    Read(#[from] StorageError),

    #[error("invalid metadata for channel {channel}: {reason}")]
    Metadata { channel: usize, reason: String },

    #[error("scale level {level} does not exist; valid range is [0, {max}]")]
    LevelOutOfRange { level: usize, max: usize },

    #[error("region dimensionality {region} does not match level dimensionality {level}")]
    RegionRank { region: usize, level: usize },

    #[error("invalid transform: {0}")]
    Transform(#[from] TransformError),
}

impl SourceError {
    pub(crate) fn metadata(channel: usize, reason: impl Into<String>) -> Self {
        Self::Metadata {
            channel,
            reason: reason.into(),
        }
    }
}

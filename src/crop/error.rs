use thiserror::Error;

use crate::model::CoreError;
use crate::source::SourceError;
use crate::transform::TransformError;

use super::HyperstackDims;

pub type Result<T> = std::result::Result<T, CropError>;

/// Coarse classification callers use to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Metadata,
    Range,
    Cancelled,
    Layout,
}

#[derive(Debug, Error)]
pub enum CropError {
    #[error(
        "specified incorrect scale level {requested} for channel {channel}; valid range is [0, {max_level}]"
    )]
    LevelOutOfRange {
        channel: usize,
        requested: i64,
        max_level: usize,
    },

    #[error("crop size {0:?} must be positive along every axis and fit in memory")]
    InvalidSize([u64; 3]),

    #[error("no channels to crop")]
    NoChannels,

    #[error("channel {channel}: {source}")]
    Source {
        channel: usize,
        #[source]
        source: SourceError,
    },

    #[error("channel {channel} level transform cannot be inverted: {source}")]
    Transform {
        channel: usize,
        #[source]
        source: TransformError,
    },

    #[error("index {index:?} lies outside the crop of size {size:?}")]
    IndexOutsideView { index: [u64; 3], size: [u64; 3] },

    #[error("ambiguous hyperstack dimensions {dims:?} for depth {depth}")]
    AmbiguousAxes { dims: HyperstackDims, depth: usize },

    #[error("cannot stack channel crops: {0}")]
    Stack(String),

    #[error("crop cancelled")]
    Cancelled,

    #[error("crop operation already finished")]
    Finished,

    #[error("invalid crop output: {0}")]
    Core(#[from] CoreError),

    #[error("failed to read crop defaults: {0}")]
    Config(String),
}

impl CropError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LevelOutOfRange { .. } | Self::InvalidSize(_) | Self::IndexOutsideView { .. } => {
                ErrorKind::Range
            }
            Self::Source { source, .. } => match source {
                SourceError::OpenLevel { .. } | SourceError::Read(_) => ErrorKind::Io,
                SourceError::LevelOutOfRange { .. } => ErrorKind::Range,
                _ => ErrorKind::Metadata,
            },
            Self::NoChannels | Self::Transform { .. } | Self::Config(_) => ErrorKind::Metadata,
            Self::Cancelled | Self::Finished => ErrorKind::Cancelled,
            Self::AmbiguousAxes { .. } | Self::Stack(_) | Self::Core(_) => ErrorKind::Layout,
        }
    }
}

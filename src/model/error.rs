use thiserror::Error;

use super::AxisKind;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{axes} axes describe a {ndim}-dimensional block")]
    AxisCount { ndim: usize, axes: usize },

    #[error("axis {axis:?} appears more than once")]
    DuplicateAxis { axis: AxisKind },

    #[error("axis {index} holds {data} samples but its metadata says {metadata}")]
    SizeMismatch {
        index: usize,
        data: usize,
        metadata: usize,
    },

    #[error("axis {index} is empty")]
    EmptyAxis { index: usize },
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("affine transform is singular (determinant {determinant})")]
    Singular { determinant: f64 },

    #[error("affine transform needs 12 row-packed values, found {0}")]
    InvalidLength(usize),
}

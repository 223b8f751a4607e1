mod affine;
mod error;


pub use affine::{AffineTransform3, Point3};
pub use error::{Result, TransformError};

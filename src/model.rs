mod axis;
mod calibration;
mod dataset;
mod error;
mod metadata;
mod pixel;


pub use axis::{AxisKind, PixelType, default_axis_for_index};
pub use calibration::Calibration;
pub use dataset::Dataset;
pub use error::{CoreError, Result};
pub use metadata::{Dim, Metadata};
pub use pixel::Pixel;

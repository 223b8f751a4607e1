mod api;
mod error;
mod raster;
mod sidecar;
mod tiff;
mod util;

#[cfg(test)]
mod tests;

pub use api::{ExportOptions, WrittenCrop, file_stem, hyperstack_dims, write_outcome};
pub use error::{IoError, Result};
pub use raster::save_slice_png;
pub use sidecar::CropSidecar;
pub use self::tiff::{TiffSample, imagej_description, write_hyperstack_tiff};

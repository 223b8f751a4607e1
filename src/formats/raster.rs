use std::path::Path;

use image::{ImageBuffer, Luma};

use crate::model::{Dataset, Pixel};

use super::util::{plane_samples, to_u8_samples};
use super::{IoError, Result};

/// Saves one XY plane as an 8-bit PNG, stretched to the plane's own value range.
pub fn save_slice_png<T: Pixel>(path: &Path, dataset: &Dataset<T>, trailing: &[usize]) -> Result<()> {
    let shape = dataset.shape();
    if shape.len() != trailing.len() + 2
        || trailing
            .iter()
            .zip(&shape[2..])
            .any(|(index, extent)| index >= extent)
    {
        return Err(IoError::UnsupportedLayout(format!(
            "plane {trailing:?} does not exist in shape {shape:?}"
        )));
    }
    let values: Vec<f32> = plane_samples(dataset, trailing)
        .into_iter()
        .map(Pixel::to_f32)
        .collect();
    let bytes = to_u8_samples(&values);
    let image = ImageBuffer::<Luma<u8>, _>::from_vec(shape[0] as u32, shape[1] as u32, bytes)
        .ok_or_else(|| IoError::UnsupportedLayout("failed to construct gray image".into()))?;
    image.save(path)?;
    Ok(())
}

use std::fmt::Debug;

use ndarray::{ArrayD, IxDyn, Slice};

use crate::model::Pixel;

use super::{Result, SourceError};

/// One resolution level: a bounded pixel grid read as if it extended infinitely with zeros.
pub trait PixelLevel<T: Pixel>: Debug + Send + Sync {
    fn dimensions(&self) -> &[u64];

    /// Reads `[min, min + size)` with zero fill outside the level bounds. The result always
    /// has shape `size`, however far the box lies outside the data.
    fn read_region(&self, min: &[i64], size: &[usize]) -> Result<ArrayD<T>>;

    fn get(&self, position: &[i64]) -> Result<T> {
        let ones = vec![1; position.len()];
        let region = self.read_region(position, &ones)?;
        Ok(region.iter().next().copied().unwrap_or_default())
    }

    fn ndim(&self) -> usize {
        self.dimensions().len()
    }
}

/// Per-axis overlap of a region with `[0, dimension)`, as `(start, end)` in level coordinates.
pub(crate) fn clip_region(
    dimensions: &[u64],
    min: &[i64],
    size: &[usize],
) -> Result<Option<Vec<(i64, i64)>>> {
    if min.len() != dimensions.len() || size.len() != dimensions.len() {
        return Err(SourceError::RegionRank {
            region: min.len().max(size.len()),
            level: dimensions.len(),
        });
    }
    let mut overlap = Vec::with_capacity(dimensions.len());
    for ((dimension, start), extent) in dimensions.iter().zip(min).zip(size) {
        let lo = (*start).max(0);
        let hi = start.saturating_add(*extent as i64).min(*dimension as i64);
        if lo >= hi {
            return Ok(None);
        }
        overlap.push((lo, hi));
    }
    Ok(Some(overlap))
}

/// Copies the part of `source` (whose first element sits at `source_min`) that overlaps
/// `overlap` into `target` (whose first element sits at `target_min`).
pub(crate) fn copy_overlap<T: Pixel>(
    target: &mut ArrayD<T>,
    target_min: &[i64],
    source: &ArrayD<T>,
    source_min: &[i64],
    overlap: &[(i64, i64)],
) {
    let from = source.slice_each_axis(|description| {
        let axis = description.axis.index();
        let (lo, hi) = overlap[axis];
        Slice::from((lo - source_min[axis]) as isize..(hi - source_min[axis]) as isize)
    });
    target
        .slice_each_axis_mut(|description| {
            let axis = description.axis.index();
            let (lo, hi) = overlap[axis];
            Slice::from((lo - target_min[axis]) as isize..(hi - target_min[axis]) as isize)
        })
        .assign(&from);
}

pub(crate) fn zeros<T: Pixel>(size: &[usize]) -> ArrayD<T> {
    ArrayD::from_elem(IxDyn(size), T::default())
}

/// A level held entirely in memory.
#[derive(Debug, Clone)]
pub struct ArrayLevel<T> {
    data: ArrayD<T>,
    dimensions: Vec<u64>,
}

impl<T: Pixel> ArrayLevel<T> {
    pub fn new(data: ArrayD<T>) -> Self {
        let dimensions = data.shape().iter().map(|size| *size as u64).collect();
        Self { data, dimensions }
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }
}

impl<T: Pixel> PixelLevel<T> for ArrayLevel<T> {
    fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    fn read_region(&self, min: &[i64], size: &[usize]) -> Result<ArrayD<T>> {
        let mut out = zeros(size);
        if let Some(overlap) = clip_region(&self.dimensions, min, size)? {
            let origin = vec![0; self.dimensions.len()];
            copy_overlap(&mut out, min, &self.data, &origin, &overlap);
        }
        Ok(out)
    }
}

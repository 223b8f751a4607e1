use std::sync::Arc;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::model::Pixel;
use crate::source::PixelLevel;

use super::{CropError, Result};

/// Axis-aligned pixel box on one level, in x, y, z order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub min: [i64; 3],
    pub size: [u64; 3],
}

impl CropBox {
    /// Inclusive upper corner.
    pub fn max(&self) -> [i64; 3] {
        [
            self.min[0] + self.size[0] as i64 - 1,
            self.min[1] + self.size[1] as i64 - 1,
            self.min[2] + self.size[2] as i64 - 1,
        ]
    }

    pub fn shape(&self) -> [usize; 3] {
        [
            self.size[0] as usize,
            self.size[1] as usize,
            self.size[2] as usize,
        ]
    }

    pub fn num_pixels(&self) -> u64 {
        self.size.iter().product()
    }
}

/// A lazily evaluated crop of a level. Indices are relative to the box minimum and every
/// index inside the box is readable, zero outside the level's data.
#[derive(Debug, Clone)]
pub struct CropView<T: Pixel> {
    channel: usize,
    level: Arc<dyn PixelLevel<T>>,
    crop_box: CropBox,
}

impl<T: Pixel> CropView<T> {
    pub fn new(channel: usize, level: Arc<dyn PixelLevel<T>>, crop_box: CropBox) -> Self {
        Self {
            channel,
            level,
            crop_box,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn crop_box(&self) -> &CropBox {
        &self.crop_box
    }

    pub fn shape(&self) -> [usize; 3] {
        self.crop_box.shape()
    }

    pub fn get(&self, index: [u64; 3]) -> Result<T> {
        if index.iter().zip(&self.crop_box.size).any(|(i, size)| i >= size) {
            return Err(CropError::IndexOutsideView {
                index,
                size: self.crop_box.size,
            });
        }
        let position = [
            self.crop_box.min[0] + index[0] as i64,
            self.crop_box.min[1] + index[1] as i64,
            self.crop_box.min[2] + index[2] as i64,
        ];
        self.level
            .get(&position)
            .map_err(|source| CropError::Source {
                channel: self.channel,
                source,
            })
    }

    /// Reads the whole box into memory, shape `(width, height, depth)`.
    pub fn materialize(&self) -> Result<ArrayD<T>> {
        self.level
            .read_region(&self.crop_box.min, &self.crop_box.shape())
            .map_err(|source| CropError::Source {
                channel: self.channel,
                source,
            })
    }
}

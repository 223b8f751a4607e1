use serde::{Deserialize, Serialize};

use super::{CropError, Result};

/// How an image viewer splits the non-XY axes of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperstackDims {
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

impl HyperstackDims {
    /// The generic wrapping of an `(x, y, ...)` shape: third axis as channels, fourth as
    /// slices, fifth as frames.
    pub fn wrap(shape: &[usize]) -> Self {
        let axis = |index: usize| shape.get(index).copied().unwrap_or(1);
        Self {
            channels: axis(2),
            slices: axis(3),
            frames: axis(4),
        }
    }

    pub fn num_images(&self) -> usize {
        self.channels * self.slices * self.frames
    }

    /// Relabels a single-channel 3D block as a depth stack.
    ///
    /// Exactly one of the three extra axes may be larger than one, and it must equal
    /// `depth`; anything else is reported as ambiguous.
    pub fn as_depth_stack(self, depth: usize) -> Result<Self> {
        let extras = [self.channels, self.slices, self.frames];
        let mut non_trivial = extras.iter().filter(|size| **size > 1);
        match (non_trivial.next(), non_trivial.next()) {
            (Some(size), None) if *size == depth => Ok(Self {
                channels: 1,
                slices: depth,
                frames: 1,
            }),
            _ => Err(CropError::AmbiguousAxes { dims: self, depth }),
        }
    }
}

use std::sync::Arc;

use crate::model::Pixel;
use crate::transform::AffineTransform3;

use super::{PixelLevel, Result, SourceError, VoxelSize};

/// Transform from a downsampled level's pixel grid to full-resolution pixel space.
///
/// Downsampled pixel centers sit in the middle of the full-resolution pixels they cover,
/// hence the half-pixel translation.
pub fn mipmap_transform(scale: [f64; 3]) -> AffineTransform3 {
    AffineTransform3::scaling_translation(
        scale,
        [
            0.5 * (scale[0] - 1.0),
            0.5 * (scale[1] - 1.0),
            0.5 * (scale[2] - 1.0),
        ],
    )
}

/// A resolution pyramid, finest level first, with its transform chain into world space:
/// `channel_transform ∘ voxel_transform ∘ mipmap_transform(level)`.
#[derive(Debug, Clone)]
pub struct MultiResolutionSource<T: Pixel> {
    name: String,
    levels: Vec<Arc<dyn PixelLevel<T>>>,
    scales: Vec<[f64; 3]>,
    voxel_size: Option<VoxelSize>,
    voxel_transform: AffineTransform3,
    channel_transform: Option<AffineTransform3>,
}

impl<T: Pixel> MultiResolutionSource<T> {
    pub fn new(
        name: impl Into<String>,
        levels: Vec<Arc<dyn PixelLevel<T>>>,
        scales: Vec<[f64; 3]>,
    ) -> Result<Self> {
        if levels.is_empty() {
            return Err(SourceError::metadata(0, "a source needs at least one level"));
        }
        if levels.len() != scales.len() {
            return Err(SourceError::metadata(
                0,
                format!("{} levels but {} scale entries", levels.len(), scales.len()),
            ));
        }
        Ok(Self {
            name: name.into(),
            levels,
            scales,
            voxel_size: None,
            voxel_transform: AffineTransform3::identity(),
            channel_transform: None,
        })
    }

    /// Scales world space by the normalized voxel size.
    pub fn with_voxel_size(mut self, voxel_size: VoxelSize) -> Self {
        self.voxel_transform = AffineTransform3::scaling(voxel_size.normalized());
        self.voxel_size = Some(voxel_size);
        self
    }

    /// Applies `transform` after the voxel scaling.
    pub fn with_channel_transform(mut self, transform: AffineTransform3) -> Self {
        self.channel_transform = Some(transform);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, level: usize) -> Result<&Arc<dyn PixelLevel<T>>> {
        self.levels.get(level).ok_or(SourceError::LevelOutOfRange {
            level,
            max: self.max_level(),
        })
    }

    pub fn scale(&self, level: usize) -> Option<[f64; 3]> {
        self.scales.get(level).copied()
    }

    pub fn voxel_size(&self) -> Option<&VoxelSize> {
        self.voxel_size.as_ref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.voxel_size.as_ref().map(|voxel| voxel.unit.as_str())
    }

    pub fn channel_transform(&self) -> Option<&AffineTransform3> {
        self.channel_transform.as_ref()
    }

    /// Transform from `level` pixel coordinates to world coordinates.
    pub fn level_transform(&self, level: usize) -> Result<AffineTransform3> {
        let scale = self.scale(level).ok_or(SourceError::LevelOutOfRange {
            level,
            max: self.max_level(),
        })?;
        let to_voxel_space = self.voxel_transform.concatenate(&mipmap_transform(scale));
        Ok(match &self.channel_transform {
            Some(channel_transform) => channel_transform.concatenate(&to_voxel_space),
            None => to_voxel_space,
        })
    }
}

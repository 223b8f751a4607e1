use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::transform::Point3;

use super::{CropError, Result, round_half_up};

/// One crop: where, how large (in pixels of the chosen level), and how to assemble channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRequest {
    pub world_point: Point3,
    #[serde(default)]
    pub use_custom_center: bool,
    #[serde(default)]
    pub custom_center: Point3,
    pub size: [u64; 3],
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub combine_channels: bool,
}

impl CropRequest {
    pub fn new(world_point: Point3, size: [u64; 3], level: i64) -> Self {
        Self {
            world_point,
            use_custom_center: false,
            custom_center: world_point,
            size,
            level,
            combine_channels: false,
        }
    }

    pub fn with_custom_center(mut self, center: Point3) -> Self {
        self.use_custom_center = true;
        self.custom_center = center;
        self
    }

    pub fn combined(mut self, combine_channels: bool) -> Self {
        self.combine_channels = combine_channels;
        self
    }

    /// World-space crop center.
    pub fn center(&self) -> Point3 {
        if self.use_custom_center {
            self.custom_center
        } else {
            self.world_point
        }
    }

    /// The center in whole world units, e.g. `[100, 100, 50]`. A clicked point is rounded; a
    /// typed custom center is truncated towards zero.
    pub fn center_label(&self) -> String {
        let center = if self.use_custom_center {
            self.custom_center.map(|value| value.trunc() as i64)
        } else {
            self.world_point.map(round_half_up)
        };
        format!("[{}, {}, {}]", center[0], center[1], center[2])
    }

    /// Every axis must be positive and the box addressable as one in-memory array.
    pub fn validate_size(&self) -> Result<()> {
        self.validate_footprint(1)
    }

    /// Like [`validate_size`](Self::validate_size), additionally requiring `bytes_per_pixel`
    /// bytes for every pixel of the box to fit in a single allocation.
    pub fn validate_footprint(&self, bytes_per_pixel: usize) -> Result<()> {
        let invalid = || CropError::InvalidSize(self.size);
        if self.size.contains(&0) || self.size.iter().any(|size| *size > i64::MAX as u64) {
            return Err(invalid());
        }
        let bytes = self
            .size
            .iter()
            .try_fold(bytes_per_pixel.max(1) as u64, |total, size| total.checked_mul(*size))
            .ok_or_else(invalid)?;
        if bytes > isize::MAX as u64 {
            return Err(invalid());
        }
        Ok(())
    }
}

/// Last-used crop parameters, seeded into the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropDefaults {
    pub width: u64,
    pub height: u64,
    pub depth: u64,
    #[serde(alias = "scaleLevel")]
    pub scale_level: i64,
    #[serde(alias = "useCustomCenter")]
    pub use_custom_center: bool,
    #[serde(alias = "combineChannelsInto4D", alias = "single4DStack")]
    pub combine_channels: bool,
}

impl Default for CropDefaults {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            depth: 512,
            scale_level: 0,
            use_custom_center: false,
            combine_channels: true,
        }
    }
}

impl CropDefaults {
    pub fn size(&self) -> [u64; 3] {
        [self.width, self.height, self.depth]
    }

    /// A request at `world_point` carrying these defaults.
    pub fn request_at(&self, world_point: Point3) -> CropRequest {
        CropRequest {
            world_point,
            use_custom_center: self.use_custom_center,
            custom_center: world_point,
            size: self.size(),
            level: self.scale_level,
            combine_channels: self.combine_channels,
        }
    }

    pub fn remember(&mut self, request: &CropRequest) {
        let [width, height, depth] = request.size;
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.scale_level = request.level;
        self.use_custom_center = request.use_custom_center;
        self.combine_channels = request.combine_channels;
    }
}

/// Reads defaults from a JSON or YAML file, chosen by extension.
pub fn load_defaults(path: impl AsRef<Path>) -> Result<CropDefaults> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|error| CropError::Config(format!("{}: {error}", path.display())))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let defaults = if matches!(extension.as_str(), "yaml" | "yml") {
        serde_yaml::from_str::<CropDefaults>(&raw).map_err(|error| CropError::Config(error.to_string()))?
    } else {
        serde_json::from_str::<CropDefaults>(&raw).map_err(|error| CropError::Config(error.to_string()))?
    };
    defaults.request_at([0.0; 3]).validate_size()?;
    Ok(defaults)
}

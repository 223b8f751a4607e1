use serde::{Deserialize, Serialize};

/// Physical pixel size and origin of an extracted crop, in x, y, z order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub pixel_size: [f64; 3],
    pub origin: [f64; 3],
}

impl Calibration {
    /// `origin[d] = pixel_size[d] * min[d]` for every axis.
    pub fn from_min(pixel_size: [f64; 3], min: [i64; 3]) -> Self {
        let origin = [
            pixel_size[0] * min[0] as f64,
            pixel_size[1] * min[1] as f64,
            pixel_size[2] * min[2] as f64,
        ];
        Self { pixel_size, origin }
    }
}

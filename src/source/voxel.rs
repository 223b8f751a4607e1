use serde::{Deserialize, Serialize};

/// Physical size of one native-resolution voxel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelSize {
    pub size: [f64; 3],
    pub unit: String,
}

impl VoxelSize {
    pub fn new(size: [f64; 3], unit: impl Into<String>) -> Self {
        Self {
            size,
            unit: unit.into(),
        }
    }

    /// The voxel size divided by its smallest component.
    pub fn normalized(&self) -> [f64; 3] {
        let normalized = super::normalized_voxel_size(&self.size);
        [normalized[0], normalized[1], normalized[2]]
    }
}

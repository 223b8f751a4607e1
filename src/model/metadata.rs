use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{AxisKind, Calibration, CoreError, PixelType, Result, default_axis_for_index};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dim {
    pub axis: AxisKind,
    pub size: usize,
    pub spacing: Option<f64>,
    pub origin: Option<f64>,
    pub unit: Option<String>,
}

impl Dim {
    pub fn new(axis: AxisKind, size: usize) -> Self {
        Self {
            axis,
            size,
            spacing: None,
            origin: None,
            unit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub dims: Vec<Dim>,
    pub pixel_type: PixelType,
    pub channel_names: Vec<String>,
    pub source: Option<PathBuf>,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            dims: Vec::new(),
            pixel_type: PixelType::F32,
            channel_names: Vec::new(),
            source: None,
            extras: BTreeMap::new(),
        }
    }
}

impl Metadata {
    pub fn from_shape(shape: &[usize], pixel_type: PixelType) -> Self {
        let dims = shape
            .iter()
            .enumerate()
            .map(|(index, size)| Dim::new(default_axis_for_index(index), *size))
            .collect();
        Self {
            dims,
            pixel_type,
            ..Self::default()
        }
    }

    pub fn with_axes(shape: &[usize], axes: &[AxisKind], pixel_type: PixelType) -> Result<Self> {
        if shape.len() != axes.len() {
            return Err(CoreError::AxisCount {
                ndim: shape.len(),
                axes: axes.len(),
            });
        }
        for (index, axis) in axes.iter().enumerate() {
            if *axis != AxisKind::Unknown && axes[..index].contains(axis) {
                return Err(CoreError::DuplicateAxis { axis: *axis });
            }
        }
        let dims = axes
            .iter()
            .zip(shape)
            .map(|(axis, size)| Dim::new(*axis, *size))
            .collect();
        Ok(Self {
            dims,
            pixel_type,
            ..Self::default()
        })
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.size).collect()
    }

    pub fn axis_index(&self, axis: AxisKind) -> Option<usize> {
        self.dims.iter().position(|d| d.axis == axis)
    }

    pub fn axis_size(&self, axis: AxisKind) -> usize {
        self.axis_index(axis)
            .map(|index| self.dims[index].size)
            .unwrap_or(1)
    }

    /// Writes spacing and origin onto the X, Y and Z dims. Other axes are left uncalibrated.
    pub fn set_calibration(&mut self, calibration: &Calibration, unit: Option<&str>) {
        for (d, axis) in [AxisKind::X, AxisKind::Y, AxisKind::Z].into_iter().enumerate() {
            if let Some(index) = self.axis_index(axis) {
                let dim = &mut self.dims[index];
                dim.spacing = Some(calibration.pixel_size[d]);
                dim.origin = Some(calibration.origin[d]);
                dim.unit = unit.map(str::to_string);
            }
        }
    }

    pub fn calibration(&self) -> Option<Calibration> {
        let mut pixel_size = [1.0; 3];
        let mut origin = [0.0; 3];
        let mut found = false;
        for (d, axis) in [AxisKind::X, AxisKind::Y, AxisKind::Z].into_iter().enumerate() {
            if let Some(dim) = self.axis_index(axis).map(|index| &self.dims[index]) {
                if let Some(spacing) = dim.spacing {
                    pixel_size[d] = spacing;
                    found = true;
                }
                if let Some(value) = dim.origin {
                    origin[d] = value;
                }
            }
        }
        found.then_some(Calibration { pixel_size, origin })
    }

    pub fn validate_shape(&self, shape: &[usize]) -> Result<()> {
        if self.dims.len() != shape.len() {
            return Err(CoreError::AxisCount {
                ndim: shape.len(),
                axes: self.dims.len(),
            });
        }
        for (index, (dim, actual)) in self.dims.iter().zip(shape).enumerate() {
            if dim.size == 0 {
                return Err(CoreError::EmptyAxis { index });
            }
            if dim.size != *actual {
                return Err(CoreError::SizeMismatch {
                    index,
                    data: *actual,
                    metadata: dim.size,
                });
            }
        }
        Ok(())
    }
}

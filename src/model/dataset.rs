use ndarray::ArrayD;

use super::{AxisKind, Calibration, Metadata, Pixel, Result};

const LABEL_KEY: &str = "label";

/// A pixel block indexed `[x, y, ...]`, with the axis meaning and calibration of each
/// dimension.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    pub data: ArrayD<T>,
    pub metadata: Metadata,
}

impl<T> Dataset<T> {
    /// Fails unless `metadata` describes exactly the shape of `data`.
    pub fn new(data: ArrayD<T>, metadata: Metadata) -> Result<Self> {
        metadata.validate_shape(data.shape())?;
        Ok(Self { data, metadata })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn axis_index(&self, axis: AxisKind) -> Option<usize> {
        self.metadata.axis_index(axis)
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.metadata.calibration()
    }

    /// Display title, e.g. `channel 0 [100, 100, 50]`.
    pub fn label(&self) -> Option<&str> {
        self.metadata
            .extras
            .get(LABEL_KEY)
            .and_then(|value| value.as_str())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.metadata
            .extras
            .insert(LABEL_KEY.into(), serde_json::Value::String(label.into()));
    }
}

impl<T: Pixel> Dataset<T> {
    /// Wraps `data` with default `x, y, z, channel, time` axes and no calibration.
    pub fn uncalibrated(data: ArrayD<T>) -> Self {
        let metadata = Metadata::from_shape(data.shape(), T::PIXEL_TYPE);
        Self { data, metadata }
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut values = self.data.iter().map(|value| value.to_f32());
        let first = values.next()?;
        Some(values.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        }))
    }
}

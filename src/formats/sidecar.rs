use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crop::HyperstackDims;
use crate::model::{AxisKind, Calibration, Dataset, PixelType};

use super::Result;

/// Everything about a written crop that the TIFF header cannot carry, such as the
/// calibration origin and the crop box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSidecar {
    pub label: String,
    pub axes: Vec<AxisKind>,
    pub shape: Vec<usize>,
    pub pixel_type: PixelType,
    pub channel_names: Vec<String>,
    pub calibration: Option<Calibration>,
    pub unit: Option<String>,
    pub hyperstack: HyperstackDims,
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl CropSidecar {
    pub fn from_dataset<T>(dataset: &Dataset<T>, hyperstack: HyperstackDims) -> Self {
        let metadata = &dataset.metadata;
        Self {
            label: dataset.label().unwrap_or_default().to_string(),
            axes: metadata.dims.iter().map(|dim| dim.axis).collect(),
            shape: metadata.shape(),
            pixel_type: metadata.pixel_type,
            channel_names: metadata.channel_names.clone(),
            calibration: metadata.calibration(),
            unit: metadata.dims.iter().find_map(|dim| dim.unit.clone()),
            hyperstack,
            extras: metadata
                .extras
                .iter()
                .filter(|(key, _)| key.as_str() != "label")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        Ok(serde_json::from_reader(File::open(path)?)?)
    }
}

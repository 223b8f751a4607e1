use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transform::AffineTransform3;

use super::{ChunkStore, Result, StorageError};

const SCALES_KEY: &str = "scales";
const DOWNSAMPLING_FACTORS_KEY: &str = "downsamplingFactors";
const PIXEL_RESOLUTION_KEY: &str = "pixelResolution";
const AFFINE_TRANSFORM_KEY: &str = "affineTransform";
const NAME_KEY: &str = "name";

/// Dataset path of one channel's scale level, e.g. `c0/s2`.
pub fn scale_level_path(channel: usize, level: usize) -> String {
    format!("{}/s{level}", channel_group(channel))
}

fn channel_group(channel: usize) -> String {
    format!("c{channel}")
}

/// Physical voxel size of a channel at native resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelResolution {
    pub dimensions: Vec<f64>,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "um".into()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPixelResolution {
    Object(PixelResolution),
    // older exports store a bare array without a unit
    Array(Vec<f64>),
}

/// Reader for the N5 viewer export layout: channel groups `c{N}` holding scale
/// datasets `s{L}`, with `scales`, `pixelResolution` and `affineTransform` set either on
/// the channel group or on the root.
#[derive(Debug, Clone)]
pub struct ExportMetadata {
    store: Arc<dyn ChunkStore>,
    root: Map<String, Value>,
    channels: Vec<Map<String, Value>>,
}

impl ExportMetadata {
    pub fn load(store: Arc<dyn ChunkStore>) -> Result<Self> {
        let root = store.attributes("")?.unwrap_or_default();
        let mut channels = Vec::new();
        while store.exists(&channel_group(channels.len())) {
            let attributes = store
                .attributes(&channel_group(channels.len()))?
                .unwrap_or_default();
            channels.push(attributes);
        }
        Ok(Self {
            store,
            root,
            channels,
        })
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn name(&self, channel: usize) -> Option<String> {
        self.lookup(channel, NAME_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Per-level downsampling factors, finest first.
    ///
    /// Falls back to the `downsamplingFactors` attribute of each `s{L}` dataset when no
    /// `scales` list exists; a missing factor on `s0` means full resolution.
    pub fn scales(&self, channel: usize) -> Result<Vec<Vec<f64>>> {
        if let Some(value) = self.lookup(channel, SCALES_KEY) {
            return parse_attribute(&channel_group(channel), SCALES_KEY, value.clone());
        }

        let mut scales = Vec::new();
        loop {
            let path = scale_level_path(channel, scales.len());
            if !self.store.exists(&path) {
                break;
            }
            let factors = match self
                .store
                .attributes(&path)?
                .and_then(|attributes| attributes.get(DOWNSAMPLING_FACTORS_KEY).cloned())
            {
                Some(value) => parse_attribute(&path, DOWNSAMPLING_FACTORS_KEY, value)?,
                None if scales.is_empty() => vec![1.0; 3],
                None => {
                    return Err(StorageError::InvalidAttribute {
                        path,
                        key: DOWNSAMPLING_FACTORS_KEY.into(),
                        reason: "missing on a downsampled level".into(),
                    });
                }
            };
            scales.push(factors);
        }
        Ok(scales)
    }

    pub fn pixel_resolution(&self, channel: usize) -> Result<Option<PixelResolution>> {
        let Some(value) = self.lookup(channel, PIXEL_RESOLUTION_KEY) else {
            return Ok(None);
        };
        let raw: RawPixelResolution =
            parse_attribute(&channel_group(channel), PIXEL_RESOLUTION_KEY, value.clone())?;
        Ok(Some(match raw {
            RawPixelResolution::Object(resolution) => resolution,
            RawPixelResolution::Array(dimensions) => PixelResolution {
                dimensions,
                unit: default_unit(),
            },
        }))
    }

    pub fn affine_transform(&self, channel: usize) -> Result<Option<AffineTransform3>> {
        let Some(value) = self.lookup(channel, AFFINE_TRANSFORM_KEY) else {
            return Ok(None);
        };
        let values: Vec<f64> =
            parse_attribute(&channel_group(channel), AFFINE_TRANSFORM_KEY, value.clone())?;
        Ok(Some(AffineTransform3::from_row_packed(&values)?))
    }

    fn lookup(&self, channel: usize, key: &str) -> Option<&Value> {
        self.channels
            .get(channel)
            .and_then(|attributes| attributes.get(key))
            .or_else(|| self.root.get(key))
            .filter(|value| !value.is_null())
    }
}

fn parse_attribute<T: serde::de::DeserializeOwned>(
    path: &str,
    key: &str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|error| StorageError::InvalidAttribute {
        path: path.to_string(),
        key: key.to_string(),
        reason: error.to_string(),
    })
}

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::source::{ChannelSources, open_channels};
use crate::storage::{ChunkStore, DataType, ExportMetadata, N5Store, scale_level_path};

use super::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub path: String,
    pub scale: Vec<f64>,
    pub dimensions: Vec<u64>,
    pub block_size: Vec<u32>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub channel: usize,
    pub name: Option<String>,
    pub voxel_size: Option<Vec<f64>>,
    pub unit: Option<String>,
    pub affine_transform: Option<Vec<f64>>,
    pub levels: Vec<LevelSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SourceService;

impl SourceService {
    pub fn open(&self, root: impl AsRef<Path>) -> Result<ExportMetadata> {
        let store = N5Store::open(root.as_ref())?;
        self.open_store(Arc::new(store))
    }

    pub fn open_store(&self, store: Arc<dyn ChunkStore>) -> Result<ExportMetadata> {
        let metadata = ExportMetadata::load(store)?;
        info!(channels = metadata.num_channels(), "opened export");
        Ok(metadata)
    }

    pub fn channels(&self, metadata: &ExportMetadata) -> Result<ChannelSources> {
        Ok(open_channels(metadata)?)
    }

    pub fn summarize(&self, metadata: &ExportMetadata) -> Result<SourceSummary> {
        let mut channels = Vec::with_capacity(metadata.num_channels());
        for channel in 0..metadata.num_channels() {
            let resolution = metadata.pixel_resolution(channel)?;
            let mut levels = Vec::new();
            for (level, scale) in metadata.scales(channel)?.into_iter().enumerate() {
                let path = scale_level_path(channel, level);
                let attributes = metadata.store().dataset_attributes(&path)?;
                levels.push(LevelSummary {
                    path,
                    scale,
                    dimensions: attributes.dimensions,
                    block_size: attributes.block_size,
                    data_type: attributes.data_type,
                });
            }
            channels.push(ChannelSummary {
                channel,
                name: metadata.name(channel),
                voxel_size: resolution.as_ref().map(|resolution| resolution.dimensions.clone()),
                unit: resolution.map(|resolution| resolution.unit),
                affine_transform: metadata
                    .affine_transform(channel)?
                    .map(|transform| transform.row_packed()),
                levels,
            });
        }
        Ok(SourceSummary { channels })
    }
}

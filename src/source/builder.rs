use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{Pixel, PixelType};
use crate::storage::{DatasetAttributes, ExportMetadata, StorageError, scale_level_path};

use super::{
    ChunkedLevel, DEFAULT_BLOCK_CACHE_CAPACITY, MultiResolutionSource, PixelLevel, Result,
    SourceError, VolatileLevel, VolatileSource, VoxelSize,
};

/// Divides every component by the smallest one, so the finest axis has scale 1.
pub fn normalized_voxel_size(voxel_size: &[f64]) -> Vec<f64> {
    let min = voxel_size.iter().copied().fold(f64::INFINITY, f64::min);
    voxel_size.iter().map(|size| size / min).collect()
}

/// Builds the source for one channel, reading every scale level through a block cache.
pub fn build_source<T: Pixel>(
    metadata: &ExportMetadata,
    channel: usize,
) -> Result<MultiResolutionSource<T>> {
    let levels = open_levels::<T>(metadata, channel)?;
    let levels = levels
        .into_iter()
        .map(|level| level as Arc<dyn PixelLevel<T>>)
        .collect();
    assemble(metadata, channel, levels)
}

/// Like [`build_source`], but pixel reads never block on storage.
pub fn build_volatile_source<T: Pixel>(
    metadata: &ExportMetadata,
    channel: usize,
) -> Result<VolatileSource<T>> {
    let volatile: Vec<Arc<VolatileLevel<T>>> = open_levels::<T>(metadata, channel)?
        .into_iter()
        .map(|level| Arc::new(VolatileLevel::new(level)))
        .collect();
    let levels = volatile
        .iter()
        .map(|level| Arc::clone(level) as Arc<dyn PixelLevel<T>>)
        .collect();
    let source = assemble(metadata, channel, levels)?;
    Ok(VolatileSource::new(source, volatile))
}

/// Sources for every channel of an export, typed by the element type of `c0/s0`.
#[derive(Debug, Clone)]
pub enum ChannelSources {
    U8(Vec<MultiResolutionSource<u8>>),
    U16(Vec<MultiResolutionSource<u16>>),
    F32(Vec<MultiResolutionSource<f32>>),
}

impl ChannelSources {
    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::U8(_) => PixelType::U8,
            Self::U16(_) => PixelType::U16,
            Self::F32(_) => PixelType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(sources) => sources.len(),
            Self::U16(sources) => sources.len(),
            Self::F32(sources) => sources.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn open_channels(metadata: &ExportMetadata) -> Result<ChannelSources> {
    if metadata.num_channels() == 0 {
        return Err(SourceError::metadata(0, "export contains no channel groups"));
    }
    let attributes = level_attributes(metadata, 0, 0)?;
    let pixel_type = attributes
        .pixel_type()
        .map_err(|error| SourceError::metadata(0, error.to_string()))?;
    let channels = 0..metadata.num_channels();
    Ok(match pixel_type {
        PixelType::U8 => ChannelSources::U8(
            channels
                .map(|channel| build_source(metadata, channel))
                .collect::<Result<_>>()?,
        ),
        PixelType::U16 => ChannelSources::U16(
            channels
                .map(|channel| build_source(metadata, channel))
                .collect::<Result<_>>()?,
        ),
        PixelType::F32 => ChannelSources::F32(
            channels
                .map(|channel| build_source(metadata, channel))
                .collect::<Result<_>>()?,
        ),
    })
}

fn open_levels<T: Pixel>(
    metadata: &ExportMetadata,
    channel: usize,
) -> Result<Vec<Arc<ChunkedLevel<T>>>> {
    let scales = checked_scales(metadata, channel)?;
    let mut levels = Vec::with_capacity(scales.len());
    for level in 0..scales.len() {
        let attributes = level_attributes(metadata, channel, level)?;
        if attributes.ndim() != 3 {
            return Err(SourceError::metadata(
                channel,
                format!("scale level {level} has {} dimensions, expected 3", attributes.ndim()),
            ));
        }
        let pixel_type = attributes
            .pixel_type()
            .map_err(|error| SourceError::metadata(channel, error.to_string()))?;
        if pixel_type != T::PIXEL_TYPE {
            return Err(SourceError::metadata(
                channel,
                format!(
                    "scale level {level} holds {pixel_type:?} samples, expected {:?}",
                    T::PIXEL_TYPE
                ),
            ));
        }
        debug!(
            channel,
            level,
            dimensions = ?attributes.dimensions,
            block_size = ?attributes.block_size,
            "opened scale level"
        );
        levels.push(Arc::new(ChunkedLevel::new(
            Arc::clone(metadata.store()),
            scale_level_path(channel, level),
            attributes,
            DEFAULT_BLOCK_CACHE_CAPACITY,
        )));
    }
    Ok(levels)
}

fn level_attributes(
    metadata: &ExportMetadata,
    channel: usize,
    level: usize,
) -> Result<DatasetAttributes> {
    let path = scale_level_path(channel, level);
    metadata
        .store()
        .dataset_attributes(&path)
        .map_err(|source| match source {
            StorageError::UnsupportedDataType(reason) => SourceError::metadata(channel, reason),
            source => SourceError::OpenLevel {
                channel,
                level,
                source,
            },
        })
}

fn checked_scales(metadata: &ExportMetadata, channel: usize) -> Result<Vec<[f64; 3]>> {
    let scales = metadata
        .scales(channel)
        .map_err(|error| SourceError::metadata(channel, error.to_string()))?;
    if scales.is_empty() {
        return Err(SourceError::metadata(channel, "no scale levels"));
    }
    scales
        .iter()
        .enumerate()
        .map(|(level, factors)| match factors.as_slice() {
            [x, y, z] if [x, y, z].iter().all(|f| f.is_finite() && **f > 0.0) => Ok([*x, *y, *z]),
            [_, _, _] => Err(SourceError::metadata(
                channel,
                format!("scale level {level} has non-positive factors {factors:?}"),
            )),
            _ => Err(SourceError::metadata(
                channel,
                format!(
                    "scale level {level} has {} factors, expected 3",
                    factors.len()
                ),
            )),
        })
        .collect()
}

fn voxel_size(metadata: &ExportMetadata, channel: usize) -> Result<Option<VoxelSize>> {
    let Some(resolution) = metadata
        .pixel_resolution(channel)
        .map_err(|error| SourceError::metadata(channel, error.to_string()))?
    else {
        return Ok(None);
    };
    match resolution.dimensions.as_slice() {
        [x, y, z] if [x, y, z].iter().all(|v| v.is_finite() && **v > 0.0) => {
            Ok(Some(VoxelSize::new([*x, *y, *z], resolution.unit)))
        }
        other => Err(SourceError::metadata(
            channel,
            format!("pixel resolution must be three positive values, found {other:?}"),
        )),
    }
}

fn assemble<T: Pixel>(
    metadata: &ExportMetadata,
    channel: usize,
    levels: Vec<Arc<dyn PixelLevel<T>>>,
) -> Result<MultiResolutionSource<T>> {
    let scales = checked_scales(metadata, channel)?;
    let name = metadata
        .name(channel)
        .map(|name| format!("{name} c{channel}"))
        .unwrap_or_else(|| format!("c{channel}"));
    let mut source = MultiResolutionSource::new(name, levels, scales)?;

    if let Some(voxel) = voxel_size(metadata, channel)? {
        source = source.with_voxel_size(voxel);
    }

    let transform = metadata
        .affine_transform(channel)
        .map_err(|error| SourceError::metadata(channel, error.to_string()))?;
    if let Some(transform) = transform {
        if !transform.is_axis_aligned() {
            warn!(
                channel,
                "channel transform rotates or shears; crop calibration uses its diagonal only"
            );
        }
        source = source.with_channel_transform(transform);
    }
    Ok(source)
}

use ndarray::{ArrayD, Axis};
use serde_json::json;
use tracing::warn;

use crate::model::{AxisKind, Calibration, Dataset, Metadata, Pixel};
use crate::source::MultiResolutionSource;
use crate::transform::AffineTransform3;

use super::{CropBox, CropError, CropRequest, CropView, Result};

/// One channel's crop with its own calibration.
#[derive(Debug, Clone)]
pub struct ChannelCrop<T: Pixel> {
    pub channel: usize,
    pub label: String,
    pub level: usize,
    pub crop_box: CropBox,
    pub transform: AffineTransform3,
    pub calibration: Calibration,
    pub view: CropView<T>,
    /// The materialized view, axes `(x, y, z)`.
    pub dataset: Dataset<T>,
}

/// All channels stacked into one volume, axes `(x, y, channel, z)`.
#[derive(Debug, Clone)]
pub struct CombinedCrop<T: Pixel> {
    pub label: String,
    pub level: usize,
    pub crop_box: CropBox,
    pub calibration: Calibration,
    pub dataset: Dataset<T>,
}

#[derive(Debug, Clone)]
pub enum CropOutcome<T: Pixel> {
    Separate(Vec<ChannelCrop<T>>),
    Combined(CombinedCrop<T>),
}

impl<T: Pixel> CropOutcome<T> {
    /// Output blocks in emission order.
    pub fn datasets(&self) -> Vec<&Dataset<T>> {
        match self {
            Self::Separate(channels) => channels.iter().map(|crop| &crop.dataset).collect(),
            Self::Combined(combined) => vec![&combined.dataset],
        }
    }

    pub fn calibrations(&self) -> Vec<Calibration> {
        match self {
            Self::Separate(channels) => channels.iter().map(|crop| crop.calibration).collect(),
            Self::Combined(combined) => vec![combined.calibration],
        }
    }
}

/// Per-channel extraction result handed from the extraction stage to assembly.
pub(crate) struct Extraction<T: Pixel> {
    pub(crate) channel: usize,
    pub(crate) crop_box: CropBox,
    pub(crate) transform: AffineTransform3,
    pub(crate) view: CropView<T>,
    pub(crate) data: ArrayD<T>,
}

/// Stacks equally shaped `(x, y, z)` crops along a new trailing channel axis.
pub fn stack_channels<T: Pixel>(channels: &[ArrayD<T>]) -> Result<ArrayD<T>> {
    let views: Vec<_> = channels.iter().map(|channel| channel.view()).collect();
    let axis = channels.first().map(|channel| channel.ndim()).unwrap_or(0);
    ndarray::stack(Axis(axis), &views).map_err(|error| CropError::Stack(error.to_string()))
}

/// Turns `(x, y, z, channel)` into `(x, y, channel, z)`, the order image viewers expect for
/// multi-channel z-stacks.
pub fn swap_channel_and_depth<T: Pixel>(mut stacked: ArrayD<T>) -> Result<ArrayD<T>> {
    if stacked.ndim() != 4 {
        return Err(CropError::Stack(format!(
            "expected a 4D (x, y, z, channel) stack, found shape {:?}",
            stacked.shape()
        )));
    }
    // a strided view over the stacked buffer; consumers index it logically
    stacked.swap_axes(2, 3);
    Ok(stacked)
}

/// Pixel size from the transform diagonal, valid only for pure scaling transforms.
pub(crate) fn calibration_for(
    channel: usize,
    transform: &AffineTransform3,
    crop_box: &CropBox,
) -> Calibration {
    if !transform.is_axis_aligned() {
        warn!(channel, "level transform is not a pure scaling; calibration is approximate");
    }
    Calibration::from_min(transform.diagonal(), crop_box.min)
}

fn annotate(metadata: &mut Metadata, crop_box: &CropBox, level: usize) {
    metadata.extras.insert("crop_min".into(), json!(crop_box.min));
    metadata.extras.insert("crop_size".into(), json!(crop_box.size));
    metadata.extras.insert("scale_level".into(), json!(level));
}

pub(crate) fn assemble_separate<T: Pixel>(
    sources: &[MultiResolutionSource<T>],
    extractions: Vec<Extraction<T>>,
    request: &CropRequest,
    level: usize,
) -> Result<CropOutcome<T>> {
    let center_label = request.center_label();
    let mut crops = Vec::with_capacity(extractions.len());
    for extraction in extractions {
        let source = &sources[extraction.channel];
        let label = format!("channel {} {center_label}", extraction.channel);
        let calibration =
            calibration_for(extraction.channel, &extraction.transform, &extraction.crop_box);
        let mut metadata = Metadata::with_axes(
            extraction.data.shape(),
            &[AxisKind::X, AxisKind::Y, AxisKind::Z],
            T::PIXEL_TYPE,
        )?;
        metadata.set_calibration(&calibration, source.unit());
        metadata.channel_names = vec![source.name().to_string()];
        annotate(&mut metadata, &extraction.crop_box, level);
        let mut dataset = Dataset::new(extraction.data, metadata)?;
        dataset.set_label(&label);
        crops.push(ChannelCrop {
            channel: extraction.channel,
            label,
            level,
            crop_box: extraction.crop_box,
            transform: extraction.transform,
            calibration,
            view: extraction.view,
            dataset,
        });
    }
    Ok(CropOutcome::Separate(crops))
}

/// Calibration comes from the first channel alone.
pub(crate) fn assemble_combined<T: Pixel>(
    sources: &[MultiResolutionSource<T>],
    extractions: Vec<Extraction<T>>,
    request: &CropRequest,
    level: usize,
) -> Result<CropOutcome<T>> {
    let first = extractions.first().ok_or(CropError::NoChannels)?;
    let crop_box = first.crop_box;
    let calibration = calibration_for(first.channel, &first.transform, &crop_box);
    let label = request.center_label();

    let channels: Vec<ArrayD<T>> = extractions.into_iter().map(|extraction| extraction.data).collect();
    let stacked = stack_channels(&channels)?;
    drop(channels);
    let data = swap_channel_and_depth(stacked)?;

    let mut metadata = Metadata::with_axes(
        data.shape(),
        &[AxisKind::X, AxisKind::Y, AxisKind::Channel, AxisKind::Z],
        T::PIXEL_TYPE,
    )?;
    metadata.set_calibration(&calibration, sources.first().and_then(|source| source.unit()));
    metadata.channel_names = sources.iter().map(|source| source.name().to_string()).collect();
    annotate(&mut metadata, &crop_box, level);
    let mut dataset = Dataset::new(data, metadata)?;
    dataset.set_label(&label);

    Ok(CropOutcome::Combined(CombinedCrop {
        label,
        level,
        crop_box,
        calibration,
        dataset,
    }))
}

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::crop::{CropOutcome, HyperstackDims};
use crate::model::{AxisKind, Dataset};

use super::raster::save_slice_png;
use super::sidecar::CropSidecar;
use super::tiff::{TiffSample, write_hyperstack_tiff};
use super::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Prepended to every file name.
    pub prefix: String,
    /// Also write a PNG of the middle slice.
    pub preview: bool,
}

/// Files written for one output block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenCrop {
    pub label: String,
    pub hyperstack: HyperstackDims,
    pub tiff: PathBuf,
    pub sidecar: PathBuf,
    pub preview: Option<PathBuf>,
}

/// File-name-safe form of a crop label: `channel 0 [100, 100, 50]` becomes
/// `channel_0_100_100_50`.
pub fn file_stem(label: &str) -> String {
    let mut stem = String::with_capacity(label.len());
    for character in label.chars() {
        if character.is_ascii_alphanumeric() || character == '-' {
            stem.push(character);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    stem.trim_matches('_').to_string()
}

/// How a viewer should split the block's non-XY axes. A single-channel z-stack is
/// relabeled so its third axis reads as depth rather than channels.
pub fn hyperstack_dims<T>(dataset: &Dataset<T>) -> Result<HyperstackDims> {
    let wrapped = HyperstackDims::wrap(dataset.shape());
    match (
        dataset.axis_index(AxisKind::Channel),
        dataset.axis_index(AxisKind::Z),
    ) {
        (None, Some(z)) if dataset.shape()[z] > 1 => Ok(wrapped.as_depth_stack(dataset.shape()[z])?),
        _ => Ok(wrapped),
    }
}

fn middle_plane<T>(dataset: &Dataset<T>) -> Vec<usize> {
    dataset.shape()[2..]
        .iter()
        .enumerate()
        .map(|(offset, extent)| match dataset.metadata.dims[offset + 2].axis {
            AxisKind::Z => extent / 2,
            _ => 0,
        })
        .collect()
}

/// Writes every block of `outcome` into `directory` as a TIFF hyperstack plus a JSON
/// sidecar, and optionally a PNG preview.
pub fn write_outcome<T: TiffSample>(
    outcome: &CropOutcome<T>,
    directory: &Path,
    options: &ExportOptions,
) -> Result<Vec<WrittenCrop>> {
    fs::create_dir_all(directory)?;
    let mut written = Vec::new();
    for dataset in outcome.datasets() {
        let label = dataset.label().unwrap_or_default();
        let stem = format!("{}{}", options.prefix, file_stem(label));
        let hyperstack = hyperstack_dims(dataset)?;

        let tiff = directory.join(format!("{stem}.tif"));
        write_hyperstack_tiff(&tiff, dataset, hyperstack)?;

        let sidecar = directory.join(format!("{stem}.json"));
        CropSidecar::from_dataset(dataset, hyperstack).write(&sidecar)?;

        let preview = if options.preview {
            let path = directory.join(format!("{stem}.png"));
            save_slice_png(&path, dataset, &middle_plane(dataset))?;
            debug!(path = %path.display(), "wrote preview");
            Some(path)
        } else {
            None
        };

        info!(label, path = %tiff.display(), ?hyperstack, "wrote crop");
        written.push(WrittenCrop {
            label: label.to_string(),
            hyperstack,
            tiff,
            sidecar,
            preview,
        });
    }
    Ok(written)
}

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::Pixel;
use crate::source::MultiResolutionSource;
use crate::transform::{AffineTransform3, Point3, Result as TransformResult};

use super::assemble::{Extraction, assemble_combined, assemble_separate};
use super::{
    CancellationToken, ClickResolver, CropBox, CropError, CropOutcome, CropRequest, CropSession,
    CropView, ParameterSource, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropStage {
    AwaitingClick,
    ParametersCollected,
    Validating,
    Extracting,
    Assembling,
    Done,
    Aborted,
}

/// Rounds to the nearest integer, halves towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Maps a world-space center into `transform`'s pixel space and centers a box of `size`
/// pixels on it.
pub fn resolve_crop_box(
    transform: &AffineTransform3,
    world_center: &Point3,
    size: [u64; 3],
) -> TransformResult<CropBox> {
    let center = transform.apply_inverse(world_center)?;
    let min = [0, 1, 2].map(|d| round_half_up(center[d] - 0.5 * size[d] as f64));
    Ok(CropBox { min, size })
}

/// Checks `level` against every channel; the first channel that lacks it fails the request.
pub fn validate_level<T: Pixel>(sources: &[MultiResolutionSource<T>], level: i64) -> Result<usize> {
    if sources.is_empty() {
        return Err(CropError::NoChannels);
    }
    for (channel, source) in sources.iter().enumerate() {
        if level < 0 || level as usize > source.max_level() {
            return Err(CropError::LevelOutOfRange {
                channel,
                requested: level,
                max_level: source.max_level(),
            });
        }
    }
    Ok(level as usize)
}

/// A single crop interaction, from click to assembled output. Either every channel is
/// produced or none is.
pub struct CropOperation<'a, T: Pixel> {
    sources: &'a [MultiResolutionSource<T>],
    session: &'a CropSession,
    cancel: CancellationToken,
    stage: CropStage,
}

impl<'a, T: Pixel> CropOperation<'a, T> {
    pub fn new(sources: &'a [MultiResolutionSource<T>], session: &'a CropSession) -> Self {
        Self {
            sources,
            session,
            cancel: CancellationToken::new(),
            stage: CropStage::AwaitingClick,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage(&self) -> CropStage {
        self.stage
    }

    /// Resolves a display click, asks `parameters` for the crop settings and runs the crop.
    pub fn click(
        &mut self,
        x: i32,
        y: i32,
        resolver: &dyn ClickResolver,
        parameters: &mut dyn ParameterSource,
    ) -> Result<CropOutcome<T>> {
        self.ensure_awaiting()?;
        let world_point = resolver.display_to_world(x, y);
        debug!(x, y, ?world_point, "resolved click");
        let Some(request) = parameters.collect(&self.session.defaults(), world_point) else {
            info!("crop cancelled");
            self.stage = CropStage::Aborted;
            return Err(CropError::Cancelled);
        };
        self.stage = CropStage::ParametersCollected;
        self.execute(&request)
    }

    /// Runs a crop whose parameters are already known.
    pub fn run(&mut self, request: &CropRequest) -> Result<CropOutcome<T>> {
        self.ensure_awaiting()?;
        self.stage = CropStage::ParametersCollected;
        self.execute(request)
    }

    fn ensure_awaiting(&self) -> Result<()> {
        match self.stage {
            CropStage::AwaitingClick => Ok(()),
            _ => Err(CropError::Finished),
        }
    }

    fn execute(&mut self, request: &CropRequest) -> Result<CropOutcome<T>> {
        let result = self.execute_stages(request);
        if result.is_err() {
            self.stage = CropStage::Aborted;
        }
        result
    }

    fn execute_stages(&mut self, request: &CropRequest) -> Result<CropOutcome<T>> {
        self.stage = CropStage::Validating;
        request.validate_footprint(T::PIXEL_TYPE.bytes() * self.sources.len())?;
        self.session.remember(request);
        let level = match validate_level(self.sources, request.level) {
            Ok(level) => level,
            Err(error) => {
                if let CropError::LevelOutOfRange { max_level, .. } = &error {
                    self.session.clamp_level(*max_level);
                }
                warn!(%error, "crop rejected");
                return Err(error);
            }
        };

        self.stage = CropStage::Extracting;
        let extractions = extract_channels(self.sources, request, level, &self.cancel)?;

        self.stage = CropStage::Assembling;
        let outcome = if request.combine_channels {
            assemble_combined(self.sources, extractions, request, level)?
        } else {
            assemble_separate(self.sources, extractions, request, level)?
        };
        self.stage = CropStage::Done;
        Ok(outcome)
    }
}

/// Crops `sources` with `request`, recording the parameters in `session`.
pub fn crop<T: Pixel>(
    sources: &[MultiResolutionSource<T>],
    session: &CropSession,
    request: &CropRequest,
) -> Result<CropOutcome<T>> {
    CropOperation::new(sources, session).run(request)
}

fn extract_channels<T: Pixel>(
    sources: &[MultiResolutionSource<T>],
    request: &CropRequest,
    level: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Extraction<T>>> {
    let center = request.center();
    sources
        .par_iter()
        .enumerate()
        .map(|(channel, source)| {
            if cancel.is_cancelled() {
                return Err(CropError::Cancelled);
            }
            let transform = source
                .level_transform(level)
                .map_err(|source| CropError::Source { channel, source })?;
            let crop_box = resolve_crop_box(&transform, &center, request.size)
                .map_err(|source| CropError::Transform { channel, source })?;
            info!(
                channel,
                "Cropping {:?} pixels at {:?} using scale level {}", crop_box.size, crop_box.min, level
            );
            let pixels = source
                .level(level)
                .map_err(|source| CropError::Source { channel, source })?;
            let view = CropView::new(channel, Arc::clone(pixels), crop_box);
            let data = view.materialize()?;
            Ok(Extraction {
                channel,
                crop_box,
                transform,
                view,
                data,
            })
        })
        .collect()
}

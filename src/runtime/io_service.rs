use std::path::Path;

use crate::crop::CropOutcome;
use crate::formats::{ExportOptions, TiffSample, WrittenCrop, write_outcome};

use super::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct IoService;

impl IoService {
    pub fn write<T: TiffSample>(
        &self,
        outcome: &CropOutcome<T>,
        directory: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<Vec<WrittenCrop>> {
        Ok(write_outcome(outcome, directory.as_ref(), options)?)
    }
}

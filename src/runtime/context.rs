use crate::crop::CropDefaults;

use super::{CropService, IoService, SourceService};

#[derive(Debug, Default)]
pub struct AppContext {
    source_service: SourceService,
    crop_service: CropService,
    io_service: IoService,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: CropDefaults) -> Self {
        Self {
            crop_service: CropService::new(defaults),
            ..Self::default()
        }
    }

    pub fn source_service(&self) -> &SourceService {
        &self.source_service
    }

    pub fn crop_service(&self) -> &CropService {
        &self.crop_service
    }

    pub fn io_service(&self) -> &IoService {
        &self.io_service
    }
}

use std::sync::{Mutex, PoisonError};

use crate::transform::Point3;

use super::{CropDefaults, CropRequest};

/// Owns the crop defaults shared by successive requests. Last writer wins.
#[derive(Debug, Default)]
pub struct CropSession {
    defaults: Mutex<CropDefaults>,
}

impl CropSession {
    pub fn new(defaults: CropDefaults) -> Self {
        Self {
            defaults: Mutex::new(defaults),
        }
    }

    pub fn defaults(&self) -> CropDefaults {
        self.defaults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_at(&self, world_point: Point3) -> CropRequest {
        self.defaults().request_at(world_point)
    }

    pub fn remember(&self, request: &CropRequest) {
        self.defaults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remember(request);
    }

    /// Resets the default level to the coarsest level that exists after a rejected request,
    /// whichever side of the valid range the request fell on.
    pub fn clamp_level(&self, max_level: usize) {
        let mut defaults = self.defaults.lock().unwrap_or_else(PoisonError::into_inner);
        defaults.scale_level = max_level as i64;
    }
}

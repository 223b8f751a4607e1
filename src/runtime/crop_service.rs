use std::sync::{Mutex, PoisonError};

use crate::crop::{
    CancellationToken, ClickResolver, CropDefaults, CropOperation, CropOutcome, CropRequest,
    CropSession, ParameterSource,
};
use crate::model::Pixel;
use crate::source::MultiResolutionSource;

use super::Result;

/// Runs crops against one shared session, so successive requests start from the last
/// parameters used.
#[derive(Debug, Default)]
pub struct CropService {
    session: CropSession,
    current: Mutex<CancellationToken>,
}

impl CropService {
    pub fn new(defaults: CropDefaults) -> Self {
        Self {
            session: CropSession::new(defaults),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn session(&self) -> &CropSession {
        &self.session
    }

    /// Token of the most recently started crop. Every crop gets a fresh token, so a
    /// cancellation never outlives the operation it was meant for.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn crop<T: Pixel>(
        &self,
        sources: &[MultiResolutionSource<T>],
        request: &CropRequest,
    ) -> Result<CropOutcome<T>> {
        Ok(self.operation(sources).run(request)?)
    }

    pub fn crop_at_click<T: Pixel>(
        &self,
        sources: &[MultiResolutionSource<T>],
        display: (i32, i32),
        resolver: &dyn ClickResolver,
        parameters: &mut dyn ParameterSource,
    ) -> Result<CropOutcome<T>> {
        Ok(self
            .operation(sources)
            .click(display.0, display.1, resolver, parameters)?)
    }

    fn operation<'a, T: Pixel>(
        &'a self,
        sources: &'a [MultiResolutionSource<T>],
    ) -> CropOperation<'a, T> {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        CropOperation::new(sources, &self.session).with_cancellation(token)
    }
}

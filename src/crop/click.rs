use crate::transform::{AffineTransform3, Point3, Result as TransformResult};

use super::{CropDefaults, CropRequest};

/// Converts a display click into world coordinates using the viewer's current navigation.
pub trait ClickResolver {
    fn display_to_world(&self, x: i32, y: i32) -> Point3;
}

impl<F> ClickResolver for F
where
    F: Fn(i32, i32) -> Point3,
{
    fn display_to_world(&self, x: i32, y: i32) -> Point3 {
        self(x, y)
    }
}

/// Resolves clicks through the inverse of a world-to-display viewer transform. The click
/// lies on the display plane, `z = 0`.
#[derive(Debug, Clone)]
pub struct ViewerTransformResolver {
    display_to_world: AffineTransform3,
}

impl ViewerTransformResolver {
    pub fn new(world_to_display: &AffineTransform3) -> TransformResult<Self> {
        Ok(Self {
            display_to_world: world_to_display.inverse()?,
        })
    }
}

impl ClickResolver for ViewerTransformResolver {
    fn display_to_world(&self, x: i32, y: i32) -> Point3 {
        self.display_to_world
            .apply(&[f64::from(x), f64::from(y), 0.0])
    }
}

/// Supplies crop parameters for a resolved click, or `None` if the user cancelled.
pub trait ParameterSource {
    fn collect(&mut self, defaults: &CropDefaults, world_point: Point3) -> Option<CropRequest>;
}

/// Accepts the session defaults unchanged, as a headless stand-in for a dialog.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptDefaults;

impl ParameterSource for AcceptDefaults {
    fn collect(&mut self, defaults: &CropDefaults, world_point: Point3) -> Option<CropRequest> {
        Some(defaults.request_at(world_point))
    }
}

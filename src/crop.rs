mod assemble;
mod cancel;
mod click;
mod engine;
mod error;
mod hyperstack;
mod request;
mod session;
mod view;

#[cfg(test)]
mod tests;

pub use assemble::{ChannelCrop, CombinedCrop, CropOutcome, stack_channels, swap_channel_and_depth};
pub use cancel::CancellationToken;
pub use click::{AcceptDefaults, ClickResolver, ParameterSource, ViewerTransformResolver};
pub use engine::{CropOperation, CropStage, crop, resolve_crop_box, round_half_up, validate_level};
pub use error::{CropError, ErrorKind, Result};
pub use hyperstack::HyperstackDims;
pub use request::{CropDefaults, CropRequest, load_defaults};
pub use session::CropSession;
pub use view::{CropBox, CropView};

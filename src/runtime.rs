mod context;
mod crop_service;
mod error;
mod io_service;
mod source_service;


pub use context::AppContext;
pub use crop_service::CropService;
pub use error::{AppError, Result};
pub use io_service::IoService;
pub use source_service::{ChannelSummary, LevelSummary, SourceService, SourceSummary};

mod builder;
mod chunked;
mod error;
mod level;
mod mipmap;
mod volatile;
mod voxel;


pub use builder::{
    ChannelSources, build_source, build_volatile_source, normalized_voxel_size, open_channels,
};
pub use chunked::{ChunkedLevel, DEFAULT_BLOCK_CACHE_CAPACITY};
pub use error::{Result, SourceError};
pub use level::{ArrayLevel, PixelLevel};
pub use mipmap::{MultiResolutionSource, mipmap_transform};
pub use volatile::{Volatile, VolatileLevel, VolatileSource};
pub use voxel::VoxelSize;

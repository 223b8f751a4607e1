mod attributes;
mod block;
mod error;
mod export_metadata;
mod memory;
mod n5;
mod store;

#[cfg(test)]
mod tests;

pub use attributes::{Compression, DataType, DatasetAttributes};
pub use block::DataBlock;
pub use error::{Result, StorageError};
pub use export_metadata::{ExportMetadata, PixelResolution, scale_level_path};
pub use memory::MemoryStore;
pub use n5::N5Store;
pub use store::ChunkStore;

pub(crate) use memory::grid_positions;

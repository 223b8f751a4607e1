use std::fmt::Debug;

use serde_json::{Map, Value};

use super::{DataBlock, DatasetAttributes, Result, StorageError};

/// Read access to a hierarchical chunked-array container.
///
/// Paths are `/`-separated group or dataset names relative to the container root; the
/// empty string is the root group.
pub trait ChunkStore: Debug + Send + Sync {
    /// The attributes object stored at `path`, or `None` if the group has none.
    fn attributes(&self, path: &str) -> Result<Option<Map<String, Value>>>;

    fn exists(&self, path: &str) -> bool;

    /// The block at `grid_position`, or `None` if it was never written.
    fn read_block(&self, path: &str, grid_position: &[u64]) -> Result<Option<DataBlock>>;

    fn dataset_attributes(&self, path: &str) -> Result<DatasetAttributes> {
        let attributes = self
            .attributes(path)?
            .ok_or_else(|| StorageError::MissingDataset(path.to_string()))?;
        let parsed: DatasetAttributes = serde_json::from_value(Value::Object(attributes))
            .map_err(|source| StorageError::Attributes {
                path: path.to_string(),
                source,
            })?;
        parsed.validate(path)?;
        Ok(parsed)
    }
}

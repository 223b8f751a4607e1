use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use ndarray::{Array, ArrayD, IxDyn, ShapeBuilder};
use tracing::trace;

use crate::model::Pixel;
use crate::storage::{ChunkStore, DataBlock, DatasetAttributes, StorageError, grid_positions};

use super::level::{clip_region, copy_overlap, zeros};
use super::{PixelLevel, Result};

pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 256;

type CachedBlock<T> = Option<Arc<ArrayD<T>>>;

/// A level backed by a chunked dataset, with an LRU cache of decoded blocks.
pub struct ChunkedLevel<T> {
    store: Arc<dyn ChunkStore>,
    path: String,
    attributes: DatasetAttributes,
    cache: Mutex<LruCache<Vec<u64>, CachedBlock<T>>>,
}

impl<T> std::fmt::Debug for ChunkedLevel<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ChunkedLevel")
            .field("path", &self.path)
            .field("dimensions", &self.attributes.dimensions)
            .field("block_size", &self.attributes.block_size)
            .finish()
    }
}

impl<T: Pixel> ChunkedLevel<T> {
    /// `attributes` must already be validated and describe `T` samples.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        path: impl Into<String>,
        attributes: DatasetAttributes,
        cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            path: path.into(),
            attributes,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    /// Origin of the block at `grid_position` in level coordinates.
    pub fn block_min(&self, grid_position: &[u64]) -> Vec<i64> {
        grid_position
            .iter()
            .zip(&self.attributes.block_size)
            .map(|(index, size)| (*index * u64::from(*size)) as i64)
            .collect()
    }

    /// Grid positions of every block overlapping the clipped region.
    pub(crate) fn blocks_overlapping(&self, overlap: &[(i64, i64)]) -> Vec<Vec<u64>> {
        let first: Vec<u64> = overlap
            .iter()
            .zip(&self.attributes.block_size)
            .map(|((lo, _), size)| *lo as u64 / u64::from(*size))
            .collect();
        let counts: Vec<u64> = overlap
            .iter()
            .zip(&self.attributes.block_size)
            .zip(&first)
            .map(|(((_, hi), size), start)| (*hi as u64 - 1) / u64::from(*size) - start + 1)
            .collect();
        grid_positions(&counts)
            .into_iter()
            .map(|offset| offset.iter().zip(&first).map(|(a, b)| a + b).collect())
            .collect()
    }

    /// The decoded block, or `None` for a block that was never written.
    pub fn block(&self, grid_position: &[u64]) -> Result<CachedBlock<T>> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(block) = cache.get(grid_position) {
                return Ok(block.clone());
            }
        }

        let block = match self.store.read_block(&self.path, grid_position)? {
            Some(raw) => Some(Arc::new(self.decode(grid_position, &raw)?)),
            None => None,
        };
        trace!(path = %self.path, ?grid_position, present = block.is_some(), "loaded block");

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(grid_position.to_vec(), block.clone());
        Ok(block)
    }

    fn decode(&self, grid_position: &[u64], raw: &DataBlock) -> Result<ArrayD<T>> {
        let size = &raw.size;
        let corrupt = |reason: String| StorageError::CorruptBlock {
            path: self.path.clone(),
            grid_position: grid_position.to_vec(),
            reason,
        };
        if size.len() != self.attributes.ndim() {
            return Err(corrupt(format!(
                "block has {} dimensions, dataset has {}",
                size.len(),
                self.attributes.ndim()
            ))
            .into());
        }
        if size
            .iter()
            .zip(&self.attributes.block_size)
            .any(|(actual, nominal)| actual > nominal)
        {
            return Err(corrupt(format!(
                "block size {size:?} exceeds {:?}",
                self.attributes.block_size
            ))
            .into());
        }
        let samples = raw
            .samples::<T>()
            .ok_or_else(|| corrupt("payload shorter than block extent".into()))?;
        let shape: Vec<usize> = size.iter().map(|value| *value as usize).collect();
        // N5 blocks are stored with the first axis varying fastest
        Array::from_shape_vec(IxDyn(&shape).f(), samples)
            .map_err(|error| corrupt(error.to_string()).into())
    }
}

impl<T: Pixel> PixelLevel<T> for ChunkedLevel<T> {
    fn dimensions(&self) -> &[u64] {
        &self.attributes.dimensions
    }

    fn read_region(&self, min: &[i64], size: &[usize]) -> Result<ArrayD<T>> {
        let mut out = zeros(size);
        let Some(overlap) = clip_region(&self.attributes.dimensions, min, size)? else {
            return Ok(out);
        };
        for grid_position in self.blocks_overlapping(&overlap) {
            let Some(block) = self.block(&grid_position)? else {
                continue;
            };
            let block_min = self.block_min(&grid_position);
            let block_overlap: Vec<(i64, i64)> = overlap
                .iter()
                .zip(&block_min)
                .zip(block.shape())
                .map(|(((lo, hi), start), extent)| {
                    ((*lo).max(*start), (*hi).min(start + *extent as i64))
                })
                .collect();
            if block_overlap.iter().any(|(lo, hi)| lo >= hi) {
                continue;
            }
            copy_overlap(&mut out, min, &block, &block_min, &block_overlap);
        }
        Ok(out)
    }

    fn get(&self, position: &[i64]) -> Result<T> {
        let inside = position.len() == self.attributes.ndim()
            && position
                .iter()
                .zip(&self.attributes.dimensions)
                .all(|(value, dimension)| *value >= 0 && (*value as u64) < *dimension);
        if !inside {
            return Ok(T::default());
        }
        let grid_position: Vec<u64> = position
            .iter()
            .zip(&self.attributes.block_size)
            .map(|(value, size)| *value as u64 / u64::from(*size))
            .collect();
        let Some(block) = self.block(&grid_position)? else {
            return Ok(T::default());
        };
        let local: Vec<usize> = position
            .iter()
            .zip(self.block_min(&grid_position))
            .map(|(value, start)| (value - start) as usize)
            .collect();
        Ok(block.get(IxDyn(&local)).copied().unwrap_or_default())
    }
}

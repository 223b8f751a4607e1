use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ndarray::{ArrayD, IxDyn};
use tracing::warn;

use crate::model::Pixel;

use super::level::{clip_region, copy_overlap, zeros};
use super::{ChunkedLevel, MultiResolutionSource, PixelLevel, Result};

/// A pixel value that may still be a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volatile<T> {
    pub value: T,
    pub valid: bool,
}

#[derive(Debug)]
enum BlockCell<T> {
    Loading,
    Ready(Option<Arc<ArrayD<T>>>),
}

type Cells<T> = Arc<Mutex<HashMap<Vec<u64>, BlockCell<T>>>>;

/// Non-blocking view of a chunked level.
///
/// Reads of blocks that are not loaded yet return zero placeholders and queue the load on
/// the rayon pool. A block that finished loading stays loaded; a failed load is forgotten
/// so the next access retries it.
pub struct VolatileLevel<T> {
    inner: Arc<ChunkedLevel<T>>,
    cells: Cells<T>,
}

impl<T> std::fmt::Debug for VolatileLevel<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("VolatileLevel")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: Pixel> VolatileLevel<T> {
    pub fn new(inner: Arc<ChunkedLevel<T>>) -> Self {
        Self {
            inner,
            cells: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The block if resolved; otherwise schedules it and returns `None`.
    fn poll_block(&self, grid_position: &[u64]) -> Option<Option<Arc<ArrayD<T>>>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        match cells.get(grid_position) {
            Some(BlockCell::Ready(block)) => return Some(block.clone()),
            Some(BlockCell::Loading) => return None,
            None => {}
        }
        cells.insert(grid_position.to_vec(), BlockCell::Loading);
        drop(cells);

        let inner = Arc::clone(&self.inner);
        let cells = Arc::clone(&self.cells);
        let grid_position = grid_position.to_vec();
        rayon::spawn(move || {
            let result = inner.block(&grid_position);
            let mut cells = cells.lock().unwrap_or_else(PoisonError::into_inner);
            match result {
                Ok(block) => {
                    cells.insert(grid_position, BlockCell::Ready(block));
                }
                Err(error) => {
                    warn!(path = inner.path(), ?grid_position, %error, "background block load failed");
                    cells.remove(&grid_position);
                }
            }
        });
        None
    }

    pub fn is_resolved(&self, grid_position: &[u64]) -> bool {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(cells.get(grid_position), Some(BlockCell::Ready(_)))
    }

    pub fn get_volatile(&self, position: &[i64]) -> Volatile<T> {
        let dimensions = self.inner.dimensions();
        let inside = position.len() == dimensions.len()
            && position
                .iter()
                .zip(dimensions)
                .all(|(value, dimension)| *value >= 0 && (*value as u64) < *dimension);
        if !inside {
            return Volatile {
                value: T::default(),
                valid: true,
            };
        }
        let block_size = &self.inner.attributes().block_size;
        let grid_position: Vec<u64> = position
            .iter()
            .zip(block_size)
            .map(|(value, size)| *value as u64 / u64::from(*size))
            .collect();
        match self.poll_block(&grid_position) {
            Some(Some(block)) => {
                let local: Vec<usize> = position
                    .iter()
                    .zip(self.inner.block_min(&grid_position))
                    .map(|(value, start)| (value - start) as usize)
                    .collect();
                Volatile {
                    value: block.get(IxDyn(&local)).copied().unwrap_or_default(),
                    valid: true,
                }
            }
            Some(None) => Volatile {
                value: T::default(),
                valid: true,
            },
            None => Volatile {
                value: T::default(),
                valid: false,
            },
        }
    }

    /// Reads a region without blocking; the flag is false if any block was a placeholder.
    pub fn read_region_volatile(&self, min: &[i64], size: &[usize]) -> Result<Volatile<ArrayD<T>>> {
        let mut out = zeros(size);
        let Some(overlap) = clip_region(self.inner.dimensions(), min, size)? else {
            return Ok(Volatile {
                value: out,
                valid: true,
            });
        };
        let mut valid = true;
        for grid_position in self.inner.blocks_overlapping(&overlap) {
            let block = match self.poll_block(&grid_position) {
                Some(Some(block)) => block,
                Some(None) => continue,
                None => {
                    valid = false;
                    continue;
                }
            };
            let block_min = self.inner.block_min(&grid_position);
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
        Ok(Volatile { value: out, valid })
    }
}

/// Plain reads block until the data is there, so crops taken from a volatile source
/// never contain placeholders. Only the `*_volatile` reads answer early.
impl<T: Pixel> PixelLevel<T> for VolatileLevel<T> {
    fn dimensions(&self) -> &[u64] {
        self.inner.dimensions()
    }

    fn read_region(&self, min: &[i64], size: &[usize]) -> Result<ArrayD<T>> {
        self.inner.read_region(min, size)
    }

    fn get(&self, position: &[i64]) -> Result<T> {
        self.inner.get(position)
    }
}

/// A source whose levels answer immediately with placeholders for unloaded blocks through
/// [`VolatileLevel::get_volatile`] and [`VolatileLevel::read_region_volatile`]. Crops of
/// [`VolatileSource::source`] read through the blocking path.
#[derive(Debug, Clone)]
pub struct VolatileSource<T: Pixel> {
    source: MultiResolutionSource<T>,
    levels: Vec<Arc<VolatileLevel<T>>>,
}

impl<T: Pixel> VolatileSource<T> {
    pub(crate) fn new(source: MultiResolutionSource<T>, levels: Vec<Arc<VolatileLevel<T>>>) -> Self {
        Self { source, levels }
    }

    pub fn source(&self) -> &MultiResolutionSource<T> {
        &self.source
    }

    pub fn volatile_level(&self, level: usize) -> Option<&Arc<VolatileLevel<T>>> {
        self.levels.get(level)
    }
}

use std::collections::HashMap;

use ndarray::{ArrayD, IxDyn};
use serde_json::{Map, Value};

use crate::model::Pixel;

use super::{ChunkStore, DataBlock, DataType, DatasetAttributes, Result};

/// An in-memory container, mostly useful for building sources from arrays already in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    attributes: HashMap<String, Map<String, Value>>,
    blocks: HashMap<(String, Vec<u64>), DataBlock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `attributes` into the object stored at `path`, creating the group if needed.
    pub fn set_attributes(&mut self, path: &str, attributes: Value) {
        let entry = self.attributes.entry(normalize(path)).or_default();
        if let Value::Object(map) = attributes {
            entry.extend(map);
        }
    }

    /// Stores `array` (indexed `[x, y, z, ...]`) as a chunked dataset at `path`.
    pub fn insert_array<T: Pixel>(&mut self, path: &str, array: &ArrayD<T>, block_size: &[u32]) {
        let dimensions = array.shape().iter().map(|size| *size as u64).collect();
        let attributes = DatasetAttributes::new(
            dimensions,
            block_size.to_vec(),
            DataType::from_pixel_type(T::PIXEL_TYPE),
        );
        let grid = attributes.grid_size();
        let path = normalize(path);

        for grid_position in grid_positions(&grid) {
            let min: Vec<usize> = grid_position
                .iter()
                .zip(block_size)
                .map(|(index, size)| *index as usize * *size as usize)
                .collect();
            let extent: Vec<u32> = min
                .iter()
                .zip(block_size)
                .zip(array.shape())
                .map(|((start, size), full)| (*size as usize).min(full - start) as u32)
                .collect();
            let mut samples = Vec::with_capacity(extent.iter().map(|e| *e as usize).product());
            for local in grid_positions(&extent.iter().map(|e| u64::from(*e)).collect::<Vec<_>>()) {
                let index: Vec<usize> = local
                    .iter()
                    .zip(&min)
                    .map(|(offset, start)| start + *offset as usize)
                    .collect();
                samples.push(array[IxDyn(&index)]);
            }
            self.blocks.insert(
                (path.clone(), grid_position),
                DataBlock::from_samples(extent, &samples),
            );
        }

        if let Ok(Value::Object(map)) = serde_json::to_value(&attributes) {
            self.attributes.entry(path).or_default().extend(map);
        }
    }

    /// Stores one block as-is, replacing whatever was at `grid_position`.
    pub fn insert_block(&mut self, path: &str, grid_position: &[u64], block: DataBlock) {
        self.blocks
            .insert((normalize(path), grid_position.to_vec()), block);
    }

    pub fn remove_block(&mut self, path: &str, grid_position: &[u64]) -> Option<DataBlock> {
        self.blocks.remove(&(normalize(path), grid_position.to_vec()))
    }
}

impl ChunkStore for MemoryStore {
    fn attributes(&self, path: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self.attributes.get(&normalize(path)).cloned())
    }

    fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        let prefix = format!("{path}/");
        path.is_empty()
            || self
                .attributes
                .keys()
                .any(|key| *key == path || key.starts_with(&prefix))
    }

    fn read_block(&self, path: &str, grid_position: &[u64]) -> Result<Option<DataBlock>> {
        Ok(self
            .blocks
            .get(&(normalize(path), grid_position.to_vec()))
            .cloned())
    }
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// All positions in a grid, first axis fastest.
pub(crate) fn grid_positions(extent: &[u64]) -> Vec<Vec<u64>> {
    if extent.contains(&0) {
        return Vec::new();
    }
    let total: u64 = extent.iter().product();
    let mut positions = Vec::with_capacity(total as usize);
    let mut current = vec![0_u64; extent.len()];
    for _ in 0..total {
        positions.push(current.clone());
        for (axis, value) in current.iter_mut().enumerate() {
            *value += 1;
            if *value < extent[axis] {
                break;
            }
            *value = 0;
        }
    }
    positions
}

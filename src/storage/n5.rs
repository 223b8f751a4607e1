use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use super::block::decode_n5_block;
use super::{ChunkStore, DataBlock, Result, StorageError};

const ATTRIBUTES_FILE: &str = "attributes.json";

/// A filesystem N5 container.
#[derive(Debug, Clone)]
pub struct N5Store {
    root: PathBuf,
}

impl N5Store {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StorageError::Io {
                path: root,
                source: std::io::Error::new(ErrorKind::NotFound, "N5 root is not a directory"),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn group_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl ChunkStore for N5Store {
    fn attributes(&self, path: &str) -> Result<Option<Map<String, Value>>> {
        let file = self.group_path(path).join(ATTRIBUTES_FILE);
        let raw = match fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path: file, source }),
        };
        let value: Value = serde_json::from_str(&raw).map_err(|source| StorageError::Attributes {
            path: path.to_string(),
            source,
        })?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            other => Err(StorageError::InvalidAttribute {
                path: path.to_string(),
                key: ATTRIBUTES_FILE.into(),
                reason: format!("expected a JSON object, found {other}"),
            }),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.group_path(path).is_dir()
    }

    fn read_block(&self, path: &str, grid_position: &[u64]) -> Result<Option<DataBlock>> {
        let file = grid_position
            .iter()
            .fold(self.group_path(path), |acc, index| acc.join(index.to_string()));
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path, ?grid_position, "block absent, reading as empty");
                return Ok(None);
            }
            Err(source) => return Err(StorageError::Io { path: file, source }),
        };
        let block = decode_n5_block(&bytes).map_err(|reason| StorageError::CorruptBlock {
            path: path.to_string(),
            grid_position: grid_position.to_vec(),
            reason,
        })?;
        Ok(Some(block))
    }
}

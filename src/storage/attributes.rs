use serde::{Deserialize, Serialize};

use crate::model::PixelType;

use super::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Object,
}

impl DataType {
    pub fn pixel_type(self) -> Option<PixelType> {
        match self {
            Self::Uint8 => Some(PixelType::U8),
            Self::Uint16 => Some(PixelType::U16),
            Self::Float32 => Some(PixelType::F32),
            _ => None,
        }
    }

    pub fn from_pixel_type(pixel_type: PixelType) -> Self {
        match pixel_type {
            PixelType::U8 => Self::Uint8,
            PixelType::U16 => Self::Uint16,
            PixelType::F32 => Self::Float32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compression {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Compression {
    pub fn raw() -> Self {
        Self { kind: "raw".into() }
    }
}

/// The `attributes.json` entries that describe an N5 dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    pub dimensions: Vec<u64>,
    pub block_size: Vec<u32>,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
    /// Pre-2.0 N5 containers store the codec name here instead of in `compression`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<String>,
}

impl DatasetAttributes {
    pub fn new(dimensions: Vec<u64>, block_size: Vec<u32>, data_type: DataType) -> Self {
        Self {
            dimensions,
            block_size,
            data_type,
            compression: Some(Compression::raw()),
            compression_type: None,
        }
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    pub fn compression_kind(&self) -> &str {
        self.compression
            .as_ref()
            .map(|compression| compression.kind.as_str())
            .or(self.compression_type.as_deref())
            .unwrap_or("raw")
    }

    pub fn pixel_type(&self) -> Result<PixelType> {
        self.data_type
            .pixel_type()
            .ok_or_else(|| StorageError::UnsupportedDataType(format!("{:?}", self.data_type)))
    }

    pub fn validate(&self, path: &str) -> Result<()> {
        if self.dimensions.len() != self.block_size.len() {
            return Err(StorageError::InvalidAttribute {
                path: path.to_string(),
                key: "blockSize".into(),
                reason: format!(
                    "has {} entries but dimensions has {}",
                    self.block_size.len(),
                    self.dimensions.len()
                ),
            });
        }
        if self.block_size.contains(&0) {
            return Err(StorageError::InvalidAttribute {
                path: path.to_string(),
                key: "blockSize".into(),
                reason: "block sizes must be positive".into(),
            });
        }
        if self.compression_kind() != "raw" {
            return Err(StorageError::UnsupportedCompression(
                self.compression_kind().to_string(),
            ));
        }
        self.pixel_type()?;
        Ok(())
    }

    /// Number of blocks along each axis.
    pub fn grid_size(&self) -> Vec<u64> {
        self.dimensions
            .iter()
            .zip(&self.block_size)
            .map(|(dimension, block)| dimension.div_ceil(u64::from(*block)))
            .collect()
    }
}

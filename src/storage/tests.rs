use std::fs;
use std::path::Path;
use std::sync::Arc;

use ndarray::{Array, IxDyn};
use serde_json::json;
use tempfile::tempdir;

use super::{
    ChunkStore, DataBlock, DataType, ExportMetadata, MemoryStore, N5Store, StorageError,
    scale_level_path,
};

fn encode_block(size: &[u32], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0_u16.to_be_bytes());
    bytes.extend_from_slice(&(size.len() as u16).to_be_bytes());
    for value in size {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes.extend_from_slice(payload);
    bytes
}

fn write_json(path: &Path, value: serde_json::Value) {
    fs::create_dir_all(path).expect("create group");
    fs::write(path.join("attributes.json"), value.to_string()).expect("write attributes");
}

#[test]
fn n5_store_reads_attributes_and_truncated_edge_blocks() {
    let dir = tempdir().expect("tempdir");
    let dataset = dir.path().join("c0").join("s0");
    write_json(
        &dataset,
        json!({
            "dimensions": [3, 2, 1],
            "blockSize": [2, 2, 1],
            "dataType": "uint16",
            "compression": {"type": "raw"}
        }),
    );
    let edge = dataset.join("1").join("0");
    fs::create_dir_all(&edge).expect("block dir");
    let payload: Vec<u8> = [7_u16, 9].iter().flat_map(|v| v.to_be_bytes()).collect();
    fs::write(edge.join("0"), encode_block(&[1, 2, 1], &payload)).expect("write block");

    let store = N5Store::open(dir.path()).expect("open");
    let attributes = store.dataset_attributes("c0/s0").expect("attributes");
    assert_eq!(attributes.data_type, DataType::Uint16);
    assert_eq!(attributes.grid_size(), vec![2, 1, 1]);

    let block = store
        .read_block("c0/s0", &[1, 0, 0])
        .expect("read")
        .expect("present");
    assert_eq!(block.size, vec![1, 2, 1]);
    assert_eq!(block.samples::<u16>(), Some(vec![7, 9]));
    assert!(store.read_block("c0/s0", &[0, 0, 0]).expect("read").is_none());
}

#[test]
fn legacy_compression_type_is_honoured() {
    let dir = tempdir().expect("tempdir");
    write_json(
        &dir.path().join("raw"),
        json!({"dimensions": [4], "blockSize": [4], "dataType": "uint8", "compressionType": "raw"}),
    );
    write_json(
        &dir.path().join("gz"),
        json!({"dimensions": [4], "blockSize": [4], "dataType": "uint8", "compression": {"type": "gzip"}}),
    );
    let store = N5Store::open(dir.path()).expect("open");
    assert!(store.dataset_attributes("raw").is_ok());
    let error = store.dataset_attributes("gz").expect_err("gzip unsupported");
    assert!(matches!(error, StorageError::UnsupportedCompression(kind) if kind == "gzip"));
}

#[test]
fn unsupported_data_type_and_missing_dataset_fail() {
    let dir = tempdir().expect("tempdir");
    write_json(
        &dir.path().join("d"),
        json!({"dimensions": [4], "blockSize": [4], "dataType": "float64"}),
    );
    let store = N5Store::open(dir.path()).expect("open");
    assert!(matches!(
        store.dataset_attributes("d"),
        Err(StorageError::UnsupportedDataType(_))
    ));
    assert!(matches!(
        store.dataset_attributes("nope"),
        Err(StorageError::MissingDataset(_))
    ));
    assert!(N5Store::open(dir.path().join("absent")).is_err());
}

#[test]
fn corrupt_block_header_is_reported() {
    let dir = tempdir().expect("tempdir");
    let dataset = dir.path().join("d");
    write_json(
        &dataset,
        json!({"dimensions": [4], "blockSize": [4], "dataType": "uint8"}),
    );
    fs::write(dataset.join("0"), [0_u8, 0, 0]).expect("write");
    let store = N5Store::open(dir.path()).expect("open");
    assert!(matches!(
        store.read_block("d", &[0]),
        Err(StorageError::CorruptBlock { .. })
    ));
}

#[test]
fn memory_store_chunks_arrays_x_fastest() {
    let array = Array::from_shape_fn((3, 2, 2), |(x, y, z)| (x + 10 * y + 100 * z) as u8).into_dyn();
    let mut store = MemoryStore::new();
    store.insert_array("c0/s0", &array, &[2, 2, 2]);

    let attributes = store.dataset_attributes("c0/s0").expect("attributes");
    assert_eq!(attributes.dimensions, vec![3, 2, 2]);
    assert!(store.exists("c0"));
    assert!(!store.exists("c1"));

    let block = store
        .read_block("c0/s0", &[1, 0, 0])
        .expect("read")
        .expect("present");
    assert_eq!(block.size, vec![1, 2, 2]);
    let samples = block.samples::<u8>().expect("samples");
    assert_eq!(samples, vec![2, 12, 102, 112]);
    assert_eq!(array[IxDyn(&[2, 1, 1])], 112);
}

#[test]
fn short_payload_yields_no_samples() {
    let block = DataBlock {
        size: vec![2, 2],
        data: vec![0, 1, 0],
    };
    assert!(block.samples::<u16>().is_none());
}

#[test]
fn export_metadata_prefers_channel_attributes_over_root() {
    let mut store = MemoryStore::new();
    store.set_attributes(
        "",
        json!({
            "scales": [[1, 1, 1], [2, 2, 1]],
            "pixelResolution": {"dimensions": [0.5, 0.5, 2.0], "unit": "um"},
            "name": "sample"
        }),
    );
    let level = Array::<u8, _>::zeros(IxDyn(&[4, 4, 2]));
    store.insert_array(&scale_level_path(0, 0), &level, &[4, 4, 2]);
    store.insert_array(&scale_level_path(1, 0), &level, &[4, 4, 2]);
    store.set_attributes(
        "c1",
        json!({
            "pixelResolution": [1.0, 1.0, 3.0],
            "affineTransform": [1, 0, 0, 5, 0, 1, 0, 6, 0, 0, 1, 7]
        }),
    );

    let metadata = ExportMetadata::load(Arc::new(store)).expect("metadata");
    assert_eq!(metadata.num_channels(), 2);
    assert_eq!(metadata.name(1).as_deref(), Some("sample"));
    assert_eq!(
        metadata.scales(1).expect("scales"),
        vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 1.0]]
    );

    let root_resolution = metadata.pixel_resolution(0).expect("read").expect("present");
    assert_eq!(root_resolution.dimensions, vec![0.5, 0.5, 2.0]);
    let channel_resolution = metadata.pixel_resolution(1).expect("read").expect("present");
    assert_eq!(channel_resolution.dimensions, vec![1.0, 1.0, 3.0]);
    assert_eq!(channel_resolution.unit, "um");

    assert!(metadata.affine_transform(0).expect("read").is_none());
    let transform = metadata.affine_transform(1).expect("read").expect("present");
    assert_eq!(transform.translation(), [5.0, 6.0, 7.0]);
}

#[test]
fn export_metadata_falls_back_to_downsampling_factors() {
    let mut store = MemoryStore::new();
    let level = Array::<u8, _>::zeros(IxDyn(&[2, 2, 2]));
    store.insert_array("c0/s0", &level, &[2, 2, 2]);
    store.insert_array("c0/s1", &level, &[2, 2, 2]);
    store.set_attributes("c0/s1", json!({"downsamplingFactors": [2, 2, 2]}));

    let metadata = ExportMetadata::load(Arc::new(store)).expect("metadata");
    assert_eq!(
        metadata.scales(0).expect("scales"),
        vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]]
    );
    assert!(metadata.pixel_resolution(0).expect("read").is_none());
}

#[test]
fn malformed_affine_transform_is_rejected() {
    let mut store = MemoryStore::new();
    store.set_attributes("c0", json!({"affineTransform": [1, 0, 0]}));
    let metadata = ExportMetadata::load(Arc::new(store)).expect("metadata");
    assert!(matches!(
        metadata.affine_transform(0),
        Err(StorageError::Transform(_))
    ));
}

use std::fs;
use std::sync::Arc;

use ndarray::{Array, ArrayD, IxDyn};
use serde_json::json;
use tempfile::tempdir;

use crate::model::AxisKind;
use crate::source::{
    ArrayLevel, ChannelSources, MultiResolutionSource, PixelLevel, SourceError, VoxelSize,
    open_channels,
};
use crate::storage::{DataBlock, ExportMetadata, MemoryStore, StorageError};
use crate::transform::{AffineTransform3, Point3};

use super::{
    AcceptDefaults, CancellationToken, CropBox, CropDefaults, CropError, CropOperation,
    CropOutcome, CropRequest, CropSession, CropStage, CropView, ErrorKind, HyperstackDims,
    ParameterSource, ViewerTransformResolver, crop, load_defaults, resolve_crop_box,
    round_half_up, stack_channels, swap_channel_and_depth, validate_level,
};

fn ramp(shape: (usize, usize, usize), offset: u16) -> ArrayD<u16> {
    Array::from_shape_fn(shape, |(x, y, z)| offset + (x + 2 * y + 3 * z) as u16).into_dyn()
}

fn source(name: &str, levels: usize, shape: (usize, usize, usize), offset: u16) -> MultiResolutionSource<u16> {
    let mut arrays = Vec::new();
    let mut scales = Vec::new();
    for level in 0..levels {
        let factor = 1_usize << level;
        let level_shape = (shape.0 / factor, shape.1 / factor, shape.2 / factor);
        arrays.push(Arc::new(ArrayLevel::new(ramp(level_shape, offset))) as Arc<dyn PixelLevel<u16>>);
        scales.push([factor as f64; 3]);
    }
    MultiResolutionSource::new(name, arrays, scales).expect("source")
}

fn separate(outcome: CropOutcome<u16>) -> Vec<super::ChannelCrop<u16>> {
    match outcome {
        CropOutcome::Separate(crops) => crops,
        CropOutcome::Combined(_) => panic!("expected separate crops"),
    }
}

struct Cancel;

impl ParameterSource for Cancel {
    fn collect(&mut self, _: &CropDefaults, _: Point3) -> Option<CropRequest> {
        None
    }
}

#[test]
fn rounding_is_half_up() {
    assert_eq!(round_half_up(2.5), 3);
    assert_eq!(round_half_up(-2.5), -2);
    assert_eq!(round_half_up(0.49), 0);
    assert_eq!(round_half_up(-0.51), -1);
}

#[test]
fn crop_is_centered_on_the_requested_point() {
    let sources = vec![source("c0", 1, (200, 200, 100), 0)];
    let session = CropSession::default();
    let request = CropRequest::new([100.0, 100.0, 50.0], [64, 64, 32], 0);

    let crops = separate(crop(&sources, &session, &request).expect("crop"));
    assert_eq!(crops.len(), 1);
    let channel = &crops[0];
    assert_eq!(channel.crop_box.min, [68, 68, 34]);
    assert_eq!(channel.crop_box.max(), [131, 131, 65]);
    assert_eq!(channel.calibration.pixel_size, [1.0, 1.0, 1.0]);
    assert_eq!(channel.calibration.origin, [68.0, 68.0, 34.0]);
    assert_eq!(channel.label, "channel 0 [100, 100, 50]");

    let dataset = &channel.dataset;
    assert_eq!(dataset.shape(), &[64, 64, 32]);
    assert_eq!(dataset.axis_index(AxisKind::Z), Some(2));
    assert_eq!(dataset.metadata.calibration(), Some(channel.calibration));
    let full = ramp((200, 200, 100), 0);
    assert_eq!(dataset.data[IxDyn(&[0, 0, 0])], full[IxDyn(&[68, 68, 34])]);
    assert_eq!(dataset.data[IxDyn(&[63, 10, 31])], full[IxDyn(&[131, 78, 65])]);
    assert_eq!(
        channel.view.get([63, 10, 31]).expect("view"),
        dataset.data[IxDyn(&[63, 10, 31])]
    );
}

#[test]
fn coarser_levels_use_their_own_calibration() {
    let sources = vec![
        source("c0", 2, (200, 200, 100), 0).with_voxel_size(VoxelSize::new([0.5, 0.5, 1.0], "um")),
    ];
    let transform = sources[0].level_transform(1).expect("transform");
    assert_eq!(transform.diagonal(), [2.0, 2.0, 4.0]);

    let crop_box = resolve_crop_box(&transform, &[100.0, 100.0, 50.0], [10, 10, 4]).expect("box");
    assert_eq!(crop_box.min, [45, 45, 10]);

    let request = CropRequest::new([100.0, 100.0, 50.0], [10, 10, 4], 1);
    let crops = separate(crop(&sources, &CropSession::default(), &request).expect("crop"));
    assert_eq!(crops[0].crop_box, crop_box);
    assert_eq!(crops[0].calibration.pixel_size, [2.0, 2.0, 4.0]);
    assert_eq!(crops[0].calibration.origin, [90.0, 90.0, 40.0]);
    assert_eq!(crops[0].level, 1);
}

#[test]
fn crops_outside_the_data_are_zero_filled() {
    let sources = vec![source("c0", 1, (20, 20, 10), 1)];
    let request = CropRequest::new([10_000.0, -5_000.0, 300.0], [16, 8, 4], 0);
    let crops = separate(crop(&sources, &CropSession::default(), &request).expect("crop"));
    let channel = &crops[0];
    assert_eq!(channel.dataset.shape(), &[16, 8, 4]);
    assert!(channel.dataset.data.iter().all(|value| *value == 0));
    for d in 0..3 {
        assert_eq!(
            channel.calibration.origin[d],
            channel.calibration.pixel_size[d] * channel.crop_box.min[d] as f64
        );
    }
}

#[test]
fn out_of_range_level_aborts_and_clamps_the_default() {
    let sources = vec![source("c0", 3, (16, 16, 16), 0)];
    let session = CropSession::default();
    let mut operation = CropOperation::new(&sources, &session);
    let error = operation
        .run(&CropRequest::new([8.0; 3], [4, 4, 4], 3))
        .expect_err("level 3 does not exist");
    assert!(matches!(
        error,
        CropError::LevelOutOfRange {
            channel: 0,
            requested: 3,
            max_level: 2
        }
    ));
    assert!(error.to_string().contains("[0, 2]"));
    assert_eq!(error.kind(), ErrorKind::Range);
    assert_eq!(operation.stage(), CropStage::Aborted);
    assert_eq!(session.defaults().scale_level, 2);
    assert_eq!(session.defaults().size(), [4, 4, 4]);

    let error = crop(&sources, &session, &CropRequest::new([8.0; 3], [4, 4, 4], -1))
        .expect_err("negative level");
    assert!(matches!(error, CropError::LevelOutOfRange { requested: -1, .. }));
    assert_eq!(session.defaults().scale_level, 2);
}

#[test]
fn level_is_checked_against_every_channel() {
    let sources = vec![source("c0", 3, (16, 16, 16), 0), source("c1", 2, (16, 16, 16), 0)];
    assert_eq!(validate_level(&sources, 1).expect("valid"), 1);
    assert!(matches!(
        validate_level(&sources, 2),
        Err(CropError::LevelOutOfRange {
            channel: 1,
            max_level: 1,
            ..
        })
    ));
    let empty: Vec<MultiResolutionSource<u16>> = Vec::new();
    assert!(matches!(validate_level(&empty, 0), Err(CropError::NoChannels)));
}

#[test]
fn zero_sized_requests_are_rejected() {
    let sources = vec![source("c0", 1, (8, 8, 8), 0)];
    let error = crop(&sources, &CropSession::default(), &CropRequest::new([4.0; 3], [4, 0, 4], 0))
        .expect_err("zero height");
    assert!(matches!(error, CropError::InvalidSize([4, 0, 4])));
}

#[test]
fn stacking_swaps_channel_and_depth_axes() {
    let channels: Vec<ArrayD<u16>> = (0..4).map(|c| ramp((10, 10, 20), 100 * c)).collect();
    let stacked = stack_channels(&channels).expect("stack");
    assert_eq!(stacked.shape(), &[10, 10, 20, 4]);
    let swapped = swap_channel_and_depth(stacked.clone()).expect("swap");
    assert_eq!(swapped.shape(), &[10, 10, 4, 20]);
    assert_eq!(swapped.len(), stacked.len());
    assert_eq!(swapped[IxDyn(&[3, 7, 2, 15])], stacked[IxDyn(&[3, 7, 15, 2])]);
    assert_eq!(swapped[IxDyn(&[3, 7, 2, 15])], channels[2][IxDyn(&[3, 7, 15])]);

    assert!(matches!(
        stack_channels(&[ramp((2, 2, 2), 0), ramp((2, 2, 3), 0)]),
        Err(CropError::Stack(_))
    ));
    assert!(matches!(
        swap_channel_and_depth(ramp((2, 2, 2), 0)),
        Err(CropError::Stack(_))
    ));
}

#[test]
fn combined_crop_stacks_channels_with_first_channel_calibration() {
    let sources = vec![
        source("c0", 1, (40, 40, 20), 0),
        source("c1", 1, (40, 40, 20), 1000),
    ];
    let request = CropRequest::new([20.0, 20.0, 10.0], [8, 6, 4], 0).combined(true);
    let outcome = crop(&sources, &CropSession::default(), &request).expect("crop");
    let CropOutcome::Combined(combined) = outcome else {
        panic!("expected a combined crop");
    };
    let dataset = &combined.dataset;
    assert_eq!(dataset.shape(), &[8, 6, 2, 4]);
    assert_eq!(dataset.axis_index(AxisKind::Channel), Some(2));
    assert_eq!(dataset.axis_index(AxisKind::Z), Some(3));
    assert_eq!(dataset.metadata.channel_names, vec!["c0", "c1"]);
    assert_eq!(combined.crop_box.min, [16, 17, 8]);
    assert_eq!(combined.calibration.origin, [16.0, 17.0, 8.0]);
    assert_eq!(combined.label, "[20, 20, 10]");

    let c0 = ramp((40, 40, 20), 0);
    let c1 = ramp((40, 40, 20), 1000);
    assert_eq!(dataset.data[IxDyn(&[1, 2, 0, 3])], c0[IxDyn(&[17, 19, 11])]);
    assert_eq!(dataset.data[IxDyn(&[1, 2, 1, 3])], c1[IxDyn(&[17, 19, 11])]);
}

#[test]
fn custom_center_overrides_the_click() {
    let sources = vec![source("c0", 1, (64, 64, 64), 0)];
    let request = CropRequest::new([1.0, 1.0, 1.0], [4, 4, 4], 0).with_custom_center([32.0, 30.0, 20.0]);
    let crops = separate(crop(&sources, &CropSession::default(), &request).expect("crop"));
    assert_eq!(crops[0].crop_box.min, [30, 28, 18]);
}

#[test]
fn labels_round_clicks_and_truncate_custom_centers() {
    let clicked = CropRequest::new([10.5, -2.5, 3.49], [1, 1, 1], 0);
    assert_eq!(clicked.center_label(), "[11, -2, 3]");
    let typed = clicked.with_custom_center([10.9, -2.7, 3.99]);
    assert_eq!(typed.center_label(), "[10, -2, 3]");
}

#[test]
fn metre_scaled_channel_transforms_still_crop() {
    let sources = vec![
        source("c0", 1, (16, 16, 16), 0).with_channel_transform(AffineTransform3::scaling([1e-5; 3])),
    ];
    let request = CropRequest::new([8e-5; 3], [4, 4, 4], 0);
    let crops = separate(crop(&sources, &CropSession::default(), &request).expect("crop"));
    assert_eq!(crops[0].crop_box.min, [6, 6, 6]);
    assert_eq!(crops[0].dataset.data[IxDyn(&[0, 0, 0])], ramp((16, 16, 16), 0)[IxDyn(&[6, 6, 6])]);
}

#[test]
fn oversized_requests_are_rejected_without_allocating() {
    let sources = vec![source("c0", 1, (8, 8, 8), 0)];
    let session = CropSession::default();
    for size in [[1 << 40; 3], [u64::MAX, 1, 1], [1 << 31, 1 << 31, 2]] {
        let error = crop(&sources, &session, &CropRequest::new([4.0; 3], size, 0))
            .expect_err("too large");
        assert!(matches!(error, CropError::InvalidSize(rejected) if rejected == size));
        assert_eq!(error.kind(), ErrorKind::Range);
    }
    assert_eq!(session.defaults(), CropDefaults::default());
}

#[test]
fn rejected_sizes_are_not_remembered() {
    let sources = vec![source("c0", 1, (8, 8, 8), 0)];
    let session = CropSession::new(CropDefaults {
        width: 2,
        height: 2,
        depth: 2,
        combine_channels: false,
        ..CropDefaults::default()
    });
    let mut operation = CropOperation::new(&sources, &session);
    operation
        .run(&CropRequest::new([4.0; 3], [0, 2, 2], 0))
        .expect_err("zero width");
    assert_eq!(operation.stage(), CropStage::Aborted);
    assert_eq!(session.defaults().size(), [2, 2, 2]);

    let resolver = |x: i32, y: i32| [f64::from(x), f64::from(y), 4.0];
    let crops = separate(
        CropOperation::new(&sources, &session)
            .click(4, 4, &resolver, &mut AcceptDefaults)
            .expect("defaults still usable"),
    );
    assert_eq!(crops[0].crop_box.size, [2, 2, 2]);
}

#[test]
fn storage_failure_in_any_channel_aborts_the_whole_crop() {
    let mut store = MemoryStore::new();
    store.set_attributes("", json!({"scales": [[1, 1, 1]]}));
    for channel in 0..2 {
        store.insert_array(&format!("c{channel}/s0"), &ramp((8, 8, 4), 0), &[4, 4, 4]);
    }
    store.insert_block(
        "c1/s0",
        &[1, 1, 0],
        DataBlock {
            size: vec![4, 4, 4],
            data: vec![0, 1, 2],
        },
    );
    let metadata = ExportMetadata::load(Arc::new(store)).expect("metadata");
    let ChannelSources::U16(sources) = open_channels(&metadata).expect("channels") else {
        panic!("expected 16-bit channels");
    };

    for combined in [false, true] {
        let session = CropSession::default();
        let mut operation = CropOperation::new(&sources, &session);
        let error = operation
            .run(&CropRequest::new([4.0, 4.0, 2.0], [8, 8, 4], 0).combined(combined))
            .expect_err("corrupt block");
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(matches!(
            error,
            CropError::Source {
                channel: 1,
                source: SourceError::Read(StorageError::CorruptBlock { .. })
            }
        ));
        assert_eq!(operation.stage(), CropStage::Aborted);
    }
}

#[test]
fn cancelled_operations_produce_nothing() {
    let sources = vec![source("c0", 1, (8, 8, 8), 0)];
    let session = CropSession::default();

    let token = CancellationToken::new();
    token.cancel();
    let mut operation = CropOperation::new(&sources, &session).with_cancellation(token);
    let error = operation
        .run(&CropRequest::new([4.0; 3], [2, 2, 2], 0))
        .expect_err("cancelled");
    assert!(matches!(error, CropError::Cancelled));
    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(operation.stage(), CropStage::Aborted);

    let mut operation = CropOperation::new(&sources, &session);
    let resolver = |x: i32, y: i32| [f64::from(x), f64::from(y), 0.0];
    let error = operation.click(4, 4, &resolver, &mut Cancel).expect_err("dialog cancelled");
    assert!(matches!(error, CropError::Cancelled));
    assert_eq!(operation.stage(), CropStage::Aborted);
}

#[test]
fn click_uses_session_defaults_and_operations_run_once() {
    let sources = vec![source("c0", 2, (32, 32, 32), 0)];
    let session = CropSession::new(CropDefaults {
        width: 4,
        height: 4,
        depth: 2,
        scale_level: 1,
        use_custom_center: false,
        combine_channels: false,
    });
    let mut operation = CropOperation::new(&sources, &session);
    assert_eq!(operation.stage(), CropStage::AwaitingClick);
    let resolver = |x: i32, y: i32| [f64::from(x), f64::from(y), 8.0];
    let crops = separate(
        operation
            .click(16, 12, &resolver, &mut AcceptDefaults)
            .expect("crop"),
    );
    assert_eq!(operation.stage(), CropStage::Done);
    assert_eq!(crops[0].crop_box.size, [4, 4, 2]);
    assert_eq!(crops[0].level, 1);

    assert!(matches!(
        operation.click(0, 0, &resolver, &mut AcceptDefaults),
        Err(CropError::Finished)
    ));
}

#[test]
fn session_remembers_the_last_request() {
    let sources = vec![source("c0", 2, (32, 32, 32), 0)];
    let session = CropSession::default();
    assert_eq!(session.defaults(), CropDefaults::default());

    let request = CropRequest::new([16.0; 3], [8, 6, 4], 1).combined(true);
    crop(&sources, &session, &request).expect("crop");
    let next = session.request_at([0.0, 0.0, 0.0]);
    assert_eq!(next.size, [8, 6, 4]);
    assert_eq!(next.level, 1);
    assert!(next.combine_channels);
}

#[test]
fn viewer_transform_resolver_inverts_the_display_mapping() {
    let world_to_display = AffineTransform3::scaling_translation([2.0, 2.0, 2.0], [10.0, 20.0, 0.0]);
    let resolver = ViewerTransformResolver::new(&world_to_display).expect("invertible");
    let sources = vec![source("c0", 1, (32, 32, 32), 0)];
    let session = CropSession::new(CropDefaults {
        width: 2,
        height: 2,
        depth: 2,
        combine_channels: false,
        ..CropDefaults::default()
    });
    let crops = separate(
        CropOperation::new(&sources, &session)
            .click(30, 40, &resolver, &mut AcceptDefaults)
            .expect("crop"),
    );
    assert_eq!(crops[0].crop_box.min, [9, 9, -1]);

    let singular = AffineTransform3::scaling([1.0, 0.0, 1.0]);
    assert!(ViewerTransformResolver::new(&singular).is_err());
}

#[test]
fn crop_view_is_bounded_by_its_box() {
    let level = Arc::new(ArrayLevel::new(ramp((8, 8, 8), 5))) as Arc<dyn PixelLevel<u16>>;
    let view = CropView::new(
        0,
        level,
        CropBox {
            min: [6, -1, 0],
            size: [4, 2, 2],
        },
    );
    assert_eq!(view.shape(), [4, 2, 2]);
    assert_eq!(view.get([0, 1, 0]).expect("inside"), 5 + 6);
    assert_eq!(view.get([3, 0, 0]).expect("zero fill"), 0);
    assert!(matches!(
        view.get([4, 0, 0]),
        Err(CropError::IndexOutsideView { .. })
    ));
    let data = view.materialize().expect("materialize");
    assert_eq!(data.shape(), &[4, 2, 2]);
    assert_eq!(data[IxDyn(&[1, 1, 1])], view.get([1, 1, 1]).expect("inside"));
}

#[test]
fn hyperstack_relabels_single_extra_axis_as_depth() {
    let wrapped = HyperstackDims::wrap(&[64, 64, 32]);
    assert_eq!(
        wrapped,
        HyperstackDims {
            channels: 32,
            slices: 1,
            frames: 1
        }
    );
    let relabeled = wrapped.as_depth_stack(32).expect("relabel");
    assert_eq!(relabeled.slices, 32);
    assert_eq!(relabeled.channels, 1);
    assert_eq!(relabeled.num_images(), 32);

    assert!(matches!(
        wrapped.as_depth_stack(16),
        Err(CropError::AmbiguousAxes { depth: 16, .. })
    ));
    let error = HyperstackDims::wrap(&[4, 4, 2, 3])
        .as_depth_stack(3)
        .expect_err("two extra axes");
    assert_eq!(error.kind(), ErrorKind::Layout);
}

#[test]
fn defaults_load_from_yaml_and_json() {
    let dir = tempdir().expect("tempdir");
    let yaml = dir.path().join("defaults.yaml");
    fs::write(&yaml, "width: 128\nheight: 64\nscaleLevel: 2\n").expect("write yaml");
    let defaults = load_defaults(&yaml).expect("yaml");
    assert_eq!(defaults.size(), [128, 64, 512]);
    assert_eq!(defaults.scale_level, 2);
    assert!(defaults.combine_channels);

    let json = dir.path().join("defaults.json");
    fs::write(&json, r#"{"depth": 16, "combine_channels": false}"#).expect("write json");
    let defaults = load_defaults(&json).expect("json");
    assert_eq!(defaults.size(), [1024, 1024, 16]);
    assert!(!defaults.combine_channels);

    let zero = dir.path().join("zero.json");
    fs::write(&zero, r#"{"width": 0}"#).expect("write json");
    assert!(matches!(load_defaults(&zero), Err(CropError::InvalidSize(_))));
    assert!(matches!(
        load_defaults(dir.path().join("missing.yaml")),
        Err(CropError::Config(_))
    ));
}

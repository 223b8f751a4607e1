use std::fs::File;
use std::sync::Arc;

use ndarray::{Array, ArrayD, IxDyn};
use tempfile::tempdir;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::crop::{CropOutcome, CropRequest, CropSession, HyperstackDims, crop};
use crate::model::{Dataset, Metadata, PixelType};
use crate::source::{ArrayLevel, MultiResolutionSource, PixelLevel};

use super::{
    CropSidecar, ExportOptions, IoError, file_stem, hyperstack_dims, imagej_description,
    write_hyperstack_tiff, write_outcome,
};

fn volume(shape: (usize, usize, usize), offset: u16) -> ArrayD<u16> {
    Array::from_shape_fn(shape, |(x, y, z)| offset + (x + 10 * y + 100 * z) as u16).into_dyn()
}

fn sources(channels: u16, shape: (usize, usize, usize)) -> Vec<MultiResolutionSource<u16>> {
    (0..channels)
        .map(|channel| {
            let level = Arc::new(ArrayLevel::new(volume(shape, 1000 * channel))) as Arc<dyn PixelLevel<u16>>;
            MultiResolutionSource::new(format!("c{channel}"), vec![level], vec![[1.0; 3]])
                .expect("source")
        })
        .collect()
}

fn pages(path: &std::path::Path) -> (Decoder<File>, Vec<Vec<u16>>) {
    let mut decoder = Decoder::new(File::open(path).expect("open tiff")).expect("decoder");
    let mut pages = Vec::new();
    loop {
        match decoder.read_image().expect("page") {
            DecodingResult::U16(page) => pages.push(page),
            other => panic!("unexpected sample type {other:?}"),
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().expect("next page");
    }
    (decoder, pages)
}

#[test]
fn separate_crops_become_depth_stacks() {
    let sources = sources(1, (12, 12, 8));
    let request = CropRequest::new([6.0, 6.0, 4.0], [6, 4, 3], 0);
    let outcome = crop(&sources, &CropSession::default(), &request).expect("crop");
    let dir = tempdir().expect("tempdir");
    let options = ExportOptions {
        prefix: "crop_".into(),
        preview: true,
    };

    let written = write_outcome(&outcome, dir.path(), &options).expect("write");
    assert_eq!(written.len(), 1);
    let crop = &written[0];
    assert_eq!(
        crop.hyperstack,
        HyperstackDims {
            channels: 1,
            slices: 3,
            frames: 1
        }
    );
    assert_eq!(crop.tiff, dir.path().join("crop_channel_0_6_6_4.tif"));
    assert!(crop.preview.as_ref().is_some_and(|path| path.exists()));

    let mut decoder = Decoder::new(File::open(&crop.tiff).expect("open")).expect("decoder");
    let description = decoder
        .get_tag_ascii_string(Tag::ImageDescription)
        .expect("description");
    assert!(description.contains("images=3\n"));
    assert!(description.contains("slices=3\n"));
    assert!(!description.contains("channels="));

    let (mut decoder, pages) = pages(&crop.tiff);
    assert_eq!(decoder.dimensions().expect("dimensions"), (6, 4));
    assert_eq!(pages.len(), 3);
    let source = volume((12, 12, 8), 0);
    // box min is (3, 4, 3)
    assert_eq!(pages[0][0], source[IxDyn(&[3, 4, 3])]);
    assert_eq!(pages[2][6 + 1], source[IxDyn(&[4, 5, 5])]);

    let sidecar = CropSidecar::read(&crop.sidecar).expect("sidecar");
    assert_eq!(sidecar.label, "channel 0 [6, 6, 4]");
    assert_eq!(sidecar.shape, vec![6, 4, 3]);
    let calibration = sidecar.calibration.expect("calibration");
    assert_eq!(calibration.origin, [3.0, 4.0, 3.0]);
}

#[test]
fn combined_crops_interleave_channels_per_slice() {
    let sources = sources(2, (10, 10, 10));
    let request = CropRequest::new([5.0, 5.0, 5.0], [4, 4, 3], 0).combined(true);
    let outcome = crop(&sources, &CropSession::default(), &request).expect("crop");
    assert!(matches!(outcome, CropOutcome::Combined(_)));
    let dir = tempdir().expect("tempdir");

    let written = write_outcome(&outcome, dir.path(), &ExportOptions::default()).expect("write");
    assert_eq!(written.len(), 1);
    assert!(written[0].preview.is_none());
    assert_eq!(
        written[0].hyperstack,
        HyperstackDims {
            channels: 2,
            slices: 3,
            frames: 1
        }
    );

    let (_, pages) = pages(&written[0].tiff);
    assert_eq!(pages.len(), 6);
    let c0 = volume((10, 10, 10), 0);
    let c1 = volume((10, 10, 10), 1000);
    // box min is (3, 3, 4); pages run channel-fastest
    assert_eq!(pages[0][0], c0[IxDyn(&[3, 3, 4])]);
    assert_eq!(pages[1][0], c1[IxDyn(&[3, 3, 4])]);
    assert_eq!(pages[5][0], c1[IxDyn(&[3, 3, 6])]);
    assert_eq!(pages[3][2 * 4 + 1], c1[IxDyn(&[4, 5, 5])]);
    assert_eq!(pages[2][3 * 4 + 3], c0[IxDyn(&[6, 6, 5])]);
}

#[test]
fn single_slice_crops_keep_the_generic_wrapping() {
    let sources = sources(1, (8, 8, 8));
    let request = CropRequest::new([4.0; 3], [4, 4, 1], 0);
    let CropOutcome::Separate(crops) = crop(&sources, &CropSession::default(), &request).expect("crop")
    else {
        panic!("expected separate crops");
    };
    assert_eq!(
        hyperstack_dims(&crops[0].dataset).expect("dims"),
        HyperstackDims {
            channels: 1,
            slices: 1,
            frames: 1
        }
    );
}

#[test]
fn description_lists_hyperstack_axes() {
    let dims = HyperstackDims {
        channels: 2,
        slices: 5,
        frames: 1,
    };
    let description = imagej_description(dims, Some("um"), Some(2.5), Some((0.0, 10.0)));
    assert!(description.starts_with("ImageJ="));
    for line in ["images=10", "channels=2", "slices=5", "hyperstack=true", "unit=um", "spacing=2.5", "max=10"] {
        assert!(description.contains(line), "{line} missing from {description}");
    }
    assert!(!description.contains("frames="));
}

#[test]
fn mismatched_hyperstack_dims_are_rejected() {
    let data = volume((2, 2, 3), 0);
    let dataset = Dataset::new(data, Metadata::from_shape(&[2, 2, 3], PixelType::U16)).expect("dataset");
    let dir = tempdir().expect("tempdir");
    let error = write_hyperstack_tiff(
        &dir.path().join("bad.tif"),
        &dataset,
        HyperstackDims {
            channels: 2,
            slices: 2,
            frames: 1,
        },
    )
    .expect_err("4 images for 3 planes");
    assert!(matches!(error, IoError::UnsupportedLayout(_)));
}

#[test]
fn file_stems_are_path_safe() {
    assert_eq!(file_stem("channel 0 [100, 100, 50]"), "channel_0_100_100_50");
    assert_eq!(file_stem("[-5, 3, 0]"), "-5_3_0");
}

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::{Rational, TiffEncoder, colortype};
use tiff::tags::{ResolutionUnit, Tag};

use crate::crop::HyperstackDims;
use crate::model::{AxisKind, Dataset, Pixel};

use super::util::{plane_indices, plane_samples};
use super::{IoError, Result};

/// Tags written on the first page only.
pub struct FirstPageTags {
    description: String,
    resolution: Option<[(u32, u32); 2]>,
}

/// Sample types with a grayscale TIFF encoding.
pub trait TiffSample: Pixel {
    #[doc(hidden)]
    fn write_page<W: Write + Seek>(
        encoder: &mut TiffEncoder<W>,
        width: u32,
        height: u32,
        samples: &[Self],
        tags: Option<&FirstPageTags>,
    ) -> Result<()>;
}

macro_rules! tiff_sample {
    ($pixel:ty, $color:ty) => {
        impl TiffSample for $pixel {
            fn write_page<W: Write + Seek>(
                encoder: &mut TiffEncoder<W>,
                width: u32,
                height: u32,
                samples: &[Self],
                tags: Option<&FirstPageTags>,
            ) -> Result<()> {
                let mut image = encoder.new_image::<$color>(width, height)?;
                if let Some(tags) = tags {
                    image
                        .encoder()
                        .write_tag(Tag::ImageDescription, tags.description.as_str())?;
                    if let Some([(xn, xd), (yn, yd)]) = tags.resolution {
                        image.resolution_unit(ResolutionUnit::None);
                        image.x_resolution(Rational { n: xn, d: xd });
                        image.y_resolution(Rational { n: yn, d: yd });
                    }
                }
                image.write_data(samples)?;
                Ok(())
            }
        }
    };
}

tiff_sample!(u8, colortype::Gray8);
tiff_sample!(u16, colortype::Gray16);
tiff_sample!(f32, colortype::Gray32Float);

/// The ImageJ header that tells readers how to split the pages into channels, slices and
/// frames.
pub fn imagej_description(
    dims: HyperstackDims,
    unit: Option<&str>,
    z_spacing: Option<f64>,
    display_range: Option<(f32, f32)>,
) -> String {
    let mut description = format!("ImageJ=1.11a\nimages={}\n", dims.num_images());
    if dims.channels > 1 {
        description.push_str(&format!("channels={}\n", dims.channels));
    }
    if dims.slices > 1 {
        description.push_str(&format!("slices={}\n", dims.slices));
    }
    if dims.frames > 1 {
        description.push_str(&format!("frames={}\n", dims.frames));
    }
    let non_trivial = [dims.channels, dims.slices, dims.frames]
        .iter()
        .filter(|size| **size > 1)
        .count();
    if non_trivial > 1 {
        description.push_str("hyperstack=true\n");
    }
    if dims.channels > 1 {
        description.push_str("mode=grayscale\n");
    }
    if let Some(unit) = unit {
        description.push_str(&format!("unit={unit}\n"));
    }
    if let Some(spacing) = z_spacing.filter(|_| dims.slices > 1) {
        description.push_str(&format!("spacing={spacing}\n"));
    }
    if let Some((min, max)) = display_range {
        description.push_str(&format!("min={min}\nmax={max}\n"));
    }
    description.push_str("loop=false\n");
    description
}

/// `1 / pixel_size` as a TIFF rational.
fn pixels_per_unit(pixel_size: f64) -> (u32, u32) {
    let value = if pixel_size > 0.0 { 1.0 / pixel_size } else { 1.0 };
    let d: u32 = if value < 4_000.0 { 1_000_000 } else { 1 };
    let n = (value * f64::from(d)).round().clamp(1.0, f64::from(u32::MAX)) as u32;
    (n, d)
}

/// Writes `dataset` as a multi-page grayscale TIFF, one page per XY plane, with the
/// trailing axes in channel, slice, frame order.
pub fn write_hyperstack_tiff<T: TiffSample>(
    path: &Path,
    dataset: &Dataset<T>,
    dims: HyperstackDims,
) -> Result<()> {
    let shape = dataset.shape();
    if !(2..=5).contains(&shape.len()) {
        return Err(IoError::UnsupportedLayout(format!(
            "TIFF hyperstacks need 2 to 5 axes, found shape {shape:?}"
        )));
    }
    let planes = plane_indices(shape);
    if planes.len() != dims.num_images() {
        return Err(IoError::UnsupportedLayout(format!(
            "{dims:?} describes {} images but shape {shape:?} has {}",
            dims.num_images(),
            planes.len()
        )));
    }
    let width = u32::try_from(shape[0])
        .map_err(|_| IoError::UnsupportedLayout(format!("width {} is too large", shape[0])))?;
    let height = u32::try_from(shape[1])
        .map_err(|_| IoError::UnsupportedLayout(format!("height {} is too large", shape[1])))?;

    let calibration = dataset.metadata.calibration();
    let unit = dataset
        .metadata
        .axis_index(AxisKind::X)
        .and_then(|index| dataset.metadata.dims[index].unit.as_deref());
    let tags = FirstPageTags {
        description: imagej_description(
            dims,
            unit,
            calibration.map(|calibration| calibration.pixel_size[2]),
            dataset.min_max(),
        ),
        resolution: calibration.map(|calibration| {
            [
                pixels_per_unit(calibration.pixel_size[0]),
                pixels_per_unit(calibration.pixel_size[1]),
            ]
        }),
    };

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    for (page, trailing) in planes.iter().enumerate() {
        let samples = plane_samples(dataset, trailing);
        T::write_page(
            &mut encoder,
            width,
            height,
            &samples,
            (page == 0).then_some(&tags),
        )?;
    }
    Ok(())
}

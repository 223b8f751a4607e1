use ndarray::IxDyn;

use crate::model::{Dataset, Pixel};

/// Samples of one XY plane in row-major order. `trailing` indexes every axis after X and Y.
pub(crate) fn plane_samples<T: Pixel>(dataset: &Dataset<T>, trailing: &[usize]) -> Vec<T> {
    let shape = dataset.shape();
    let (width, height) = (shape[0], shape[1]);
    let mut index = Vec::with_capacity(2 + trailing.len());
    index.extend_from_slice(&[0, 0]);
    index.extend_from_slice(trailing);
    let mut samples = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            index[0] = x;
            index[1] = y;
            samples.push(dataset.data[IxDyn(&index)]);
        }
    }
    samples
}

/// Trailing indices of every plane, first trailing axis fastest.
pub(crate) fn plane_indices(shape: &[usize]) -> Vec<Vec<usize>> {
    let trailing = shape.get(2..).unwrap_or_default();
    let count: usize = trailing.iter().product();
    (0..count)
        .map(|mut plane| {
            trailing
                .iter()
                .map(|extent| {
                    let index = plane % extent;
                    plane /= extent;
                    index
                })
                .collect()
        })
        .collect()
}

pub(crate) fn to_u8_samples(values: &[f32]) -> Vec<u8> {
    let (min, max) = min_max(values);
    values
        .iter()
        .map(|value| {
            let normalized = if (max - min).abs() < f32::EPSILON {
                0.0
            } else {
                (*value - min) / (max - min)
            };
            (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

pub(crate) fn min_max(values: &[f32]) -> (f32, f32) {
    let mut iter = values.iter().copied();
    let first = iter.next().unwrap_or(0.0);
    let mut min = first;
    let mut max = first;
    for value in iter {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    (min, max)
}

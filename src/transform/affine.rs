use serde::{Deserialize, Serialize};

use super::{Result, TransformError};

pub type Point3 = [f64; 3];

/// A 3D affine transform stored as the top three rows of a homogeneous 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct AffineTransform3 {
    m: [[f64; 4]; 3],
}

impl Default for AffineTransform3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform3 {
    pub fn identity() -> Self {
        Self::scaling([1.0; 3])
    }

    pub fn scaling(scale: [f64; 3]) -> Self {
        let mut m = [[0.0; 4]; 3];
        for d in 0..3 {
            m[d][d] = scale[d];
        }
        Self { m }
    }

    pub fn scaling_translation(scale: [f64; 3], translation: [f64; 3]) -> Self {
        let mut transform = Self::scaling(scale);
        for d in 0..3 {
            transform.m[d][3] = translation[d];
        }
        transform
    }

    /// Builds from 12 values in row-packed order `m00 m01 m02 m03 m10 ... m23`.
    pub fn from_row_packed(values: &[f64]) -> Result<Self> {
        if values.len() != 12 {
            return Err(TransformError::InvalidLength(values.len()));
        }
        let mut m = [[0.0; 4]; 3];
        for (index, value) in values.iter().enumerate() {
            m[index / 4][index % 4] = *value;
        }
        Ok(Self { m })
    }

    pub fn row_packed(&self) -> Vec<f64> {
        self.m.iter().flatten().copied().collect()
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.m[row][column]
    }

    pub fn set(&mut self, value: f64, row: usize, column: usize) {
        self.m[row][column] = value;
    }

    pub fn diagonal(&self) -> [f64; 3] {
        [self.m[0][0], self.m[1][1], self.m[2][2]]
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }

    /// True when the linear part has no off-diagonal terms.
    pub fn is_axis_aligned(&self) -> bool {
        (0..3).all(|row| (0..3).all(|column| row == column || self.m[row][column] == 0.0))
    }

    pub fn apply(&self, point: &Point3) -> Point3 {
        let mut out = [0.0; 3];
        for (row, value) in out.iter_mut().enumerate() {
            let r = &self.m[row];
            *value = r[0] * point[0] + r[1] * point[1] + r[2] * point[2] + r[3];
        }
        out
    }

    /// Returns `self ∘ other`: `other` is applied first.
    pub fn concatenate(&self, other: &Self) -> Self {
        let mut m = [[0.0; 4]; 3];
        for row in 0..3 {
            for column in 0..4 {
                let mut sum = if column == 3 { self.m[row][3] } else { 0.0 };
                for k in 0..3 {
                    sum += self.m[row][k] * other.m[k][column];
                }
                m[row][column] = sum;
            }
        }
        Self { m }
    }

    /// Returns `other ∘ self`: `self` is applied first.
    pub fn pre_concatenate(&self, other: &Self) -> Self {
        other.concatenate(self)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Fails only for an exactly singular or non-finite linear part; small but nonzero
    /// scales such as metre-based calibrations stay invertible.
    pub fn inverse(&self) -> Result<Self> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant == 0.0 {
            return Err(TransformError::Singular { determinant });
        }
        let m = &self.m;
        let mut inv = [[0.0; 4]; 3];
        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / determinant;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / determinant;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / determinant;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / determinant;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / determinant;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / determinant;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / determinant;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / determinant;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / determinant;
        for row in 0..3 {
            inv[row][3] =
                -(inv[row][0] * m[0][3] + inv[row][1] * m[1][3] + inv[row][2] * m[2][3]);
        }
        Ok(Self { m: inv })
    }

    pub fn apply_inverse(&self, point: &Point3) -> Result<Point3> {
        Ok(self.inverse()?.apply(point))
    }
}

impl TryFrom<Vec<f64>> for AffineTransform3 {
    type Error = TransformError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_row_packed(&values)
    }
}

impl From<AffineTransform3> for Vec<f64> {
    fn from(transform: AffineTransform3) -> Self {
        transform.row_packed()
    }
}

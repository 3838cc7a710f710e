//! Affine placement transforms
//!
//! 3MF stores a transform as twelve numbers `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30
//! m31 m32` of a 4×4 matrix applied to row vectors, so the translation is the last
//! three values. Hosts usually hand out column-vector 4×4 matrices; [`Transform`]
//! converts between the two through `nalgebra`.

use nalgebra::{Matrix4, Vector4};

use super::core::Vertex;

/// Number of values in a 3MF transform attribute
pub const TRANSFORM_MATRIX_SIZE: usize = 12;

/// 3×4 affine transform in 3MF value order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    values: [f64; TRANSFORM_MATRIX_SIZE],
}

impl Transform {
    /// The identity transform
    pub fn identity() -> Self {
        Self {
            values: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Wrap values already in 3MF order
    pub fn from_values(values: [f64; TRANSFORM_MATRIX_SIZE]) -> Self {
        Self { values }
    }

    /// Values in 3MF order
    pub fn values(&self) -> &[f64; TRANSFORM_MATRIX_SIZE] {
        &self.values
    }

    /// Convert a column-vector matrix (translation in the last column)
    pub fn from_matrix(matrix: &Matrix4<f64>) -> Self {
        let mut values = [0.0; TRANSFORM_MATRIX_SIZE];
        for column in 0..4 {
            for row in 0..3 {
                values[column * 3 + row] = matrix[(row, column)];
            }
        }
        Self { values }
    }

    /// Convert row-major rows of a column-vector matrix, as hosts usually expose them
    pub fn from_rows(rows: &[[f64; 4]; 4]) -> Self {
        let matrix = Matrix4::from_fn(|r, c| rows[r][c]);
        Self::from_matrix(&matrix)
    }

    /// Column-vector matrix equivalent
    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|row, column| match row {
            3 => {
                if column == 3 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => self.values[column * 3 + row],
        })
    }

    /// Row-major rows of the column-vector matrix
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let matrix = self.to_matrix();
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = matrix[(r, c)];
            }
        }
        rows
    }

    /// Translation component
    pub fn translation(&self) -> [f64; 3] {
        [self.values[9], self.values[10], self.values[11]]
    }

    /// Copy with the translation multiplied by `factor`; rotation and shear are kept
    pub fn with_scaled_translation(&self, factor: f64) -> Self {
        let mut values = self.values;
        for value in &mut values[9..] {
            *value *= factor;
        }
        Self { values }
    }

    /// Transform applying `self` first and `next` afterwards
    pub fn then(&self, next: &Transform) -> Self {
        Self::from_matrix(&(next.to_matrix() * self.to_matrix()))
    }

    /// Apply to a point
    pub fn apply(&self, vertex: &Vertex) -> Vertex {
        let p = self.to_matrix() * Vector4::new(vertex.x, vertex.y, vertex.z, 1.0);
        Vertex::new(p.x, p.y, p.z)
    }

    /// True when every value matches the identity within `f64::EPSILON`
    pub fn is_identity(&self) -> bool {
        self.values
            .iter()
            .zip(Self::identity().values.iter())
            .all(|(a, b)| (a - b).abs() <= f64::EPSILON)
    }

    /// True when every value is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

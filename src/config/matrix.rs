use serde::{Deserialize, Serialize};

use crate::errors::{Result, SimulationError, config_error};

/// Dense square matrix stored row-major.
///
/// Serialized as a list of rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    matrix: Vec<f64>,
    size: usize,
}

impl Matrix {
    pub fn from_vec(rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != rows.len()) {
            return Err(config_error!(
                "matrix with {} rows has a row of length {}",
                rows.len(),
                row.len()
            ));
        }

        let matrix = rows.into_iter().flatten().collect::<Vec<f64>>();
        let size = (matrix.len() as f64).sqrt() as usize;
        Ok(Self { matrix, size })
    }

    pub fn zeros(size: usize) -> Self {
        Self {
            matrix: vec![0.; size * size],
            size,
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size);
        (0..size).for_each(|i| matrix.matrix[i * size + i] = 1.);
        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[row * self.size + col]
    }

    /// Add `factor * other` to this matrix in place.
    pub fn add_scaled(&mut self, other: &Matrix, factor: f64) {
        for (value, increment) in self.matrix.iter_mut().zip(&other.matrix) {
            *value += factor * increment;
        }
    }

    pub fn has_negative_entries(&self) -> bool {
        self.matrix.iter().any(|&value| value < 0.)
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = SimulationError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_vec(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(matrix: Matrix) -> Self {
        if matrix.size == 0 {
            return Vec::new();
        }
        matrix
            .matrix
            .chunks(matrix.size)
            .map(<[f64]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_matrix() {
        let matrix = Matrix::from_vec(vec![vec![1., 2.], vec![3., 4.]]).unwrap();
        assert_eq!(matrix.size(), 2);
        assert_eq!(matrix.get(1, 0), 3.);
        assert_eq!(matrix.get(0, 1), 2.);
    }

    #[test]
    fn reject_non_square() {
        assert!(Matrix::from_vec(vec![vec![1., 2.], vec![3.]]).is_err());
        assert!(serde_yaml::from_str::<Matrix>("[[1, 2, 3], [4, 5, 6]]").is_err());
    }

    #[test]
    fn weighted_sum() {
        let mut matrix = Matrix::zeros(2);
        matrix.add_scaled(&Matrix::identity(2), 0.5);
        matrix.add_scaled(&Matrix::from_vec(vec![vec![0., 1.], vec![1., 0.]]).unwrap(), 2.);
        assert_eq!(Vec::<Vec<f64>>::from(matrix), vec![vec![0.5, 2.], vec![2., 0.5]]);
    }
}

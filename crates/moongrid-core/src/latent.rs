//! Latent vectors and grids
//!
//! A [`LatentVector`] is the descriptor consumed by the synthesis model.
//! A [`LatentGrid`] holds `cols × rows` of them as interpolation control
//! points. Vectors are never edited once sampled; new vectors come out of
//! arithmetic or out of the interpolators.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::rng::{LatentRng, UniformSource};

/// Fixed-length latent vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatentVector {
    values: Vec<f32>,
}

impl LatentVector {
    /// Wrap existing values
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// All-zero vector
    pub fn zeros(dim: usize) -> Self {
        Self {
            values: vec![0.0; dim],
        }
    }

    /// `dim` independent standard-normal draws
    pub fn random<S: UniformSource>(rng: &mut LatentRng<S>, dim: usize) -> Self {
        let values = (0..dim).map(|_| rng.gaussian(0.0, 1.0) as f32).collect();
        Self { values }
    }

    /// Number of components
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Borrow the components
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Iterate over components
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.values.iter()
    }

    /// Consume into the raw components
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// Sum of absolute components
    pub fn l1_norm(&self) -> f64 {
        self.values.iter().map(|v| v.abs() as f64).sum()
    }

    /// True if no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Component-wise `self - other`
    pub fn difference(&self, other: &LatentVector) -> Result<LatentVector> {
        self.check_dim(other)?;
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Self { values })
    }

    /// Every component multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> LatentVector {
        let values = self
            .values
            .iter()
            .map(|v| (*v as f64 * factor) as f32)
            .collect();
        Self { values }
    }

    /// Fail unless `other` has the same dimension
    pub fn check_dim(&self, other: &LatentVector) -> Result<()> {
        if self.dim() != other.dim() {
            return Err(CoreError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        Ok(())
    }

    /// Scratch access for accumulators that fully overwrite the vector
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

impl From<Vec<f32>> for LatentVector {
    fn from(values: Vec<f32>) -> Self {
        Self::from_vec(values)
    }
}

/// 2D grid of latent vectors indexed by (column, row)
#[derive(Debug, Clone, PartialEq)]
pub struct LatentGrid {
    cols: usize,
    rows: usize,
    dim: usize,
    /// Row-major: cell (x, y) lives at `y * cols + x`
    cells: Vec<LatentVector>,
}

impl LatentGrid {
    /// Build a grid from row-major cells, validating shape and dimension
    pub fn from_cells(cols: usize, rows: usize, cells: Vec<LatentVector>) -> Result<Self> {
        if cols < 2 || rows < 2 {
            return Err(CoreError::GridTooSmall { cols, rows });
        }
        if cells.len() != cols * rows {
            return Err(CoreError::CellCount {
                expected: cols * rows,
                actual: cells.len(),
            });
        }

        let dim = cells[0].dim();
        if dim == 0 {
            return Err(CoreError::ZeroDimension);
        }
        if let Some(bad) = cells.iter().find(|c| c.dim() != dim) {
            return Err(CoreError::DimensionMismatch {
                expected: dim,
                actual: bad.dim(),
            });
        }

        Ok(Self {
            cols,
            rows,
            dim,
            cells,
        })
    }

    /// Build a grid cell by cell, visiting rows top to bottom and columns
    /// left to right
    pub fn from_fn(
        cols: usize,
        rows: usize,
        mut f: impl FnMut(usize, usize) -> LatentVector,
    ) -> Result<Self> {
        let mut cells = Vec::with_capacity(cols * rows);
        for y in 0..rows {
            for x in 0..cols {
                cells.push(f(x, y));
            }
        }
        Self::from_cells(cols, rows, cells)
    }

    /// Grid of all-zero vectors
    pub fn zeros(cols: usize, rows: usize, dim: usize) -> Result<Self> {
        Self::from_fn(cols, rows, |_, _| LatentVector::zeros(dim))
    }

    /// Grid with every cell drawn independently from `rng`
    pub fn random<S: UniformSource>(
        rng: &mut LatentRng<S>,
        cols: usize,
        rows: usize,
        dim: usize,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(CoreError::ZeroDimension);
        }
        Self::from_fn(cols, rows, |_, _| LatentVector::random(rng, dim))
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Dimension shared by every cell
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `(cols, rows, dim)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.cols, self.rows, self.dim)
    }

    /// Cell at (x, y)
    pub fn get(&self, x: usize, y: usize) -> Option<&LatentVector> {
        if x < self.cols && y < self.rows {
            Some(&self.cells[y * self.cols + x])
        } else {
            None
        }
    }

    /// Iterate `(x, y, cell)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &LatentVector)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % self.cols, i / self.cols, cell))
    }

    /// Fail unless `other` has the same columns, rows and dimension
    pub fn check_shape(&self, other: &LatentGrid) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    pub(crate) fn cell(&self, x: usize, y: usize) -> &LatentVector {
        &self.cells[y * self.cols + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let z = LatentVector::zeros(8);
        assert_eq!(z.dim(), 8);
        assert!(z.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_random_grid_is_reproducible() {
        let a = LatentGrid::random(&mut LatentRng::seeded(42), 3, 4, 16).unwrap();
        let b = LatentGrid::random(&mut LatentRng::seeded(42), 3, 4, 16).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), (3, 4, 16));
        assert!(a.iter().all(|(_, _, v)| v.is_finite() && v.dim() == 16));
    }

    #[test]
    fn test_random_grid_fill_order() {
        // Cells are drawn row by row, so cell (1, 0) is the second vector drawn.
        let grid = LatentGrid::random(&mut LatentRng::seeded(9), 2, 2, 4).unwrap();
        let mut rng = LatentRng::seeded(9);
        let first = LatentVector::random(&mut rng, 4);
        let second = LatentVector::random(&mut rng, 4);

        assert_eq!(grid.get(0, 0), Some(&first));
        assert_eq!(grid.get(1, 0), Some(&second));
    }

    #[test]
    fn test_grid_validation() {
        assert_eq!(
            LatentGrid::zeros(1, 3, 4).unwrap_err(),
            CoreError::GridTooSmall { cols: 1, rows: 3 }
        );
        assert_eq!(
            LatentGrid::zeros(2, 2, 0).unwrap_err(),
            CoreError::ZeroDimension
        );

        let cells = vec![
            LatentVector::zeros(4),
            LatentVector::zeros(4),
            LatentVector::zeros(4),
            LatentVector::zeros(5),
        ];
        assert!(matches!(
            LatentGrid::from_cells(2, 2, cells),
            Err(CoreError::DimensionMismatch {
                expected: 4,
                actual: 5
            })
        ));

        assert!(matches!(
            LatentGrid::from_cells(2, 2, vec![LatentVector::zeros(4)]),
            Err(CoreError::CellCount { .. })
        ));
    }

    #[test]
    fn test_check_shape() {
        let a = LatentGrid::zeros(2, 3, 4).unwrap();
        let b = LatentGrid::zeros(3, 2, 4).unwrap();
        assert!(a.check_shape(&a.clone()).is_ok());
        assert!(a.check_shape(&b).is_err());
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = LatentVector::from_vec(vec![1.0, -2.0, 3.0]);
        let b = LatentVector::from_vec(vec![0.5, 0.5, 0.5]);

        let d = a.difference(&b).unwrap();
        assert_eq!(d.as_slice(), &[0.5, -2.5, 2.5]);
        assert_eq!(d.l1_norm(), 5.5);
        assert_eq!(a.scaled(2.0).as_slice(), &[2.0, -4.0, 6.0]);

        assert!(a.difference(&LatentVector::zeros(2)).is_err());
    }

    #[test]
    fn test_grid_iter_order() {
        let grid = LatentGrid::from_fn(3, 2, |x, y| LatentVector::from_vec(vec![x as f32, y as f32]))
            .unwrap();
        let coords: Vec<(usize, usize)> = grid.iter().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
        assert_eq!(grid.get(2, 1).unwrap().as_slice(), &[2.0, 1.0]);
        assert!(grid.get(3, 0).is_none());
    }
}

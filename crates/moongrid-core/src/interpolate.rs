//! Latent interpolation
//!
//! Two schemes feed the tile renderer:
//!
//! - **Bilinear**: one latent vector per output tile, blended from the four
//!   grid cells surrounding the tile's fractional grid position.
//! - **Circular**: a whole new grid per loop phase `l`, displacing every cell
//!   of grid A along two axes derived from grids B and C. The trajectory is
//!   periodic in `l` with period 1, so sweeping `l` over `[0, 1)` loops
//!   seamlessly.
//!
//! # Axis normalization
//!
//! Circular axes are divided by their **L1** norm, not the Euclidean norm.
//! The resulting axes are not unit length; the arc shape of every rendered
//! animation depends on this, so it is kept as is.

use std::f64::consts::PI;

use tracing::trace;

use crate::error::{CoreError, Result};
use crate::latent::{LatentGrid, LatentVector};
use crate::output::TileLayout;

/// Interpolation corner weights for fractional offsets `(lx, ly)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilinearWeights {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_left: f64,
    pub bottom_right: f64,
}

impl BilinearWeights {
    /// Weights for offsets `lx`, `ly` in `[0, 1]`
    pub fn new(lx: f64, ly: f64) -> Self {
        Self {
            top_left: (1.0 - lx) * (1.0 - ly),
            top_right: lx * (1.0 - ly),
            bottom_left: (1.0 - lx) * ly,
            bottom_right: lx * ly,
        }
    }

    /// Sum of all four weights
    pub fn sum(&self) -> f64 {
        self.top_left + self.top_right + self.bottom_left + self.bottom_right
    }
}

/// Fractional position inside a grid, split into the top-left interpolation
/// corner and the offsets from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    pub ix: usize,
    pub iy: usize,
    pub lx: f64,
    pub ly: f64,
}

impl GridPosition {
    /// Position for fractional grid coordinates `(gx, gy)`.
    ///
    /// Coordinates are clamped into the grid and the corner index into
    /// `[0, cols - 2] × [0, rows - 2]`, so a position exactly on the last
    /// column or row interpolates with an offset of 1 instead of reading past
    /// the grid.
    pub fn new(grid: &LatentGrid, gx: f64, gy: f64) -> Self {
        let (ix, lx) = split_axis(gx, grid.cols());
        let (iy, ly) = split_axis(gy, grid.rows());
        Self { ix, iy, lx, ly }
    }

    /// Position sampled by output tile `(tile_x, tile_y)`:
    /// `(x / cols · (grid_cols - 1), y / rows · (grid_rows - 1))`
    pub fn for_tile(grid: &LatentGrid, layout: TileLayout, tile_x: u32, tile_y: u32) -> Self {
        let gx = tile_x as f64 / layout.cols as f64 * (grid.cols() - 1) as f64;
        let gy = tile_y as f64 / layout.rows as f64 * (grid.rows() - 1) as f64;
        Self::new(grid, gx, gy)
    }

    /// Corner weights for this position
    pub fn weights(&self) -> BilinearWeights {
        BilinearWeights::new(self.lx, self.ly)
    }
}

fn split_axis(g: f64, len: usize) -> (usize, f64) {
    let last = (len - 1) as f64;
    let g = if g.is_nan() { 0.0 } else { g.clamp(0.0, last) };
    let i = (g.floor() as usize).min(len - 2);
    (i, g - i as f64)
}

/// Bilinear interpolation at `pos`, into a new vector
pub fn bilinear(grid: &LatentGrid, pos: GridPosition) -> LatentVector {
    let mut out = LatentVector::zeros(grid.dim());
    blend_corners(grid, pos, out.as_mut_slice());
    out
}

/// Bilinear interpolation at `pos`, overwriting `dest`.
///
/// `dest` is fully overwritten, so one buffer can be reused for every tile
/// of a render.
pub fn bilinear_into(grid: &LatentGrid, pos: GridPosition, dest: &mut LatentVector) -> Result<()> {
    if dest.dim() != grid.dim() {
        return Err(CoreError::DimensionMismatch {
            expected: grid.dim(),
            actual: dest.dim(),
        });
    }
    blend_corners(grid, pos, dest.as_mut_slice());
    Ok(())
}

fn blend_corners(grid: &LatentGrid, pos: GridPosition, dest: &mut [f32]) {
    let w = pos.weights();
    let tl = grid.cell(pos.ix, pos.iy).as_slice();
    let tr = grid.cell(pos.ix + 1, pos.iy).as_slice();
    let bl = grid.cell(pos.ix, pos.iy + 1).as_slice();
    let br = grid.cell(pos.ix + 1, pos.iy + 1).as_slice();

    for (i, out) in dest.iter_mut().enumerate() {
        let a = (tl[i] as f64 * w.top_left) as f32;
        let b = (tr[i] as f64 * w.top_right) as f32;
        let c = (bl[i] as f64 * w.bottom_left) as f32;
        let d = (br[i] as f64 * w.bottom_right) as f32;
        *out = a + b + c + d;
    }
}

/// Three-point circular interpolation over grids A, B and C
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularInterpolator {
    radius: f32,
}

impl CircularInterpolator {
    /// Interpolator with displacement radius `radius > 0`
    pub fn new(radius: f32) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CoreError::InvalidRadius(radius));
        }
        Ok(Self { radius })
    }

    /// Displacement radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Displacements `(dx, dy) = (sin 2πl · r, cos 2πl · r)`
    pub fn offsets(&self, l: f64) -> (f64, f64) {
        let angle = l * PI * 2.0;
        let r = self.radius as f64;
        (angle.sin() * r, angle.cos() * r)
    }

    /// Interpolate a single cell:
    /// `a + axis(a - b)·dx + axis(a - c)·dy`
    pub fn interpolate_cell(
        &self,
        a: &LatentVector,
        b: &LatentVector,
        c: &LatentVector,
        l: f64,
    ) -> Result<LatentVector> {
        let axis_x = l1_axis(a, b)?;
        let axis_y = l1_axis(a, c)?;
        let (dx, dy) = self.offsets(l);

        let axis_x = axis_x.as_slice();
        let axis_y = axis_y.as_slice();
        let values = a
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let x = (axis_x[i] as f64 * dx) as f32;
                let y = (axis_y[i] as f64 * dy) as f32;
                v + x + y
            })
            .collect();
        Ok(LatentVector::from_vec(values))
    }

    /// New grid with every cell interpolated at loop phase `l`
    pub fn interpolate(
        &self,
        a: &LatentGrid,
        b: &LatentGrid,
        c: &LatentGrid,
        l: f64,
    ) -> Result<LatentGrid> {
        a.check_shape(b)?;
        a.check_shape(c)?;

        let mut cells = Vec::with_capacity(a.cols() * a.rows());
        for (x, y, cell_a) in a.iter() {
            cells.push(self.interpolate_cell(cell_a, b.cell(x, y), c.cell(x, y), l)?);
        }
        LatentGrid::from_cells(a.cols(), a.rows(), cells)
    }
}

/// `(from - to) / ‖from - to‖₁`, or the zero vector when the difference has
/// no usable norm
pub fn l1_axis(from: &LatentVector, to: &LatentVector) -> Result<LatentVector> {
    let diff = from.difference(to)?;
    let norm = diff.l1_norm();
    if norm == 0.0 || !norm.is_finite() {
        trace!(norm, "degenerate interpolation axis, using zero vector");
        return Ok(LatentVector::zeros(diff.dim()));
    }
    Ok(LatentVector::from_vec(
        diff.iter().map(|v| (*v as f64 / norm) as f32).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::LatentRng;

    fn random_grids(seed: u64, n: usize, dim: usize) -> (LatentGrid, LatentGrid, LatentGrid) {
        let mut rng = LatentRng::seeded(seed);
        (
            LatentGrid::random(&mut rng, n, n, dim).unwrap(),
            LatentGrid::random(&mut rng, n, n, dim).unwrap(),
            LatentGrid::random(&mut rng, n, n, dim).unwrap(),
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let steps = 17;
        for i in 0..steps {
            for j in 0..steps {
                let lx = i as f64 / steps as f64;
                let ly = j as f64 / steps as f64;
                assert!((BilinearWeights::new(lx, ly).sum() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_corner_exactness() {
        let grid = LatentGrid::random(&mut LatentRng::seeded(3), 4, 3, 8).unwrap();
        for y in 0..grid.rows() {
            for x in 0..grid.cols() {
                let pos = GridPosition::new(&grid, x as f64, y as f64);
                assert_eq!(&bilinear(&grid, pos), grid.get(x, y).unwrap());
            }
        }
    }

    #[test]
    fn test_center_is_average() {
        let grid = LatentGrid::random(&mut LatentRng::seeded(42), 2, 2, 4).unwrap();
        let out = bilinear(&grid, GridPosition::new(&grid, 0.5, 0.5));

        for i in 0..4 {
            let sum: f32 = grid.iter().map(|(_, _, v)| v.as_slice()[i]).sum();
            assert!((out.as_slice()[i] - (sum / 4.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_position_clamps_last_index() {
        let grid = LatentGrid::zeros(3, 3, 2).unwrap();
        let pos = GridPosition::new(&grid, 2.0, 2.0);
        assert_eq!((pos.ix, pos.iy), (1, 1));
        assert_eq!((pos.lx, pos.ly), (1.0, 1.0));

        let pos = GridPosition::new(&grid, -0.5, 9.0);
        assert_eq!((pos.ix, pos.iy), (0, 1));
        assert_eq!((pos.lx, pos.ly), (0.0, 1.0));
    }

    #[test]
    fn test_tile_positions_stay_interior() {
        let grid = LatentGrid::zeros(7, 7, 1).unwrap();
        let layout = TileLayout::square(20);
        for (x, y) in layout.tiles() {
            let pos = GridPosition::for_tile(&grid, layout, x, y);
            assert!(pos.ix <= 5 && pos.iy <= 5);
            assert!((0.0..=1.0).contains(&pos.lx) && (0.0..=1.0).contains(&pos.ly));
        }

        let pos = GridPosition::for_tile(&grid, layout, 10, 5);
        assert_eq!(pos.ix, 3);
        assert!(pos.lx.abs() < 1e-6);
        assert_eq!(pos.iy, 1);
        assert!((pos.ly - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_into_reuses_buffer() {
        let grid = LatentGrid::random(&mut LatentRng::seeded(5), 3, 3, 6).unwrap();
        let pos = GridPosition::new(&grid, 1.25, 0.75);

        let mut buffer = LatentVector::from_vec(vec![f32::NAN; 6]);
        bilinear_into(&grid, pos, &mut buffer).unwrap();
        assert_eq!(buffer, bilinear(&grid, pos));

        let mut wrong = LatentVector::zeros(5);
        assert!(bilinear_into(&grid, pos, &mut wrong).is_err());
    }

    #[test]
    fn test_circular_is_periodic() {
        let (a, b, c) = random_grids(11, 3, 32);
        let interp = CircularInterpolator::new(200.0).unwrap();

        let start = interp.interpolate(&a, &b, &c, 0.0).unwrap();
        let end = interp.interpolate(&a, &b, &c, 1.0 - 1e-9).unwrap();
        let wrapped = interp.interpolate(&a, &b, &c, 1.0).unwrap();

        for ((_, _, s), ((_, _, e), (_, _, w))) in start.iter().zip(end.iter().zip(wrapped.iter())) {
            for ((s, e), w) in s.iter().zip(e.iter()).zip(w.iter()) {
                assert!((s - e).abs() < 1e-4);
                assert!((s - w).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_circular_identical_grids_return_a() {
        let (a, _, _) = random_grids(12, 3, 16);
        let interp = CircularInterpolator::new(200.0).unwrap();

        for l in [0.0, 0.13, 0.5, 0.99] {
            let out = interp.interpolate(&a, &a, &a, l).unwrap();
            assert_eq!(out, a);
        }
    }

    #[test]
    fn test_circular_degenerate_cell_is_finite() {
        let (a, base_b, c) = random_grids(13, 2, 8);
        let b = LatentGrid::from_fn(2, 2, |x, y| {
            if (x, y) == (1, 1) {
                a.get(x, y).unwrap().clone()
            } else {
                base_b.get(x, y).unwrap().clone()
            }
        })
        .unwrap();

        let interp = CircularInterpolator::new(50.0).unwrap();
        for l in [0.0, 0.25, 0.6] {
            let out = interp.interpolate(&a, &b, &c, l).unwrap();
            assert!(out.iter().all(|(_, _, v)| v.is_finite()));

            // The degenerate x axis contributes nothing, only the y axis moves the cell
            let (_, dy) = interp.offsets(l);
            let axis_y = l1_axis(a.get(1, 1).unwrap(), c.get(1, 1).unwrap()).unwrap();
            let moved = out.get(1, 1).unwrap().difference(a.get(1, 1).unwrap()).unwrap();
            for (m, ay) in moved.iter().zip(axis_y.iter()) {
                assert!((*m as f64 - *ay as f64 * dy).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_circular_cell_formula() {
        let a = LatentVector::from_vec(vec![1.0, 0.0]);
        let b = LatentVector::from_vec(vec![0.0, 0.0]);
        let c = LatentVector::from_vec(vec![1.0, 2.0]);
        let interp = CircularInterpolator::new(10.0).unwrap();

        // l = 0: dx = 0, dy = r. axis_y = (0, -2) / 2
        let out = interp.interpolate_cell(&a, &b, &c, 0.0).unwrap();
        assert!((out.as_slice()[0] - 1.0).abs() < 1e-6);
        assert!((out.as_slice()[1] + 10.0).abs() < 1e-6);

        // l = 0.25: dx = r, dy ~ 0. axis_x = (1, 0)
        let out = interp.interpolate_cell(&a, &b, &c, 0.25).unwrap();
        assert!((out.as_slice()[0] - 11.0).abs() < 1e-5);
        assert!(out.as_slice()[1].abs() < 1e-5);
    }

    #[test]
    fn test_axes_use_l1_norm() {
        // Documented behavior: the axis has unit L1 norm, so its Euclidean
        // length is below one for any difference spread over several components.
        let a = LatentVector::from_vec(vec![3.0, 4.0]);
        let b = LatentVector::zeros(2);
        let axis = l1_axis(&a, &b).unwrap();

        assert!((axis.as_slice()[0] - (3.0 / 7.0)).abs() < 1e-6);
        assert!((axis.as_slice()[1] - (4.0 / 7.0)).abs() < 1e-6);
        assert!((axis.l1_norm() - 1.0).abs() < 1e-6);
        let l2 = axis.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((l2 - (5.0 / 7.0)).abs() < 1e-6);
    }

    #[test]
    fn test_circular_validation() {
        assert!(CircularInterpolator::new(0.0).is_err());
        assert!(CircularInterpolator::new(-1.0).is_err());
        assert!(CircularInterpolator::new(f32::NAN).is_err());

        let a = LatentGrid::zeros(2, 2, 4).unwrap();
        let b = LatentGrid::zeros(3, 2, 4).unwrap();
        let interp = CircularInterpolator::new(1.0).unwrap();
        assert!(matches!(
            interp.interpolate(&a, &b, &a, 0.0),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }
}

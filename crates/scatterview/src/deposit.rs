use ndarray::ArrayView2;
use scatterview_nostd_internal::{AccumulationTarget, Element, ScatterBuffer, ScatterError};

use crate::context::ExecutionContext;
use crate::error::Error;

/// the index of the cell containing `pos` along a single axis.
///
/// Positions that can't be mapped to a cell (negative or non-finite) produce
/// `usize::MAX`, which is rejected as out of bounds by every grid.
#[inline]
fn cell_index(pos: f64, cell_width: f64) -> usize {
    let index = (pos / cell_width).floor();
    if index.is_finite() && index >= 0.0 && index < usize::MAX as f64 {
        index as usize
    } else {
        usize::MAX
    }
}

/// Deposit particle values onto a grid of uniform cells.
///
/// `positions` has a shape of `(n_particles, ndim)` and `values` holds one
/// value per particle. Along axis `k`, particle `i` lands in the cell with
/// index `floor(positions[[i, k]] / cell_width)`. Everything happens in a
/// single episode driven by `ctx`, so `buffer` should have been created for
/// `ctx` (e.g. with [`ExecutionContext::create_scatter_buffer`]).
///
/// If any particle lies outside of the grid, an
/// [`ScatterError::OutOfBoundsIndex`] is returned and `target` isn't
/// modified.
pub fn deposit<T: Element>(
    ctx: &ExecutionContext,
    buffer: &mut ScatterBuffer<T>,
    target: &mut AccumulationTarget<T>,
    positions: ArrayView2<f64>,
    values: &[T],
    cell_width: f64,
) -> Result<(), Error> {
    let ndim = target.shape().len();
    let (n_particles, pos_ndim) = positions.dim();
    if n_particles != values.len() {
        return Err(ScatterError::ShapeMismatch {
            expected: vec![values.len()],
            actual: vec![n_particles],
        }
        .into());
    }
    if pos_ndim != ndim {
        return Err(ScatterError::ShapeMismatch {
            expected: vec![ndim],
            actual: vec![pos_ndim],
        }
        .into());
    }
    if !(cell_width.is_finite() && cell_width > 0.0) {
        return Err(Error::float_range("cell_width", cell_width));
    }

    // the cell coordinates of particle i are cells[i*ndim..(i+1)*ndim]
    let mut cells = Vec::with_capacity(n_particles * ndim);
    for row in positions.rows() {
        cells.extend(row.iter().map(|&pos| cell_index(pos, cell_width)));
    }

    ctx.run_episode(buffer, target, n_particles, |i, handle| {
        handle.accumulate(&cells[i * ndim..(i + 1) * ndim], values[i])
    })
}

//! Axis reordering from the simulation's storage order to the in-memory layout
//!
//! The simulation writes each snapshot with `x` varying fastest, then `y`, then `z`. Read as a
//! C-ordered array that block has the shape `(nz, ny, nx, variables)`. The in-memory layout
//! used everywhere else is `(nx, ny, nz, variables)` in standard order, so every block has its
//! first three axes reversed and is copied into fresh contiguous storage.

use crate::prelude::*;

/// Reorder one stored snapshot into `destination`, which must have the shape
/// `(nx, ny, nz, variables)`.
pub(crate) fn reorder_block_into(
    block: &[f64],
    dims: GridDims,
    variables: usize,
    mut destination: ArrayViewMut4<f64>,
) -> Result<(), Error> {
    let stored = ArrayView4::from_shape((dims.nz, dims.ny, dims.nx, variables), block)?;
    destination.assign(&stored.permuted_axes([2, 1, 0, 3]));
    Ok(())
}

/// Reorder every snapshot of a raw buffer holding `timesteps` stored blocks back to back
/// in a single pass.
pub(crate) fn reorder_all(
    raw: Vec<f64>,
    timesteps: usize,
    dims: GridDims,
    variables: usize,
) -> Result<Array5<f64>, Error> {
    let stored =
        Array5::from_shape_vec((timesteps, dims.nz, dims.ny, dims.nx, variables), raw)?;
    Ok(stored
        .permuted_axes([0, 3, 2, 1, 4])
        .as_standard_layout()
        .into_owned())
}

/// Flatten a `(nx, ny, nz, variables)` snapshot back into storage order (`x` fastest)
pub(crate) fn storage_order(snapshot: ArrayView4<f64>) -> impl Iterator<Item = f64> + '_ {
    let (nx, ny, nz, variables) = snapshot.dim();

    (0..nz).flat_map(move |k| {
        (0..ny).flat_map(move |j| {
            (0..nx).flat_map(move |i| (0..variables).map(move |n| snapshot[[i, j, k, n]]))
        })
    })
}

//! Recovering the extent of a structured grid from a flat list of points
//!
//! Both text and binary inputs describe a snapshot as a list of points where each point carries
//! its own `x`, `y`, `z` coordinate values. For a complete structured grid the number of distinct
//! values along each coordinate column is the number of grid points along that axis.

use crate::data::GridDims;

use ndarray::{ArrayBase, Data, Dimension, Ix2};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// Reasons that [`infer_grid_shape`] could not produce grid dimensions
pub enum InferenceError {
    #[error("three coordinate column indices are required, got {0}")]
    TooFewCoordinates(usize),
    #[error("coordinate column {index} is out of bounds for {variables} variables")]
    IndexOutOfBounds { index: usize, variables: usize },
    #[error("point array is empty")]
    Empty,
    #[error("point array must be 2 dimensional (points, variables), got {0} dimensions")]
    WrongRank(usize),
}

/// Count the distinct values in the coordinate columns of a single snapshot.
///
/// `points` is a `(points, variables)` array and `coordinates` holds the column index of the
/// `x`, `y` and `z` values (in that order). Only the first three indices are used.
///
/// `-0.0` and `0.0` are counted as the same coordinate.
///
/// ## Example
///
/// ```
/// let points = ndarray::arr2(&[
///     [0.0, 0.0, 0.0, 1.5],
///     [1.0, 0.0, 0.0, 2.5],
///     [0.0, 1.0, 0.0, 3.5],
///     [1.0, 1.0, 0.0, 4.5],
/// ]);
/// let dims = gridseries::infer_grid_shape(&points, &[0, 1, 2]).unwrap();
/// assert_eq!(dims, gridseries::GridDims::new(2, 2, 1));
/// ```
pub fn infer_grid_shape<S, D>(
    points: &ArrayBase<S, D>,
    coordinates: &[usize],
) -> Result<GridDims, InferenceError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if coordinates.len() < 3 {
        return Err(InferenceError::TooFewCoordinates(coordinates.len()));
    }

    let points = points
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| InferenceError::WrongRank(points.ndim()))?;

    let (num_points, variables) = points.dim();

    for &index in &coordinates[..3] {
        if index >= variables {
            return Err(InferenceError::IndexOutOfBounds { index, variables });
        }
    }

    if num_points == 0 {
        return Err(InferenceError::Empty);
    }

    let distinct = |column: usize| {
        points
            .column(column)
            .iter()
            .map(|value| canonical_bits(*value))
            .collect::<HashSet<u64>>()
            .len()
    };

    Ok(GridDims::new(
        distinct(coordinates[0]),
        distinct(coordinates[1]),
        distinct(coordinates[2]),
    ))
}

fn canonical_bits(value: f64) -> u64 {
    // collapse -0.0 onto 0.0
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

//! Merging a base dataset with derivative datasets on the same grid
//!
//! Every dataset begins with the `x`, `y`, `z` coordinate variables. The merged dataset keeps
//! all variables of the base and appends the non-coordinate variables of each delta in the
//! order the deltas are given.
//!
//! Merging works in two passes so that at most one source dataset is held in memory next to
//! the merged output. The first pass loads every source once to validate shapes and record
//! labels, the second reloads them one at a time to copy their variables into the
//! pre-allocated output.

use crate::data::COORDINATE_VARIABLES;
use crate::prelude::*;
use crate::shape;
use crate::store;

use ndarray::{ArrayView, Dimension};
use num_traits::Float;
use std::path::{Path, PathBuf};

/// Anything the merge engine can (re)load a dataset from
pub trait DatasetSource {
    /// name used in errors and progress reports
    fn name(&self) -> &str;

    /// Load the full dataset. Called twice per merge.
    fn load(&self) -> Result<GridDataset, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
/// A dataset persisted with [`store::save`]
pub struct StoredDataset {
    pub name: String,
    pub path: PathBuf,
}

impl StoredDataset {
    /// source named after the file stem of `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self { name, path }
    }
}

impl DatasetSource for StoredDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<GridDataset, Error> {
        store::load(&self.path)
    }
}

#[derive(Debug, Clone, Constructor)]
/// A dataset already in memory. Every load hands out a copy.
pub struct InMemory<'a> {
    name: String,
    dataset: &'a GridDataset,
}

impl<'a> DatasetSource for InMemory<'a> {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<GridDataset, Error> {
        Ok(self.dataset.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Tolerances for the coordinate comparison and optional extra checks
pub struct MergeOptions {
    /// relative tolerance of the coordinate comparison
    pub rtol: f64,
    /// absolute tolerance of the coordinate comparison
    pub atol: f64,
    /// infer the grid from the base coordinates and require it to match the base shape
    pub verify_base_grid: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
            verify_base_grid: false,
        }
    }
}

impl MergeOptions {
    pub fn with_tolerance(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_base_grid_check(mut self, verify: bool) -> Self {
        self.verify_base_grid = verify;
        self
    }
}

/// `true` if every pair satisfies `|a - b| <= atol + rtol * |b|`. NaN is never close to
/// anything, infinities are close only to themselves.
pub(crate) fn allclose<A, D>(a: ArrayView<A, D>, b: ArrayView<A, D>, rtol: A, atol: A) -> bool
where
    A: Float,
    D: Dimension,
{
    a.shape() == b.shape()
        && a
            .iter()
            .zip(b.iter())
            .all(|(&x, &y)| {
                x == y
                    || (x.is_finite() && y.is_finite() && (x - y).abs() <= atol + rtol * y.abs())
            })
}

/// shape and labels of one source, recorded during the first pass
struct Scanned {
    shape: [usize; 5],
    labels: Vec<String>,
}

fn require_coordinates(name: &str, dataset: &GridDataset) -> Result<(), Error> {
    let variables = dataset.variables();

    if variables < COORDINATE_VARIABLES {
        return Err(Error::MissingCoordinates {
            name: name.to_string(),
            variables,
        });
    }

    Ok(())
}

/// the shape of a reloaded source must not differ from the first pass
fn require_shape(name: &str, expected: [usize; 5], dataset: &GridDataset) -> Result<(), Error> {
    let actual = dataset.shape();

    if actual != expected {
        return Err(Error::DimensionMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }

    Ok(())
}

fn verify_grid(name: &str, coordinates: &Array4<f64>) -> Result<(), Error> {
    let (nx, ny, nz, variables) = coordinates.dim();
    let standard = coordinates.as_standard_layout();
    let points = standard.view().into_shape((nx * ny * nz, variables))?;
    let inferred = shape::infer_grid_shape(&points, &[0, 1, 2])?;

    if inferred != GridDims::new(nx, ny, nz) {
        return Err(Error::IncompleteGrid {
            nx: inferred.nx,
            ny: inferred.ny,
            nz: inferred.nz,
            points: nx * ny * nz,
            location: format!("in the coordinates of `{name}`"),
        });
    }

    Ok(())
}

/// Merge `base` with every dataset in `deltas`.
///
/// The result holds all base variables followed by variables `3..` of each delta. Each delta
/// must have the same number of timesteps and grid dimensions as the base, and its coordinates
/// at the first timestep must match the base's within the tolerances in `options`.
pub fn merge_datasets(
    base: &dyn DatasetSource,
    deltas: &[&dyn DatasetSource],
    options: MergeOptions,
    progress: &mut dyn Progress,
) -> Result<GridDataset, Error> {
    let sources = deltas.len() + 1;

    // first pass: shapes, labels, and the reference coordinates
    progress.stage("scanning datasets", sources);

    let (base_scan, base_coordinates) = {
        let data = base.load()?;
        require_coordinates(base.name(), &data)?;

        if data.timesteps() == 0 {
            return Err(Error::empty(format!(
                "base dataset `{}` has no timesteps",
                base.name()
            )));
        }

        let coordinates = data
            .timeseries
            .slice(s![0, .., .., .., ..COORDINATE_VARIABLES])
            .to_owned();

        if options.verify_base_grid {
            verify_grid(base.name(), &coordinates)?;
        }

        let scanned = Scanned {
            shape: data.shape(),
            labels: data.labels,
        };
        (scanned, coordinates)
    };
    progress.step(1);

    let mut delta_scans = Vec::with_capacity(deltas.len());
    for (index, delta) in deltas.iter().enumerate() {
        let data = delta.load()?;
        require_coordinates(delta.name(), &data)?;

        let shape = data.shape();
        if shape[..4] != base_scan.shape[..4] {
            return Err(Error::DimensionMismatch {
                name: delta.name().to_string(),
                expected: base_scan.shape,
                actual: shape,
            });
        }

        delta_scans.push(Scanned {
            shape,
            labels: data.labels,
        });
        progress.step(index + 2);
    }

    let [timesteps, nx, ny, nz, base_variables] = base_scan.shape;
    let variables = base_variables
        + delta_scans
            .iter()
            .map(|scan| scan.shape[4] - COORDINATE_VARIABLES)
            .sum::<usize>();

    tracing::debug!(
        timesteps,
        nx,
        ny,
        nz,
        variables,
        "allocating merged timeseries"
    );
    let mut merged = Array5::<f64>::zeros((timesteps, nx, ny, nz, variables));

    // second pass: copy variables into place
    progress.stage("merging datasets", sources);

    {
        let data = base.load()?;
        require_shape(base.name(), base_scan.shape, &data)?;
        merged
            .slice_mut(s![.., .., .., .., ..base_variables])
            .assign(&data.timeseries);
    }
    progress.step(1);

    let mut offset = base_variables;
    for (index, (delta, scan)) in deltas.iter().zip(&delta_scans).enumerate() {
        let data = delta.load()?;
        require_shape(delta.name(), scan.shape, &data)?;

        let coordinates = data
            .timeseries
            .slice(s![0, .., .., .., ..COORDINATE_VARIABLES]);
        if !allclose(coordinates, base_coordinates.view(), options.rtol, options.atol) {
            return Err(Error::CoordinateMismatch {
                name: delta.name().to_string(),
            });
        }

        let count = scan.shape[4] - COORDINATE_VARIABLES;
        merged
            .slice_mut(s![.., .., .., .., offset..offset + count])
            .assign(&data.timeseries.slice(s![.., .., .., .., COORDINATE_VARIABLES..]));

        tracing::debug!(name = delta.name(), offset, count, "copied delta variables");
        offset += count;
        progress.step(index + 2);
    }

    let labels = base_scan
        .labels
        .into_iter()
        .chain(
            delta_scans
                .into_iter()
                .flat_map(|scan| scan.labels.into_iter().skip(COORDINATE_VARIABLES)),
        )
        .collect();

    GridDataset::new(merged, labels)
}

use crate::prelude::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Labels of the three coordinate variables that lead every dataset
pub const COORDINATE_LABELS: [&str; 3] = ["x", "y", "z"];

/// number of leading variables in a dataset that hold coordinate values
pub const COORDINATE_VARIABLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Constructor, Display)]
#[display(fmt = "nx={nx}, ny={ny}, nz={nz}")]
/// Number of grid points along each axis of a structured grid
pub struct GridDims {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridDims {
    /// total number of points in a single snapshot of the grid
    pub fn points(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Container for a decoded structured-grid timeseries.
///
/// `timeseries` is indexed as `[t, x, y, z, variable]` in standard (row-major) layout and
/// `labels` names every entry of the variable axis. By convention the first three variables
/// are the `x`, `y`, `z` coordinate values of each point.
///
/// ## Example
///
/// A file with 10 snapshots on a `64 x 32 x 16` grid carrying the coordinates and three
/// velocity components has a `timeseries` shape of `(10, 64, 32, 16, 6)` and six labels.
pub struct GridDataset {
    pub timeseries: Array5<f64>,
    pub labels: Vec<String>,
}

impl GridDataset {
    /// Construct a dataset, checking that there is one label per variable
    pub fn new(timeseries: Array5<f64>, labels: Vec<String>) -> Result<Self, Error> {
        let variables = timeseries.dim().4;

        if labels.len() != variables {
            return Err(Error::LabelCount {
                labels: labels.len(),
                variables,
            });
        }

        Ok(Self { timeseries, labels })
    }

    /// dataset with shape `(0, 0, 0, 0, 0)` and no labels. Returned by the decoders when a
    /// file has nothing parseable in it
    pub fn empty() -> Self {
        Self {
            timeseries: Array5::zeros((0, 0, 0, 0, 0)),
            labels: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timeseries.is_empty() && self.labels.is_empty()
    }

    /// full shape of the timeseries array
    pub fn shape(&self) -> [usize; 5] {
        let (t, nx, ny, nz, v) = self.timeseries.dim();
        [t, nx, ny, nz, v]
    }

    pub fn timesteps(&self) -> usize {
        self.timeseries.dim().0
    }

    pub fn dims(&self) -> GridDims {
        let (_, nx, ny, nz, _) = self.timeseries.dim();
        GridDims::new(nx, ny, nz)
    }

    pub fn variables(&self) -> usize {
        self.timeseries.dim().4
    }

    /// Keep only the first `snapshots` timesteps. Useful for building small
    /// development datasets from a production sized one.
    ///
    /// Requests for more snapshots than are available keep all of them.
    pub fn first_snapshots(&self, snapshots: usize) -> GridDataset {
        let available = self.timesteps();

        let keep = if snapshots > available {
            tracing::warn!(
                requested = snapshots,
                available,
                "requested more snapshots than are available, keeping all of them"
            );
            available
        } else {
            snapshots
        };

        GridDataset {
            timeseries: self.timeseries.slice(s![..keep, .., .., .., ..]).to_owned(),
            labels: self.labels.clone(),
        }
    }

    /// human readable overview of the dataset
    pub fn summary(&self) -> Summary {
        let ranges = self
            .timeseries
            .axis_iter(Axis(4))
            .map(|variable| {
                variable.iter().fold(None, |acc: Option<(f64, f64)>, &value| match acc {
                    Some((min, max)) => Some((min.min(value), max.max(value))),
                    None => Some((value, value)),
                })
            })
            .collect();

        Summary {
            shape: self.shape(),
            elements: self.timeseries.len(),
            bytes: self.timeseries.len() * std::mem::size_of::<f64>(),
            labels: self.labels.clone(),
            ranges,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Shape, memory footprint, and per-variable value ranges of a [`GridDataset`]
pub struct Summary {
    pub shape: [usize; 5],
    pub elements: usize,
    pub bytes: usize,
    pub labels: Vec<String>,
    pub ranges: Vec<Option<(f64, f64)>>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [t, nx, ny, nz, v] = self.shape;
        writeln!(f, "timeseries shape: ({t}, {nx}, {ny}, {nz}, {v})")?;
        writeln!(f, "  timesteps: {t}")?;
        writeln!(f, "  grid: nx={nx}, ny={ny}, nz={nz}")?;
        writeln!(f, "  variables: {v}")?;
        writeln!(f, "  dtype: float64")?;
        writeln!(f, "  elements: {}", self.elements)?;
        writeln!(f, "  memory: {:.2} MiB", self.bytes as f64 / (1024.0 * 1024.0))?;
        writeln!(f, "labels ({}):", self.labels.len())?;

        for (idx, label) in self.labels.iter().enumerate() {
            match self.ranges.get(idx).copied().flatten() {
                Some((min, max)) => writeln!(f, "  [{idx:>3}] {label:<16} min={min:<14e} max={max:e}")?,
                None => writeln!(f, "  [{idx:>3}] {label}")?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::coordinate_grid;

    #[test]
    fn label_count_checked() {
        let arr = Array5::zeros((1, 2, 2, 2, 4));
        let labels = vec!["x".into(), "y".into(), "z".into()];

        let out = GridDataset::new(arr, labels);

        assert!(matches!(
            out,
            Err(Error::LabelCount {
                labels: 3,
                variables: 4
            })
        ));
    }

    #[test]
    fn empty_dataset_shape() {
        let data = GridDataset::empty();
        assert_eq!(data.shape(), [0, 0, 0, 0, 0]);
        assert!(data.labels.is_empty());
        assert!(data.is_empty());
    }

    #[test]
    fn first_snapshots_slices_time() {
        let data = coordinate_grid(5, GridDims::new(2, 3, 1), &["x", "y", "z", "u"]);

        let dev = data.first_snapshots(2);

        assert_eq!(dev.shape(), [2, 2, 3, 1, 4]);
        assert_eq!(dev.labels, data.labels);
        assert_eq!(
            dev.timeseries,
            data.timeseries.slice(s![..2, .., .., .., ..])
        );
    }

    #[test]
    fn first_snapshots_clamps() {
        let data = coordinate_grid(3, GridDims::new(2, 2, 2), &["x", "y", "z"]);
        let dev = data.first_snapshots(10);
        assert_eq!(dev, data);
    }

    #[test]
    fn summary_ranges() {
        let data = coordinate_grid(1, GridDims::new(4, 2, 3), &["x", "y", "z"]);
        let summary = data.summary();

        assert_eq!(summary.shape, [1, 4, 2, 3, 3]);
        assert_eq!(summary.elements, 4 * 2 * 3 * 3);
        assert_eq!(summary.ranges[0], Some((0.0, 3.0)));
        assert_eq!(summary.ranges[1], Some((0.0, 1.0)));
        assert_eq!(summary.ranges[2], Some((0.0, 2.0)));

        let text = summary.to_string();
        assert!(text.contains("timeseries shape: (1, 4, 2, 3, 3)"));
        assert!(text.contains("labels (3):"));
    }
}

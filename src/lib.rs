#![doc = include_str!("../README.md")]

pub mod binary;
mod data;
pub mod lines;
pub mod merge;
pub mod prelude;
pub mod progress;
mod reorder;
pub mod shape;
pub mod store;
pub mod tecplot;
mod utils;
pub mod write;

pub use data::{GridDataset, GridDims, Summary};

pub use binary::{read_binary, BinaryOptions, DecodeStrategy};
pub use merge::{merge_datasets, DatasetSource, InMemory, MergeOptions, StoredDataset};
pub use progress::{Logged, Progress, Silent};
pub use shape::{infer_grid_shape, InferenceError};
pub use store::Encoding;
pub use tecplot::read_tecplot;
pub use write::{write_binary, write_tecplot};

pub use ndarray;

use std::path::PathBuf;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("file not found at `{}`", path.display())]
    NotFound { path: PathBuf },
    #[error("input is empty or contains no valid data blocks: {reason}")]
    EmptyInput { reason: String },
    #[error("corrupt input: {reason}")]
    CorruptFormat { reason: String },
    #[error("malformed data row at line {line} ({reason}): `{content}`")]
    MalformedRow {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("incomplete structured grid: {nx}x{ny}x{nz} points expected, found {points} {location}")]
    IncompleteGrid {
        nx: usize,
        ny: usize,
        nz: usize,
        points: usize,
        location: String,
    },
    #[error("dimension mismatch in `{name}`: expected a grid consistent with {expected:?}, got {actual:?}")]
    DimensionMismatch {
        name: String,
        expected: [usize; 5],
        actual: [usize; 5],
    },
    #[error("`{name}` has {variables} variables, at least the 3 coordinate variables are required")]
    MissingCoordinates { name: String, variables: usize },
    #[error("coordinate values at t=0 do not match between the base dataset and `{name}`")]
    CoordinateMismatch { name: String },
    #[error("could not infer the grid shape: {0}")]
    Inference(#[from] InferenceError),
    #[error("{labels} labels were supplied for an array with {variables} variables")]
    LabelCount { labels: usize, variables: usize },
    #[error("label `{label}` cannot be stored in an npz archive: {reason}")]
    InvalidLabel { label: String, reason: String },
    #[error("the binary format holds exactly {expected} variables, the dataset has {found}")]
    VariableCount { expected: usize, found: usize },
    #[error("could not reshape array data: `{0}`")]
    Shape(#[from] ndarray::ShapeError),
    #[error("could not (de)serialize dataset object: `{0}`")]
    Bincode(#[from] bincode::Error),
    #[error("could not read npz archive: `{0}`")]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),
    #[error("could not write npz archive: `{0}`")]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),
}

impl Error {
    pub(crate) fn corrupt<T: Into<String>>(reason: T) -> Self {
        Error::CorruptFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn empty<T: Into<String>>(reason: T) -> Self {
        Error::EmptyInput {
            reason: reason.into(),
        }
    }
}

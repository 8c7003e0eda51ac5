//! Common traits and types that are useful for working with `gridseries`
#![allow(unused_imports)]

pub use crate::data::{GridDataset, GridDims};
pub use crate::merge::DatasetSource;
pub use crate::progress::{Logged, Progress, Silent};
pub use crate::Error;

pub(crate) use derive_more::{Constructor, Display};

pub(crate) use ndarray::{s, Array4, Array5, ArrayView4, ArrayViewMut4, Axis};

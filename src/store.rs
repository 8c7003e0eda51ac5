//! Saving and loading decoded datasets
//!
//! Two encodings are supported. [`Encoding::Object`] is the `bincode` form of the serde
//! representation of [`GridDataset`] and is the fastest to reload. [`Encoding::Npz`] writes a
//! NumPy archive holding a `timeseries` array and a `labels` array of newline separated UTF-8
//! bytes, so that merged datasets can be opened with `numpy.load`. Labels containing a newline
//! cannot be written to an archive.

use crate::prelude::*;

use ndarray::Array1;
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

const TIMESERIES_ENTRY: &str = "timeseries";
const LABELS_ENTRY: &str = "labels";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Physical encoding of a stored dataset
pub enum Encoding {
    /// `bincode` serialization of the dataset
    Object,
    /// NumPy `.npz` archive
    Npz { compressed: bool },
}

impl Encoding {
    /// `.npz` paths use a compressed archive, everything else the object encoding
    pub fn for_path(path: &Path) -> Self {
        let is_npz = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("npz"))
            .unwrap_or(false);

        if is_npz {
            Encoding::Npz { compressed: true }
        } else {
            Encoding::Object
        }
    }
}

/// Write `dataset` to `path`, creating any missing parent directories
pub fn save(dataset: &GridDataset, path: &Path, encoding: Encoding) -> Result<(), Error> {
    if let Encoding::Npz { .. } = encoding {
        check_npz_labels(&dataset.labels)?;
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;

    match encoding {
        Encoding::Object => {
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, dataset)?;
            writer.flush()?;
        }
        Encoding::Npz { compressed } => {
            let npz = if compressed {
                NpzWriter::new_compressed(file)
            } else {
                NpzWriter::new(file)
            };
            write_npz(npz, dataset)?;
        }
    }

    tracing::info!(
        path = %path.display(),
        ?encoding,
        shape = ?dataset.shape(),
        "saved dataset"
    );

    Ok(())
}

/// Read a dataset from `path`, choosing the encoding from its extension
pub fn load(path: &Path) -> Result<GridDataset, Error> {
    load_with(path, Encoding::for_path(path))
}

/// Read a dataset from `path` stored with `encoding`
pub fn load_with(path: &Path, encoding: Encoding) -> Result<GridDataset, Error> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)?;

    let dataset = match encoding {
        Encoding::Object => {
            let decoded: GridDataset = bincode::deserialize_from(BufReader::new(file))?;
            GridDataset::new(decoded.timeseries, decoded.labels)?
        }
        Encoding::Npz { .. } => read_npz(NpzReader::new(file)?)?,
    };

    tracing::debug!(path = %path.display(), shape = ?dataset.shape(), "loaded dataset");

    Ok(dataset)
}

/// labels are stored newline separated, so they must survive a split on `\n`
fn check_npz_labels(labels: &[String]) -> Result<(), Error> {
    if let Some(label) = labels.iter().find(|label| label.contains('\n')) {
        return Err(Error::InvalidLabel {
            label: label.clone(),
            reason: "labels must not contain a newline".into(),
        });
    }

    // a lone empty label joins to the same bytes as no labels at all
    if let [label] = labels {
        if label.is_empty() {
            return Err(Error::InvalidLabel {
                label: label.clone(),
                reason: "a single label must not be empty".into(),
            });
        }
    }

    Ok(())
}

fn write_npz<W: Write + Seek>(mut npz: NpzWriter<W>, dataset: &GridDataset) -> Result<(), Error> {
    let labels: Array1<u8> = dataset.labels.join("\n").into_bytes().into();

    npz.add_array(TIMESERIES_ENTRY, &dataset.timeseries)?;
    npz.add_array(LABELS_ENTRY, &labels)?;
    npz.finish()?;

    Ok(())
}

fn read_npz<R: Read + Seek>(mut npz: NpzReader<R>) -> Result<GridDataset, Error> {
    let names = npz.names()?;

    let timeseries_name = entry_name(&names, TIMESERIES_ENTRY)?;
    let labels_name = entry_name(&names, LABELS_ENTRY)?;

    let timeseries: Array5<f64> = npz.by_name(&timeseries_name)?;
    let label_bytes: Array1<u8> = npz.by_name(&labels_name)?;

    let text = String::from_utf8(label_bytes.to_vec())
        .map_err(|_| Error::corrupt("npz labels are not valid UTF-8"))?;

    let labels = if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').map(str::to_string).collect()
    };

    GridDataset::new(timeseries, labels)
}

/// archive member for `entry`, with or without the `.npy` suffix
fn entry_name(names: &[String], entry: &str) -> Result<String, Error> {
    names
        .iter()
        .find(|name| name.trim_end_matches(".npy") == entry)
        .cloned()
        .ok_or_else(|| Error::corrupt(format!("npz archive has no `{entry}` array")))
}

//! Decoding the packed binary snapshot format
//!
//! A binary file is a sequence of timestep blocks with no file level header. Each block is:
//!
//! ```text
//! i32 nx | i32 ny | i32 nz | nx*ny*nz records of 6 f64 values
//! ```
//!
//! all in native byte order. Records are written with `x` varying fastest, then `y`, then `z`
//! and hold the values `x, y, z, var1, var2, var3` for that point. The number of timesteps is
//! never stored; it is the file length divided by the length of one block.

use crate::data::COORDINATE_LABELS;
use crate::prelude::*;
use crate::reorder;
use crate::utils;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Labels of the six values stored for every point of a binary file
pub const BINARY_LABELS: [&str; 6] = ["x", "y", "z", "var1", "var2", "var3"];

const VARIABLES: usize = BINARY_LABELS.len();
const HEADER_BYTES: u64 = 3 * std::mem::size_of::<i32>() as u64;
const VALUE_BYTES: u64 = std::mem::size_of::<f64>() as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How the blocks of a binary file are turned into the output array. Both produce
/// bit-identical results.
pub enum DecodeStrategy {
    /// Read and reorder one timestep block at a time. Peak memory is the output array plus
    /// one block.
    #[default]
    MemoryOptimized,
    /// Read every block into one raw buffer and reorder all timesteps in a single pass.
    /// Peak memory is about twice the output array.
    SpeedOptimized,
}

#[derive(Debug, Clone, Default)]
/// Options for [`read_binary`] and [`decode_binary`]
pub struct BinaryOptions {
    pub strategy: DecodeStrategy,
}

impl BinaryOptions {
    pub fn with_strategy(strategy: DecodeStrategy) -> Self {
        Self { strategy }
    }
}

/// Sizes derived from the first block header
#[derive(Debug, Clone, Copy)]
struct BlockLayout {
    header: [i32; 3],
    dims: GridDims,
    data_bytes: usize,
    timesteps: usize,
}

impl BlockLayout {
    fn new(header: [i32; 3], length: u64) -> Result<Self, Error> {
        let [nx, ny, nz] = header;

        if nx <= 0 || ny <= 0 || nz <= 0 {
            return Err(Error::corrupt(format!(
                "grid dimensions must be positive, header contains nx={nx}, ny={ny}, nz={nz}"
            )));
        }

        let overflow = || {
            Error::corrupt(format!(
                "block size for nx={nx}, ny={ny}, nz={nz} does not fit in 64 bits"
            ))
        };

        // every extent is positive so the casts are lossless
        let data_bytes = (nx as u64)
            .checked_mul(ny as u64)
            .and_then(|x| x.checked_mul(nz as u64))
            .and_then(|x| x.checked_mul(VARIABLES as u64))
            .and_then(|x| x.checked_mul(VALUE_BYTES))
            .ok_or_else(overflow)?;
        let block_bytes = data_bytes.checked_add(HEADER_BYTES).ok_or_else(overflow)?;

        if length % block_bytes != 0 {
            return Err(Error::corrupt(format!(
                "file size {length} is not a multiple of the block size {block_bytes}. \
                The file might be corrupt or have inconsistent block sizes"
            )));
        }

        let too_large = || Error::corrupt("decoded array would not fit in addressable memory");

        let timesteps = usize::try_from(length / block_bytes).map_err(|_| too_large())?;
        let data_bytes = usize::try_from(data_bytes).map_err(|_| too_large())?;
        let dims = GridDims::new(nx as usize, ny as usize, nz as usize);

        dims.points()
            .checked_mul(VARIABLES)
            .and_then(|x| x.checked_mul(timesteps))
            .ok_or_else(too_large)?;

        Ok(Self {
            header,
            dims,
            data_bytes,
            timesteps,
        })
    }

    fn values_per_block(&self) -> usize {
        self.dims.points() * VARIABLES
    }
}

/// Read and decode a binary snapshot file from a path.
///
/// ## Example
///
/// ```no_run
/// use gridseries::{read_binary, BinaryOptions, DecodeStrategy, Silent};
///
/// let options = BinaryOptions::with_strategy(DecodeStrategy::SpeedOptimized);
/// let data = read_binary("./data/du.dat".as_ref(), &options, &mut Silent).unwrap();
/// assert_eq!(data.labels.len(), 6);
/// ```
pub fn read_binary(
    path: &Path,
    options: &BinaryOptions,
    progress: &mut dyn Progress,
) -> Result<GridDataset, Error> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)?;
    let length = file.metadata()?.len();

    tracing::debug!(path = %path.display(), length, "decoding binary grid file");

    decode_binary(BufReader::new(file), length, options, progress)
}

/// Decode a binary snapshot stream of `length` bytes.
///
/// A block whose header disagrees with the first block's is reported through
/// [`Progress::warn`] and decoded with the first block's dimensions.
pub fn decode_binary<R: Read>(
    mut reader: R,
    length: u64,
    options: &BinaryOptions,
    progress: &mut dyn Progress,
) -> Result<GridDataset, Error> {
    let header = match read_header(&mut reader)? {
        Some(header) => header,
        None => return Err(Error::empty("no block header could be read")),
    };

    let layout = BlockLayout::new(header, length)?;

    tracing::debug!(
        dims = %layout.dims,
        timesteps = layout.timesteps,
        "detected binary block layout"
    );

    let timeseries = match options.strategy {
        DecodeStrategy::MemoryOptimized => decode_per_block(&mut reader, &layout, progress)?,
        DecodeStrategy::SpeedOptimized => decode_all_blocks(&mut reader, &layout, progress)?,
    };

    let labels = BINARY_LABELS.iter().map(|l| l.to_string()).collect();
    GridDataset::new(timeseries, labels)
}

fn decode_per_block<R: Read>(
    reader: &mut R,
    layout: &BlockLayout,
    progress: &mut dyn Progress,
) -> Result<Array5<f64>, Error> {
    let GridDims { nx, ny, nz } = layout.dims;
    let mut timeseries = Array5::zeros((layout.timesteps, nx, ny, nz, VARIABLES));

    let mut bytes = vec![0u8; layout.data_bytes];
    let mut block = vec![0f64; layout.values_per_block()];

    progress.stage("reordering timesteps block by block", layout.timesteps);

    for t in 0..layout.timesteps {
        if t > 0 {
            check_block_header(reader, t, layout, progress)?;
        }

        reader.read_exact(&mut bytes)?;
        utils::decode_floats(&bytes, &mut block);

        let destination = timeseries.slice_mut(s![t, .., .., .., ..]);
        reorder::reorder_block_into(&block, layout.dims, VARIABLES, destination)?;

        progress.step(t + 1);
    }

    Ok(timeseries)
}

fn decode_all_blocks<R: Read>(
    reader: &mut R,
    layout: &BlockLayout,
    progress: &mut dyn Progress,
) -> Result<Array5<f64>, Error> {
    let per_block = layout.values_per_block();
    let mut raw = vec![0f64; per_block * layout.timesteps];
    let mut bytes = vec![0u8; layout.data_bytes];

    progress.stage("reading all data blocks", layout.timesteps);

    for (t, block) in raw.chunks_exact_mut(per_block).enumerate() {
        if t > 0 {
            check_block_header(reader, t, layout, progress)?;
        }

        reader.read_exact(&mut bytes)?;
        utils::decode_floats(&bytes, block);

        progress.step(t + 1);
    }

    progress.stage("reordering all timesteps in a single operation", 1);
    let timeseries = reorder::reorder_all(raw, layout.timesteps, layout.dims, VARIABLES)?;
    progress.step(1);

    Ok(timeseries)
}

/// read the header of block `t` and warn if it differs from the first block's
fn check_block_header<R: Read>(
    reader: &mut R,
    t: usize,
    layout: &BlockLayout,
    progress: &mut dyn Progress,
) -> Result<(), Error> {
    let mut bytes = [0u8; HEADER_BYTES as usize];
    reader.read_exact(&mut bytes)?;
    let header = parse_header(&bytes);

    if header != layout.header {
        let [nx, ny, nz] = header;
        let [ex, ey, ez] = layout.header;
        progress.warn(&format!(
            "timestep {t} has header nx={nx}, ny={ny}, nz={nz} but the first timestep has \
            nx={ex}, ny={ey}, nz={ez}. Continuing with the first timestep's dimensions"
        ));
    }

    Ok(())
}

/// Read the first block header. `None` if the stream is empty.
fn read_header<R: Read>(reader: &mut R) -> Result<Option<[i32; 3]>, Error> {
    let mut bytes = [0u8; HEADER_BYTES as usize];
    let mut filled = 0;

    while filled < bytes.len() {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(None),
        n if n < bytes.len() => Err(Error::corrupt(format!(
            "file ends after {n} bytes, inside the first block header"
        ))),
        _ => Ok(Some(parse_header(&bytes))),
    }
}

fn parse_header(bytes: &[u8; HEADER_BYTES as usize]) -> [i32; 3] {
    [
        utils::bytes_to_int(&bytes[0..4]),
        utils::bytes_to_int(&bytes[4..8]),
        utils::bytes_to_int(&bytes[8..12]),
    ]
}

/// Labels for the gradient files written by the simulation, keyed on the file stem.
///
/// Stems containing `du`, `dv` or `dw` get the derivative names of that velocity component,
/// any other stem keeps [`BINARY_LABELS`].
///
/// ```
/// let labels = gridseries::binary::derivative_labels("dv");
/// assert_eq!(labels, ["x", "y", "z", "dv_dx", "dv_dy", "dv_dz"]);
/// ```
pub fn derivative_labels(stem: &str) -> Vec<String> {
    let component = ["du", "dv", "dw"]
        .into_iter()
        .find(|component| stem.contains(component));

    match component {
        Some(c) => COORDINATE_LABELS
            .into_iter()
            .map(String::from)
            .chain(["dx", "dy", "dz"].into_iter().map(|d| format!("{c}_{d}")))
            .collect(),
        None => BINARY_LABELS.iter().map(|l| l.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::recording::Recording;

    /// write blocks for `points` records per timestep, the value of each record is
    /// given by `value(t, point, variable)`
    fn encode(
        header: [i32; 3],
        timesteps: usize,
        value: impl Fn(usize, usize, usize) -> f64,
    ) -> Vec<u8> {
        let points = (header[0] * header[1] * header[2]) as usize;
        let mut out = Vec::new();
        for t in 0..timesteps {
            header.iter().for_each(|d| out.extend(d.to_ne_bytes()));
            for p in 0..points {
                for n in 0..VARIABLES {
                    out.extend(value(t, p, n).to_ne_bytes());
                }
            }
        }
        out
    }

    fn decode(bytes: &[u8], strategy: DecodeStrategy) -> Result<GridDataset, Error> {
        decode_binary(
            bytes,
            bytes.len() as u64,
            &BinaryOptions::with_strategy(strategy),
            &mut Silent,
        )
    }

    #[test]
    fn two_points_along_x() {
        let bytes = encode([2, 1, 1], 1, |_, p, n| (p * 10 + n) as f64);

        let data = decode(&bytes, DecodeStrategy::MemoryOptimized).unwrap();

        assert_eq!(data.shape(), [1, 2, 1, 1, 6]);
        let p0: Vec<f64> = data.timeseries.slice(s![0, 0, 0, 0, ..]).to_vec();
        let p1: Vec<f64> = data.timeseries.slice(s![0, 1, 0, 0, ..]).to_vec();
        assert_eq!(p0, [0., 1., 2., 3., 4., 5.]);
        assert_eq!(p1, [10., 11., 12., 13., 14., 15.]);
        assert_eq!(data.labels, BINARY_LABELS);
    }

    #[test]
    fn column_major_to_row_major() {
        let (nx, ny, nz) = (3, 2, 4);
        let bytes = encode([nx, ny, nz], 2, |t, p, n| (t * 1000 + p * 10 + n) as f64);

        let data = decode(&bytes, DecodeStrategy::MemoryOptimized).unwrap();
        assert_eq!(data.shape(), [2, 3, 2, 4, 6]);

        for t in 0..2 {
            for k in 0..nz as usize {
                for j in 0..ny as usize {
                    for i in 0..nx as usize {
                        let p = (k * ny as usize + j) * nx as usize + i;
                        for n in 0..VARIABLES {
                            let expected = (t * 1000 + p * 10 + n) as f64;
                            assert_eq!(data.timeseries[[t, i, j, k, n]], expected);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn strategies_are_bit_identical() {
        let bytes = encode([4, 3, 2], 3, |t, p, n| {
            (t as f64 + 1.0) / (p as f64 + 3.0) - n as f64 * 1e-7
        });

        let memory = decode(&bytes, DecodeStrategy::MemoryOptimized).unwrap();
        let speed = decode(&bytes, DecodeStrategy::SpeedOptimized).unwrap();

        let memory_bits: Vec<u64> = memory.timeseries.iter().map(|x| x.to_bits()).collect();
        let speed_bits: Vec<u64> = speed.timeseries.iter().map(|x| x.to_bits()).collect();
        assert_eq!(memory_bits, speed_bits);
        assert_eq!(memory, speed);
    }

    #[test]
    fn decoding_is_idempotent() {
        let bytes = encode([2, 2, 2], 2, |t, p, n| (t + p * n) as f64 * 0.1);
        let first = decode(&bytes, DecodeStrategy::MemoryOptimized).unwrap();
        let second = decode(&bytes, DecodeStrategy::MemoryOptimized).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn size_not_multiple_of_block() {
        let mut bytes = encode([2, 2, 1], 2, |_, _, _| 1.0);
        bytes.push(0);

        for strategy in [DecodeStrategy::MemoryOptimized, DecodeStrategy::SpeedOptimized] {
            let out = decode(&bytes, strategy);
            assert!(matches!(out, Err(Error::CorruptFormat { .. })));
        }

        // a trailing partial block is never truncated away
        let mut bytes = encode([2, 2, 1], 2, |_, _, _| 1.0);
        bytes.truncate(bytes.len() - 8);
        let out = decode(&bytes, DecodeStrategy::MemoryOptimized);
        assert!(matches!(out, Err(Error::CorruptFormat { .. })));
    }

    #[test]
    fn empty_stream() {
        let out = decode(&[], DecodeStrategy::MemoryOptimized);
        assert!(matches!(out, Err(Error::EmptyInput { .. })));
    }

    #[test]
    fn partial_header() {
        let out = decode(&[1, 0, 0, 0, 1], DecodeStrategy::MemoryOptimized);
        assert!(matches!(out, Err(Error::CorruptFormat { .. })));
    }

    #[test]
    fn non_positive_dimensions() {
        let mut bytes = Vec::new();
        [2i32, 0, 1].iter().for_each(|d| bytes.extend(d.to_ne_bytes()));
        let out = decode(&bytes, DecodeStrategy::MemoryOptimized);
        assert!(matches!(out, Err(Error::CorruptFormat { .. })));
    }

    #[test]
    fn overflowing_block_size() {
        let mut bytes = Vec::new();
        [i32::MAX, i32::MAX, i32::MAX]
            .iter()
            .for_each(|d| bytes.extend(d.to_ne_bytes()));
        let out = decode(&bytes, DecodeStrategy::MemoryOptimized);
        assert!(matches!(out, Err(Error::CorruptFormat { .. })));
    }

    #[test]
    fn mismatched_header_warns_and_continues() {
        let mut bytes = encode([2, 1, 1], 2, |t, p, _| (t * 10 + p) as f64);
        // rewrite the second block header to the same point count but a different shape
        let second = (HEADER_BYTES + 2 * 6 * VALUE_BYTES) as usize;
        bytes[second..second + 4].copy_from_slice(&1i32.to_ne_bytes());
        bytes[second + 4..second + 8].copy_from_slice(&2i32.to_ne_bytes());

        for strategy in [DecodeStrategy::MemoryOptimized, DecodeStrategy::SpeedOptimized] {
            let mut recording = Recording::default();
            let data = decode_binary(
                bytes.as_slice(),
                bytes.len() as u64,
                &BinaryOptions::with_strategy(strategy),
                &mut recording,
            )
            .unwrap();

            assert_eq!(data.shape(), [2, 2, 1, 1, 6]);
            assert_eq!(data.timeseries[[1, 1, 0, 0, 0]], 11.0);
            assert_eq!(recording.warnings.len(), 1);
            assert!(recording.warnings[0].contains("timestep 1"));
        }
    }

    #[test]
    fn reports_progress() {
        let bytes = encode([1, 1, 1], 4, |_, _, _| 0.0);
        let mut recording = Recording::default();
        decode_binary(
            bytes.as_slice(),
            bytes.len() as u64,
            &BinaryOptions::default(),
            &mut recording,
        )
        .unwrap();

        assert_eq!(recording.stages.len(), 1);
        assert_eq!(recording.stages[0].1, 4);
        assert_eq!(recording.steps, 4);
    }

    #[test]
    fn missing_file() {
        let out = read_binary(
            Path::new("./this/file/does/not/exist.dat"),
            &BinaryOptions::default(),
            &mut Silent,
        );
        assert!(matches!(out, Err(Error::NotFound { .. })));
    }

    #[test]
    fn labels_from_stem() {
        assert_eq!(
            derivative_labels("du"),
            ["x", "y", "z", "du_dx", "du_dy", "du_dz"]
        );
        assert_eq!(
            derivative_labels("run_dw_2"),
            ["x", "y", "z", "dw_dx", "dw_dy", "dw_dz"]
        );
        assert_eq!(derivative_labels("pressure"), BINARY_LABELS);
    }
}

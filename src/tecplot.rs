//! Decoding Tecplot ASCII timeseries files
//!
//! Only the block convention written by the simulation is understood:
//!
//! ```text
//! TITLE = "snapshot 0"
//! VARIABLES = "x" "y" "z" "u" "v"
//! ZONE I=4, J=3, K=2
//! 0.0 0.0 0.0 1.25 -0.5
//! ...
//! TITLE = "snapshot 1"
//! ...
//! ```
//!
//! Every `TITLE` line starts a new snapshot. The first `VARIABLES` line names the columns,
//! `ZONE` lines are ignored, and every other non-blank line is one point of the current
//! snapshot with `x` varying fastest, then `y`, then `z`. Keywords are matched at the start of
//! a line without regard to case.
//!
//! Files are read twice. The first pass counts snapshots, reads the labels, and infers the grid
//! from the first snapshot. The second pass fills a pre-allocated array one snapshot at a time.

use crate::prelude::*;
use crate::reorder;
use crate::shape;

use ndarray::ArrayView2;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// columns of each data row holding the `x`, `y`, `z` coordinates
const COORDINATE_COLUMNS: [usize; 3] = [0, 1, 2];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Line<'a> {
    Blank,
    Title,
    Variables(&'a str),
    Zone,
    Data(&'a str),
}

impl<'a> Line<'a> {
    fn classify(raw: &'a str) -> Self {
        let line = raw.trim();

        if line.is_empty() {
            Line::Blank
        } else if starts_with_keyword(line, "title") {
            Line::Title
        } else if starts_with_keyword(line, "variables") {
            Line::Variables(line)
        } else if starts_with_keyword(line, "zone") {
            Line::Zone
        } else {
            Line::Data(line)
        }
    }
}

/// case insensitive check for `keyword` at the start of `line`
pub(crate) fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.get(..keyword.len())
        .map(|start| start.eq_ignore_ascii_case(keyword))
        .unwrap_or(false)
}

/// Extract every complete double quoted token from a `VARIABLES` line
fn parse_labels(line: &str) -> Vec<String> {
    let complete_pairs = line.matches('"').count() / 2;

    line.split('"')
        .skip(1)
        .step_by(2)
        .take(complete_pairs)
        .map(|label| label.to_string())
        .collect()
}

/// Parse a whitespace separated row of exactly `out.len()` numbers into `out`
fn parse_row(line: &str, line_number: usize, out: &mut [f64]) -> Result<(), Error> {
    let malformed = |reason: String| Error::MalformedRow {
        line: line_number,
        content: line.to_string(),
        reason,
    };

    let found = line.split_ascii_whitespace().count();
    if found != out.len() {
        return Err(malformed(format!(
            "expected {} values to match the VARIABLES header, found {found}",
            out.len()
        )));
    }

    for (slot, token) in out.iter_mut().zip(line.split_ascii_whitespace()) {
        *slot = token
            .parse()
            .map_err(|_| malformed(format!("`{token}` is not a floating point number")))?;
    }

    Ok(())
}

/// Reads lines into a reused buffer while tracking 1-based line numbers
struct LineReader<R> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(256),
            line_number: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, Line<'_>)>, Error> {
        self.buffer.clear();

        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }

        self.line_number += 1;
        Ok(Some((self.line_number, Line::classify(&self.buffer))))
    }

    fn into_inner(self) -> R {
        self.reader
    }
}

/// Everything the first pass learns about a file
#[derive(Debug, Clone, PartialEq)]
struct Structure {
    timesteps: usize,
    labels: Vec<String>,
    dims: GridDims,
}

impl Structure {
    fn variables(&self) -> usize {
        self.labels.len()
    }
}

/// Read and decode a Tecplot ASCII file from a path.
///
/// A file without any `TITLE` or `VARIABLES` line decodes to [`GridDataset::empty`].
pub fn read_tecplot(path: &Path, progress: &mut dyn Progress) -> Result<GridDataset, Error> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(path = %path.display(), "decoding tecplot ascii file");

    let file = File::open(path)?;
    decode_tecplot(BufReader::new(file), progress)
}

/// Decode a Tecplot ASCII stream. The stream is rewound to its start once for the second pass.
pub fn decode_tecplot<R: BufRead + Seek>(
    mut reader: R,
    progress: &mut dyn Progress,
) -> Result<GridDataset, Error> {
    reader.seek(SeekFrom::Start(0))?;

    progress.stage("scanning file structure", 1);
    let mut lines = LineReader::new(reader);
    let structure = match discover_structure(&mut lines)? {
        Some(structure) => structure,
        None => {
            tracing::debug!("no TITLE or VARIABLES line found, returning an empty dataset");
            return Ok(GridDataset::empty());
        }
    };
    progress.step(1);

    tracing::debug!(
        timesteps = structure.timesteps,
        dims = %structure.dims,
        variables = structure.variables(),
        "discovered tecplot structure"
    );

    let mut reader = lines.into_inner();
    reader.seek(SeekFrom::Start(0))?;

    let timeseries = materialize(LineReader::new(reader), &structure, progress)?;

    GridDataset::new(timeseries, structure.labels)
}

/// First pass: count snapshots, read labels, and infer the grid from the first snapshot
fn discover_structure<R: BufRead>(lines: &mut LineReader<R>) -> Result<Option<Structure>, Error> {
    let mut timesteps = 0;
    let mut labels: Option<Vec<String>> = None;
    let mut first_block: Vec<f64> = Vec::new();
    let mut row: Vec<f64> = Vec::new();
    let mut misplaced: Option<(usize, String, &'static str)> = None;

    while let Some((line_number, line)) = lines.next_line()? {
        match line {
            Line::Blank | Line::Zone => (),
            Line::Title => timesteps += 1,
            Line::Variables(text) => {
                if labels.is_none() {
                    let parsed = parse_labels(text);
                    row.resize(parsed.len(), 0.0);
                    labels = Some(parsed);
                }
            }
            Line::Data(text) => {
                // a file missing either keyword decodes to the empty dataset, so misplaced
                // rows are only reported once the whole file has been scanned
                if timesteps == 0 || (timesteps == 1 && labels.is_none()) {
                    if misplaced.is_none() {
                        let reason = if timesteps == 0 {
                            "data row appears before the first TITLE line"
                        } else {
                            "data row appears before the VARIABLES line"
                        };
                        misplaced = Some((line_number, text.to_string(), reason));
                    }
                    continue;
                }

                // only the first snapshot is needed to discover the grid
                if timesteps > 1 {
                    continue;
                }

                parse_row(text, line_number, &mut row)?;
                first_block.extend_from_slice(&row);
            }
        }
    }

    let labels = match labels {
        Some(labels) if timesteps > 0 => labels,
        _ => return Ok(None),
    };

    if let Some((line, content, reason)) = misplaced {
        return Err(Error::MalformedRow {
            line,
            content,
            reason: reason.into(),
        });
    }

    if first_block.is_empty() {
        return Err(Error::empty("the first TITLE block holds no data rows"));
    }

    let variables = labels.len();
    let rows = first_block.len() / variables;
    let points = ArrayView2::from_shape((rows, variables), &first_block)?;
    let dims = shape::infer_grid_shape(&points, &COORDINATE_COLUMNS)?;

    if dims.points() != rows {
        return Err(Error::IncompleteGrid {
            nx: dims.nx,
            ny: dims.ny,
            nz: dims.nz,
            points: rows,
            location: "in the first TITLE block".into(),
        });
    }

    Ok(Some(Structure {
        timesteps,
        labels,
        dims,
    }))
}

/// Second pass: fill the output one snapshot at a time through a single scratch buffer
fn materialize<R: BufRead>(
    mut lines: LineReader<R>,
    structure: &Structure,
    progress: &mut dyn Progress,
) -> Result<Array5<f64>, Error> {
    let GridDims { nx, ny, nz } = structure.dims;
    let variables = structure.variables();
    let points = structure.dims.points();

    let mut timeseries = Array5::zeros((structure.timesteps, nx, ny, nz, variables));
    let mut snapshot = vec![0f64; points * variables];

    // index of the TITLE block being read and the number of points read into it
    let mut block: Option<usize> = None;
    let mut cursor = 0;

    progress.stage("materializing snapshots", structure.timesteps);

    let mut flush = |block: usize,
                     cursor: usize,
                     snapshot: &[f64],
                     ending: String|
     -> Result<(), Error> {
        if cursor != points {
            return Err(Error::IncompleteGrid {
                nx,
                ny,
                nz,
                points: cursor,
                location: format!("in TITLE block {} {ending}", block + 1),
            });
        }

        let destination = timeseries.slice_mut(s![block, .., .., .., ..]);
        reorder::reorder_block_into(snapshot, structure.dims, variables, destination)?;
        progress.step(block + 1);
        Ok(())
    };

    while let Some((line_number, line)) = lines.next_line()? {
        match line {
            Line::Blank | Line::Zone | Line::Variables(_) => (),
            Line::Title => {
                if let Some(previous) = block {
                    flush(
                        previous,
                        cursor,
                        &snapshot,
                        format!("ending at line {line_number}"),
                    )?;
                }

                let next = block.map(|b| b + 1).unwrap_or(0);
                if next >= structure.timesteps {
                    return Err(Error::corrupt(
                        "the file gained TITLE blocks between the two decoding passes",
                    ));
                }

                block = Some(next);
                cursor = 0;
            }
            Line::Data(text) => {
                let current = match block {
                    Some(current) => current,
                    None => {
                        return Err(Error::MalformedRow {
                            line: line_number,
                            content: text.to_string(),
                            reason: "data row appears before the first TITLE line".into(),
                        })
                    }
                };

                if cursor == points {
                    return Err(Error::IncompleteGrid {
                        nx,
                        ny,
                        nz,
                        points: cursor + 1,
                        location: format!(
                            "in TITLE block {} (more rows than grid points, line {line_number})",
                            current + 1
                        ),
                    });
                }

                let row = &mut snapshot[cursor * variables..(cursor + 1) * variables];
                parse_row(text, line_number, row)?;
                cursor += 1;
            }
        }
    }

    // the final snapshot has no TITLE line after it to trigger the flush
    match block {
        Some(last) if last + 1 == structure.timesteps => {
            flush(last, cursor, &snapshot, "at the end of the file".into())?
        }
        _ => {
            return Err(Error::corrupt(
                "the file lost TITLE blocks between the two decoding passes",
            ))
        }
    }

    Ok(timeseries)
}

//! Line oriented helpers for exploring large text exports without loading them
//!
//! These are used to peek at Tecplot files, cut a short development copy of one, or count
//! its snapshots before committing to a full decode.

use crate::prelude::*;
use crate::tecplot::starts_with_keyword;

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }

    Ok(BufReader::new(File::open(path)?))
}

/// The first `count` lines of `path` with surrounding whitespace removed. Fewer lines are
/// returned if the file is shorter.
pub fn read_first_lines(path: &Path, count: usize) -> Result<Vec<String>, Error> {
    open(path)?
        .lines()
        .take(count)
        .map(|line| -> Result<String, Error> { Ok(line?.trim().to_string()) })
        .collect()
}

/// `<stem>_truncated<.ext>` next to `path`
pub fn truncated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match path.extension() {
        Some(ext) => format!("{stem}_truncated.{}", ext.to_string_lossy()),
        None => format!("{stem}_truncated"),
    };

    path.with_file_name(name)
}

/// Copy the first `count` lines of `path` to `output`, or to [`truncated_path`] when no output
/// is given. Returns the path written.
pub fn truncate_at_line(
    path: &Path,
    count: usize,
    output: Option<&Path>,
) -> Result<PathBuf, Error> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| truncated_path(path));

    let mut reader = open(path)?;

    if same_file(path, &output) {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to truncate `{}` onto itself", path.display()),
        )));
    }

    let mut writer = BufWriter::new(File::create(&output)?);
    let copied = copy_lines(&mut reader, &mut writer, count)?;
    writer.flush()?;

    tracing::info!(
        source = %path.display(),
        output = %output.display(),
        lines = copied,
        "wrote truncated copy"
    );

    Ok(output)
}

/// `true` if both paths name the same existing file, however they are spelled
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// copy up to `count` lines verbatim, line endings included
fn copy_lines<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    count: usize,
) -> Result<usize, Error> {
    let mut line = Vec::new();
    let mut copied = 0;

    while copied < count {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
        copied += 1;
    }

    Ok(copied)
}

/// Number of lines of `path` starting with `keyword`, ignoring case and leading whitespace.
///
/// Counting `TITLE` lines gives the number of snapshots in a Tecplot file.
pub fn count_keyword_lines(path: &Path, keyword: &str) -> Result<usize, Error> {
    count_keyword(open(path)?, keyword)
}

fn count_keyword<R: BufRead>(reader: R, keyword: &str) -> Result<usize, Error> {
    let mut count = 0;

    for line in reader.lines() {
        if starts_with_keyword(line?.trim_start(), keyword) {
            count += 1;
        }
    }

    Ok(count)
}

//! Writing datasets back out in the simulation's file formats
//!
//! Both writers emit snapshots in storage order (`x` varying fastest) so that their output
//! decodes back to the same dataset with [`read_binary`](crate::read_binary) and
//! [`read_tecplot`](crate::read_tecplot).

use crate::binary::BINARY_LABELS;
use crate::prelude::*;
use crate::reorder;

use std::io::Write;

/// Write `dataset` in the packed binary format. The dataset must hold exactly the six
/// variables of that format.
pub fn write_binary<W: Write>(mut writer: W, dataset: &GridDataset) -> Result<(), Error> {
    let variables = dataset.variables();
    if variables != BINARY_LABELS.len() {
        return Err(Error::VariableCount {
            expected: BINARY_LABELS.len(),
            found: variables,
        });
    }

    let GridDims { nx, ny, nz } = dataset.dims();
    let mut header = Vec::with_capacity(12);
    for extent in [nx, ny, nz] {
        let extent = i32::try_from(extent).map_err(|_| {
            Error::corrupt(format!("grid extent {extent} does not fit in an i32 header"))
        })?;
        header.extend_from_slice(&extent.to_ne_bytes());
    }

    for snapshot in dataset.timeseries.outer_iter() {
        writer.write_all(&header)?;

        for value in reorder::storage_order(snapshot) {
            writer.write_all(&value.to_ne_bytes())?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write `dataset` as a Tecplot ASCII file with one `TITLE` block per timestep.
///
/// Blocks are titled `"{title} {t}"` and repeat the `VARIABLES` and `ZONE` lines.
pub fn write_tecplot<W: Write>(
    mut writer: W,
    dataset: &GridDataset,
    title: &str,
) -> Result<(), Error> {
    let GridDims { nx, ny, nz } = dataset.dims();
    let variables = dataset.variables();

    let labels: String = dataset
        .labels
        .iter()
        .map(|label| format!(" \"{label}\""))
        .collect();

    let mut buffer = ryu::Buffer::new();
    let mut row = String::new();

    for (t, snapshot) in dataset.timeseries.outer_iter().enumerate() {
        writeln!(writer, "TITLE = \"{title} {t}\"")?;
        writeln!(writer, "VARIABLES ={labels}")?;
        writeln!(writer, "ZONE I={nx}, J={ny}, K={nz}, F=POINT")?;

        for (index, value) in reorder::storage_order(snapshot).enumerate() {
            if index % variables != 0 {
                row.push(' ');
            }
            row.push_str(buffer.format(value));

            if index % variables == variables - 1 {
                row.push('\n');
                writer.write_all(row.as_bytes())?;
                row.clear();
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::coordinate_grid;
    use crate::tecplot::decode_tecplot;
    use crate::{binary, BinaryOptions};
    use std::io::Cursor;

    #[test]
    fn binary_layout() {
        let data = coordinate_grid(1, GridDims::new(2, 1, 1), &BINARY_LABELS);
        let mut bytes = Vec::new();
        write_binary(&mut bytes, &data).unwrap();

        assert_eq!(bytes.len(), 12 + 2 * 6 * 8);
        assert_eq!(bytes[..4], 2i32.to_ne_bytes());
        assert_eq!(bytes[4..8], 1i32.to_ne_bytes());
        // the second record starts with x = 1
        assert_eq!(bytes[12 + 48..12 + 56], 1f64.to_ne_bytes());
    }

    #[test]
    fn binary_requires_six_variables() {
        let data = coordinate_grid(1, GridDims::new(2, 1, 1), &["x", "y", "z"]);
        assert!(matches!(
            write_binary(Vec::new(), &data),
            Err(Error::VariableCount {
                expected: 6,
                found: 3
            })
        ));
    }

    #[test]
    fn binary_decodes_back() {
        let data = coordinate_grid(3, GridDims::new(4, 3, 2), &BINARY_LABELS);
        let mut bytes = Vec::new();
        write_binary(&mut bytes, &data).unwrap();

        let length = bytes.len() as u64;
        let decoded = binary::decode_binary(
            Cursor::new(bytes),
            length,
            &BinaryOptions::default(),
            &mut Silent,
        )
        .unwrap();

        assert_eq!(decoded.timeseries, data.timeseries);
    }

    #[test]
    fn tecplot_text() {
        let data = coordinate_grid(1, GridDims::new(2, 1, 1), &["x", "y", "z", "p"]);
        let mut bytes = Vec::new();
        write_tecplot(&mut bytes, &data, "snapshot").unwrap();

        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "TITLE = \"snapshot 0\"");
        assert_eq!(lines[1], "VARIABLES = \"x\" \"y\" \"z\" \"p\"");
        assert_eq!(lines[2], "ZONE I=2, J=1, K=1, F=POINT");
        assert_eq!(lines[3], "0.0 0.0 0.0 3.0");
        assert_eq!(lines[4], "1.0 0.0 0.0 1003.0");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn tecplot_decodes_back() {
        let data = coordinate_grid(2, GridDims::new(3, 2, 2), &["x", "y", "z", "u", "v"]);
        let mut bytes = Vec::new();
        write_tecplot(&mut bytes, &data, "t").unwrap();

        let decoded = decode_tecplot(Cursor::new(bytes), &mut Silent).unwrap();
        assert_eq!(decoded, data);
    }
}

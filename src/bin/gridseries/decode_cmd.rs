//! Decode commands: turn raw simulation exports into stored datasets.

use anyhow::{bail, Context, Result};
use tracing::{info, info_span};

use gridseries::binary::derivative_labels;
use gridseries::{read_binary, read_tecplot, store, BinaryOptions, GridDataset, Logged};

use crate::cli::{BinaryArgs, TecplotArgs};
use crate::dataset_cmd::save;

/// Decode a packed binary gradient file.
pub fn run_binary(args: BinaryArgs) -> Result<()> {
    let _cmd = info_span!("binary").entered();

    let options = BinaryOptions::with_strategy(args.strategy.into());
    let mut dataset = read_binary(&args.input, &options, &mut Logged::default())
        .with_context(|| format!("failed to decode binary file: {}", args.input.display()))?;

    // gradient files are named after the velocity component they differentiate
    if let Some(stem) = args.input.file_stem() {
        dataset.labels = derivative_labels(&stem.to_string_lossy());
    }
    info!(shape = ?dataset.shape(), labels = ?dataset.labels, "decoded binary file");

    save(&dataset, &args.output, true)?;

    if args.verify {
        verify_round_trip(&dataset, &args.output)?;
    }

    Ok(())
}

/// Decode a Tecplot ASCII export.
pub fn run_tecplot(args: TecplotArgs) -> Result<()> {
    let _cmd = info_span!("tecplot").entered();

    let dataset = read_tecplot(&args.input, &mut Logged::default())
        .with_context(|| format!("failed to decode Tecplot file: {}", args.input.display()))?;

    if dataset.is_empty() {
        bail!(
            "no TITLE or VARIABLES line found in {}, nothing to store",
            args.input.display()
        );
    }
    info!(shape = ?dataset.shape(), labels = ?dataset.labels, "decoded Tecplot file");

    save(&dataset, &args.output, true)?;

    if args.verify {
        verify_round_trip(&dataset, &args.output)?;
    }

    Ok(())
}

fn verify_round_trip(dataset: &GridDataset, output: &std::path::Path) -> Result<()> {
    let reloaded = store::load(output)
        .with_context(|| format!("failed to reload {}", output.display()))?;

    if reloaded != *dataset {
        bail!("reloaded dataset at {} differs from the decoded one", output.display());
    }

    info!(path = %output.display(), "verified stored dataset");
    Ok(())
}

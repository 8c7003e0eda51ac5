//! Commands working on stored datasets.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use gridseries::{store, Encoding, GridDataset};

use crate::cli::{CompressArgs, InspectArgs, SubsetArgs};

/// Store `dataset` at `path`. `compressed` only applies to `.npz` outputs.
pub fn save(dataset: &GridDataset, path: &Path, compressed: bool) -> Result<()> {
    let encoding = match Encoding::for_path(path) {
        Encoding::Npz { .. } => Encoding::Npz { compressed },
        Encoding::Object => Encoding::Object,
    };

    store::save(dataset, path, encoding)
        .with_context(|| format!("failed to save dataset: {}", path.display()))
}

fn load(path: &Path) -> Result<GridDataset> {
    store::load(path).with_context(|| format!("failed to load dataset: {}", path.display()))
}

/// Print a summary of a stored dataset.
pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let _cmd = info_span!("inspect").entered();

    let dataset = load(&args.input)?;
    println!("{}", args.input.display());
    println!("{}", dataset.summary());

    Ok(())
}

/// Keep the first snapshots of a stored dataset.
pub fn run_subset(args: SubsetArgs) -> Result<()> {
    let _cmd = info_span!("subset").entered();

    let dataset = load(&args.input)?;
    let subset = dataset.first_snapshots(args.snapshots);
    drop(dataset);

    info!(shape = ?subset.shape(), "created development subset");
    save(&subset, &args.output, false)
}

/// Re-save a stored dataset as a compressed npz archive.
pub fn run_compress(args: CompressArgs) -> Result<()> {
    let _cmd = info_span!("compress").entered();

    let dataset = load(&args.input)?;
    store::save(&dataset, &args.output, Encoding::Npz { compressed: true })
        .with_context(|| format!("failed to save dataset: {}", args.output.display()))?;

    info!(output = %args.output.display(), "compression complete");
    Ok(())
}

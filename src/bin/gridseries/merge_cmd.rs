//! Merge command: combine a base dataset with derivative datasets.

use anyhow::{bail, Context, Result};
use tracing::{info, info_span};

use gridseries::{merge_datasets, store, DatasetSource, Logged, MergeOptions, StoredDataset};

use crate::cli::{MergeArgs, NamedPath};
use crate::config::{MergeManifest, SourceToml};
use crate::dataset_cmd::save;

fn source(name: Option<String>, path: std::path::PathBuf) -> StoredDataset {
    match name {
        Some(name) => StoredDataset::new(name, path),
        None => StoredDataset::from_path(path),
    }
}

impl From<NamedPath> for SourceToml {
    fn from(named: NamedPath) -> Self {
        SourceToml {
            name: named.name,
            path: named.path,
        }
    }
}

/// Run the two-pass merge and store the result.
pub fn run(args: MergeArgs) -> Result<()> {
    let _cmd = info_span!("merge").entered();

    let manifest = args
        .manifest
        .as_deref()
        .map(MergeManifest::load)
        .transpose()?;

    // CLI flags override the manifest
    let base = match (args.base, &manifest) {
        (Some(base), _) => SourceToml::from(base),
        (None, Some(manifest)) => manifest.base.clone(),
        (None, None) => bail!("no base dataset: provide --manifest or --base"),
    };

    let deltas: Vec<SourceToml> = if !args.deltas.is_empty() {
        args.deltas.into_iter().map(SourceToml::from).collect()
    } else {
        manifest
            .as_ref()
            .map(|manifest| manifest.deltas.clone())
            .unwrap_or_default()
    };

    let output = match (args.output, manifest.as_ref().and_then(|m| m.output.clone())) {
        (Some(output), _) | (None, Some(output)) => output,
        (None, None) => bail!("no output path: provide --output or set `output` in the manifest"),
    };

    let compressed = !args.uncompressed && manifest.as_ref().map_or(true, |m| m.compressed);
    let mut options = manifest
        .as_ref()
        .map(MergeManifest::options)
        .unwrap_or_else(MergeOptions::default);
    if args.verify_grid {
        options = options.with_base_grid_check(true);
    }

    let base = source(base.name, base.path);
    let deltas: Vec<StoredDataset> = deltas
        .into_iter()
        .map(|delta| source(delta.name, delta.path))
        .collect();
    let delta_sources: Vec<&dyn DatasetSource> =
        deltas.iter().map(|d| d as &dyn DatasetSource).collect();

    info!(
        base = base.name(),
        deltas = ?deltas.iter().map(|d| d.name()).collect::<Vec<_>>(),
        "merging datasets"
    );

    let merged = merge_datasets(&base, &delta_sources, options, &mut Logged::default())
        .context("failed to merge datasets")?;
    info!(shape = ?merged.shape(), labels = merged.labels.len(), "merge complete");

    save(&merged, &output, compressed)?;

    // at most one full copy of the merged array is alive during the reload
    let reference = args.verify.then(|| merged.first_snapshots(1));
    drop(merged);

    if let Some(reference) = reference {
        let reloaded = store::load(&output)
            .with_context(|| format!("failed to reload {}", output.display()))?
            .first_snapshots(1);

        if reloaded != reference {
            bail!("first snapshot of {} differs from the merged dataset", output.display());
        }
        info!(path = %output.display(), "verified first snapshot of merged dataset");
    }

    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use gridseries::DecodeStrategy;

/// Decode, merge and inspect structured-grid simulation timeseries.
#[derive(Parser)]
#[command(
    name = "gridseries",
    version,
    about = "Decode, merge and inspect structured-grid simulation timeseries"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Decode a packed binary gradient file and store it.
    Binary(BinaryArgs),
    /// Decode a Tecplot ASCII export and store it.
    Tecplot(TecplotArgs),
    /// Merge a base dataset with derivative datasets on the same grid.
    Merge(MergeArgs),
    /// Print the shape, size and value ranges of a stored dataset.
    Inspect(InspectArgs),
    /// Store the first snapshots of a dataset as a development subset.
    Subset(SubsetArgs),
    /// Re-save a stored dataset as a compressed npz archive.
    Compress(CompressArgs),
    /// Print the first lines of a text file.
    Head(HeadArgs),
    /// Copy the first lines of a text file to a new file.
    Truncate(TruncateArgs),
    /// Count the lines of a text file that start with a keyword.
    Count(CountArgs),
}

/// Decoding strategy for binary files.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StrategyArg {
    /// Reorder one timestep at a time.
    #[default]
    Memory,
    /// Read everything, then reorder in one pass.
    Speed,
}

impl From<StrategyArg> for DecodeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Memory => DecodeStrategy::MemoryOptimized,
            StrategyArg::Speed => DecodeStrategy::SpeedOptimized,
        }
    }
}

/// Arguments for the `binary` subcommand.
#[derive(clap::Args)]
pub struct BinaryArgs {
    /// Path to the binary `.dat` file.
    pub input: PathBuf,

    /// Output path, `.npz` for a NumPy archive, anything else for the object encoding.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Decoding strategy.
    #[arg(long, value_enum, default_value_t)]
    pub strategy: StrategyArg,

    /// Reload the output and compare it with the decoded dataset.
    #[arg(long)]
    pub verify: bool,
}

/// Arguments for the `tecplot` subcommand.
#[derive(clap::Args)]
pub struct TecplotArgs {
    /// Path to the Tecplot ASCII file.
    pub input: PathBuf,

    /// Output path, `.npz` for a NumPy archive, anything else for the object encoding.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Reload the output and compare it with the decoded dataset.
    #[arg(long)]
    pub verify: bool,
}

/// A dataset given on the command line as `name=path` or just `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPath {
    pub name: Option<String>,
    pub path: PathBuf,
}

fn parse_named_path(value: &str) -> Result<NamedPath, String> {
    match value.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("missing name before `=` in `{value}`")),
        Some((_, path)) if path.is_empty() => Err(format!("missing path after `=` in `{value}`")),
        Some((name, path)) => Ok(NamedPath {
            name: Some(name.to_string()),
            path: PathBuf::from(path),
        }),
        None => Ok(NamedPath {
            name: None,
            path: PathBuf::from(value),
        }),
    }
}

/// Arguments for the `merge` subcommand.
#[derive(clap::Args)]
pub struct MergeArgs {
    /// Path to a TOML merge manifest.
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Base dataset as `name=path`. Overrides the manifest.
    #[arg(long, value_parser = parse_named_path)]
    pub base: Option<NamedPath>,

    /// Delta dataset as `name=path`, in merge order. Replaces the manifest deltas.
    #[arg(long = "delta", value_parser = parse_named_path)]
    pub deltas: Vec<NamedPath>,

    /// Override the output path from the manifest.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write an uncompressed npz archive.
    #[arg(long)]
    pub uncompressed: bool,

    /// Infer the grid from the base coordinates and require it to match the base shape.
    #[arg(long)]
    pub verify_grid: bool,

    /// Reload the output and compare its first snapshot with the merged dataset.
    #[arg(long)]
    pub verify: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to a stored dataset.
    pub input: PathBuf,
}

/// Arguments for the `subset` subcommand.
#[derive(clap::Args)]
pub struct SubsetArgs {
    /// Path to a stored dataset.
    pub input: PathBuf,

    /// Output path for the subset, stored as an uncompressed npz archive.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of leading snapshots to keep.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub snapshots: usize,
}

/// Arguments for the `compress` subcommand.
#[derive(clap::Args)]
pub struct CompressArgs {
    /// Path to a stored dataset.
    pub input: PathBuf,

    /// Path for the compressed npz archive.
    pub output: PathBuf,
}

/// Arguments for the `head` subcommand.
#[derive(clap::Args)]
pub struct HeadArgs {
    /// Path to a text file.
    pub input: PathBuf,

    /// Number of lines to print.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub lines: usize,
}

/// Arguments for the `truncate` subcommand.
#[derive(clap::Args)]
pub struct TruncateArgs {
    /// Path to a text file.
    pub input: PathBuf,

    /// Number of lines to keep.
    #[arg(short = 'n', long)]
    pub lines: usize,

    /// Output path, defaults to `<stem>_truncated<.ext>` next to the input.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `count` subcommand.
#[derive(clap::Args)]
pub struct CountArgs {
    /// Path to a text file.
    pub input: PathBuf,

    /// Keyword matched at the start of each line, ignoring case.
    #[arg(short, long, default_value = "TITLE")]
    pub keyword: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_paths() {
        assert_eq!(
            parse_named_path("du=/data/du.pkl").unwrap(),
            NamedPath {
                name: Some("du".into()),
                path: PathBuf::from("/data/du.pkl"),
            }
        );
        assert_eq!(parse_named_path("dv.npz").unwrap().name, None);
        assert!(parse_named_path("=dv.npz").is_err());
        assert!(parse_named_path("dv=").is_err());
    }

    #[test]
    fn merge_arguments() {
        let cli = Cli::parse_from([
            "gridseries",
            "-vv",
            "merge",
            "--base",
            "base=base.pkl",
            "--delta",
            "du=du.pkl",
            "--delta",
            "dv.pkl",
            "-o",
            "merged.npz",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Merge(args) => {
                assert_eq!(args.deltas.len(), 2);
                assert_eq!(args.deltas[0].name.as_deref(), Some("du"));
                assert!(!args.uncompressed);
            }
            _ => panic!("expected the merge subcommand"),
        }
    }
}

mod cli;
mod config;
mod dataset_cmd;
mod decode_cmd;
mod logging;
mod merge_cmd;
mod text_cmd;

use std::process;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Binary(args) => decode_cmd::run_binary(args),
        Command::Tecplot(args) => decode_cmd::run_tecplot(args),
        Command::Merge(args) => merge_cmd::run(args),
        Command::Inspect(args) => dataset_cmd::run_inspect(args),
        Command::Subset(args) => dataset_cmd::run_subset(args),
        Command::Compress(args) => dataset_cmd::run_compress(args),
        Command::Head(args) => text_cmd::run_head(args),
        Command::Truncate(args) => text_cmd::run_truncate(args),
        Command::Count(args) => text_cmd::run_count(args),
    }
}

//! Commands for peeking at large text exports.

use anyhow::{Context, Result};

use gridseries::lines;

use crate::cli::{CountArgs, HeadArgs, TruncateArgs};

pub fn run_head(args: HeadArgs) -> Result<()> {
    let lines = lines::read_first_lines(&args.input, args.lines)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    for line in lines {
        println!("{line}");
    }

    Ok(())
}

pub fn run_truncate(args: TruncateArgs) -> Result<()> {
    let output = lines::truncate_at_line(&args.input, args.lines, args.output.as_deref())
        .with_context(|| format!("failed to truncate {}", args.input.display()))?;

    println!("{}", output.display());
    Ok(())
}

pub fn run_count(args: CountArgs) -> Result<()> {
    let count = lines::count_keyword_lines(&args.input, &args.keyword)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    println!("{count}");
    Ok(())
}

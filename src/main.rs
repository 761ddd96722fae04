use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use nbclean::NormalizeOptions;

/// Normalize Jupyter notebooks for clean version-control diffs.
///
/// Removes empty cells, clears execution counts and cell metadata, and
/// stamps created/updated times in the notebook metadata.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Notebook files to rewrite in place. Omit to filter stdin to stdout.
    #[arg()]
    files: Vec<PathBuf>,

    /// Run `git add` on every rewritten file.
    #[arg(long)]
    stage: bool,

    /// Silently skip paths that do not exist.
    #[arg(long)]
    skip_missing: bool,

    /// Keep code and markdown cells with empty source.
    #[arg(long)]
    keep_empty_cells: bool,

    /// Keep execution counts on code cells.
    #[arg(long)]
    keep_execution_counts: bool,

    /// Keep metadata on code and markdown cells.
    #[arg(long)]
    keep_cell_metadata: bool,

    /// Do not stamp created/updated times.
    #[arg(long)]
    no_timestamps: bool,

    /// Use this time instead of the current time (RFC 3339).
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    now: Option<DateTime<Utc>>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 time: {e}"))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_options(cli: &Cli) -> NormalizeOptions {
    NormalizeOptions {
        remove_empty_cells: !cli.keep_empty_cells,
        clear_execution_counts: !cli.keep_execution_counts,
        clear_cell_metadata: !cli.keep_cell_metadata,
        stamp_timestamps: !cli.no_timestamps,
    }
}

/// Filter mode: one notebook from stdin, canonical form to stdout.
fn run_filter(now: DateTime<Utc>, options: &NormalizeOptions) -> Result<ExitCode, ExitCode> {
    let mut data = Vec::new();
    io::stdin().read_to_end(&mut data).map_err(|e| {
        eprintln!("error: stdin: {e}");
        ExitCode::from(1)
    })?;

    let text = nbclean::normalize_bytes(&data, now, options)
        .and_then(|result| result.notebook.to_canonical_string())
        .map_err(|e| {
            eprintln!("error: stdin: {e}");
            ExitCode::from(1)
        })?;

    io::stdout().write_all(text.as_bytes()).map_err(|e| {
        eprintln!("error: stdout: {e}");
        ExitCode::from(1)
    })?;

    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> Result<ExitCode, ExitCode> {
    let options = build_options(&cli);
    let now = cli.now.unwrap_or_else(nbclean::current_time);

    if cli.files.is_empty() {
        return run_filter(now, &options);
    }

    for path in &cli.files {
        if !nbclean::is_notebook_path(path) {
            warn!(path = %path.display(), "skipping non-notebook path");
            continue;
        }
        if cli.skip_missing && !path.exists() {
            continue;
        }

        let result = nbclean::normalize_file(path, now, &options).map_err(|e| {
            eprintln!("error: {}: {e}", path.display());
            ExitCode::from(1)
        })?;

        if !result.changed {
            println!("No changes needed: {}", path.display());
            continue;
        }

        if cli.stage {
            nbclean::git::stage(path).map_err(|e| {
                eprintln!("error: {e}");
                ExitCode::from(1)
            })?;
        }
        println!("Cleaned: {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(code) => code,
    }
}

use crate::error::{CliError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

/// Console level for a rank; only rank 0 reports below `WARN`.
pub fn level_for(verbosity: u8, quiet: bool, rank: usize) -> LevelFilter {
    let level = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    if rank == 0 {
        level
    } else {
        level.min(LevelFilter::WARN)
    }
}

/// `run.log` stays `run.log` on rank 0 and becomes `run.rank3.log` on rank 3.
pub fn log_file_for_rank(path: &Path, rank: usize) -> PathBuf {
    if rank == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.rank{}.{}", stem, rank, ext.to_string_lossy()),
        None => format!("{}.rank{}", stem, rank),
    };
    path.with_file_name(name)
}

pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: Option<PathBuf>,
    rank: usize,
) -> Result<()> {
    let level_filter = level_for(verbosity, quiet, rank);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(log_file_for_rank(&path, rank)).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

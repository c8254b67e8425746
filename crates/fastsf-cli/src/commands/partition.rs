use crate::cli::PartitionArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use fastsf::engine::partition::PartitionReport;
use tracing::{info, warn};

pub fn run(args: PartitionArgs) -> Result<()> {
    let sweep = PartialRunConfig::from_file(&args.config)?.merge_for_partition(&args)?;
    let grid = sweep
        .process_grid(args.ranks)
        .map_err(|e| CliError::Config(e.to_string()))?;
    info!(
        px = grid.px(),
        py = grid.py(),
        "Computing lag assignment for {} rank(s).",
        grid.size()
    );

    let report = PartitionReport::new(&sweep.geometry, &grid);
    if report.uneven_pairs() {
        warn!(
            imbalance = report.imbalance(),
            "Ranks own unequal numbers of index pairs."
        );
    }
    println!("{}", report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn partition_args(config: &std::path::Path, extra: &[&str]) -> PartitionArgs {
        let mut args = vec!["fastsf", "partition", "-c", config.to_str().unwrap()];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Partition(args) => args,
            _ => panic!("Expected 'partition' subcommand"),
        }
    }

    #[test]
    fn valid_decomposition_is_reported() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(
            &config_path,
            "[grid]\nnx = 16\nny = 16\nnz = 16\n[domain]\nlx = 1.0\nly = 1.0\nlz = 1.0\n\
             [structure-function]\nq1 = 2\nq2 = 2\n",
        )
        .unwrap();

        let args = partition_args(&config_path, &["-n", "8", "--px", "2"]);
        assert!(run(args).is_ok());
    }

    #[test]
    fn indivisible_decomposition_is_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(
            &config_path,
            "[program]\ntwo-dimensional = true\n[grid]\nnx = 12\nnz = 12\n\
             [domain]\nlx = 1.0\nlz = 1.0\n[structure-function]\nq1 = 2\nq2 = 2\n",
        )
        .unwrap();

        let args = partition_args(&config_path, &["-n", "4"]);
        assert!(matches!(run(args), Err(CliError::Config(_))));
    }
}

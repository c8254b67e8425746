use crate::cli::ComputeArgs;
use crate::config::{FieldSource, PartialRunConfig, RunConfig};
use crate::error::{CliError, Result};
use crate::process::Backend;
use crate::utils::progress::SweepProgressBar;
use fastsf::core::field::FieldSet;
use fastsf::core::io;
use fastsf::core::synthetic;
use fastsf::engine::config::SweepKind;
use fastsf::engine::progress::ProgressReporter;
use fastsf::workflows::validate;
use tracing::{info, warn};

pub fn run(args: ComputeArgs, backend: &Backend) -> Result<()> {
    let partial_config = PartialRunConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let fields = load_fields(&config)?;

    let reporter = if backend.is_root() {
        let display = SweepProgressBar::new();
        ProgressReporter::with_callback(display.callback())
    } else {
        ProgressReporter::new()
    };

    if backend.is_root() {
        println!(
            "Computing {} structure functions of orders {}..={} on {} rank(s)...",
            validate::label(config.sweep.kind, config.sweep.geometry.dimension()),
            config.sweep.orders.first(),
            config.sweep.orders.last(),
            backend.size()
        );
    }

    let Some(results) = backend.compute(&fields, &config.sweep, &reporter)? else {
        return Ok(());
    };
    drop(reporter);

    info!("Writing result grids to {:?}", &config.output_dir);
    let paths = results.write_csv(&config.output_dir)?;
    println!(
        "✓ Wrote {} result grid(s) to {}",
        paths.len(),
        config.output_dir.display()
    );

    if config.input == FieldSource::Synthetic {
        let summary = validate::run(&results);
        println!("{}", summary);
        if !summary.passed() {
            for report in summary.reports.iter().filter(|r| !r.passed()) {
                warn!(
                    quantity = %report.quantity,
                    max_error = report.max_error,
                    worst = ?report.worst,
                    "Analytic validation failed."
                );
            }
            return Err(CliError::Validation {
                max_error: summary.max_error(),
                label: summary.label,
            });
        }
    }

    Ok(())
}

fn load_fields(config: &RunConfig) -> Result<FieldSet> {
    let geometry = &config.sweep.geometry;
    match (&config.input, config.sweep.kind) {
        (FieldSource::Synthetic, SweepKind::Scalar) => Ok(synthetic::scalar_field(geometry)),
        (FieldSource::Synthetic, SweepKind::Vector { .. }) => Ok(synthetic::vector_field(geometry)),
        (FieldSource::Directory(dir), kind) => {
            Ok(io::load_fields(dir, geometry, kind.field_kind())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use fastsf::core::field::FieldKind;
    use fastsf::core::grid::{Dimension, Geometry};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const PLANAR_CONFIG: &str = r#"
        [program]
        two-dimensional = true

        [grid]
        nx = 8
        nz = 8

        [domain]
        lx = 7.0
        lz = 7.0

        [structure-function]
        q1 = 1
        q2 = 3

        [reduction]
        chunk-size = 5
    "#;

    fn compute_args(extra: &[&str]) -> ComputeArgs {
        let mut args = vec!["fastsf", "compute"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Compute(args) => args,
            _ => panic!("Expected 'compute' subcommand"),
        }
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn synthetic_run_writes_grids_and_passes_validation() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        let output = dir.path().join("out");
        fs::write(&config_path, PLANAR_CONFIG).unwrap();

        let args = compute_args(&[
            "-c",
            path_str(&config_path),
            "-o",
            path_str(&output),
            "--synthetic",
            "--px",
            "2",
        ]);
        run(args, &Backend::Local(4)).unwrap();

        for order in 1..=3 {
            assert!(output.join(format!("SF_Grid_pll{}.csv", order)).is_file());
            assert!(output.join(format!("SF_Grid_perp{}.csv", order)).is_file());
        }
    }

    #[test]
    fn directory_run_reads_component_files() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::write(&config_path, PLANAR_CONFIG).unwrap();

        let geometry = Geometry::two_d([8, 8], [7.0, 7.0]);
        let field = synthetic::scalar_field(&geometry);
        let paths = io::component_paths(&input, FieldKind::Scalar, Dimension::Two);
        io::csv::write_grid(&paths[0], Dimension::Two, field.components()[0].view()).unwrap();

        let args = compute_args(&[
            "-c",
            path_str(&config_path),
            "-i",
            path_str(&input),
            "-o",
            path_str(&output),
            "-S",
            "program.scalar=true",
        ]);
        run(args, &Backend::Single).unwrap();

        let grid = io::csv::read_grid(&output.join("SF_Grid_scalar2.csv"), Dimension::Two, &[4, 4])
            .unwrap();
        assert!((grid[[1, 2]] - 9.0).abs() < 1e-10);
        assert_eq!(grid[[0, 0]], 0.0);
    }

    #[test]
    fn missing_input_files_are_reported() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(&config_path, PLANAR_CONFIG).unwrap();

        let args = compute_args(&[
            "-c",
            path_str(&config_path),
            "-i",
            path_str(&dir.path().join("missing")),
        ]);
        assert!(matches!(
            run(args, &Backend::Single),
            Err(CliError::GridIo(_))
        ));
    }
}

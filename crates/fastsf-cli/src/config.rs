mod defaults;
mod models;

pub use defaults::DefaultsConfig;
pub use models::{FieldSource, RunConfig};

use crate::cli::{ComputeArgs, PartitionArgs};
use crate::error::{CliError, Result};
use fastsf::core::grid::Geometry;
use fastsf::engine::config::{SweepConfig, SweepConfigBuilder, SweepKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialProgramConfig {
    scalar: Option<bool>,
    #[serde(rename = "only-longitudinal")]
    only_longitudinal: Option<bool>,
    #[serde(rename = "two-dimensional")]
    two_dimensional: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGridConfig {
    nx: Option<usize>,
    ny: Option<usize>,
    nz: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialDomainConfig {
    lx: Option<f64>,
    ly: Option<f64>,
    lz: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialStructureFunctionConfig {
    q1: Option<i32>,
    q2: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialInputConfig {
    synthetic: Option<bool>,
    directory: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    directory: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialReductionConfig {
    #[serde(rename = "chunk-size")]
    chunk_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    #[serde(default)]
    program: PartialProgramConfig,
    #[serde(default)]
    grid: PartialGridConfig,
    #[serde(default)]
    domain: PartialDomainConfig,
    #[serde(rename = "structure-function", default)]
    structure_function: PartialStructureFunctionConfig,
    #[serde(default)]
    input: PartialInputConfig,
    #[serde(default)]
    output: PartialOutputConfig,
    #[serde(default)]
    reduction: PartialReductionConfig,
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::Config(format!(
            "`{}` is required either in the config file or via --set.",
            key
        ))
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", expected, key, value))
    })
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn merge_with_cli(mut self, args: &ComputeArgs) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let synthetic = args.synthetic || self.input.synthetic.unwrap_or(defaults.synthetic);
        let input = if synthetic {
            FieldSource::Synthetic
        } else {
            FieldSource::Directory(
                args.input
                    .clone()
                    .or(self.input.directory.take())
                    .unwrap_or_else(|| PathBuf::from(defaults.input_directory)),
            )
        };
        let output_dir = args
            .output
            .clone()
            .or(self.output.directory.take())
            .unwrap_or_else(|| PathBuf::from(defaults.output_directory));

        Ok(RunConfig {
            sweep: self.build_sweep_config(args.px)?,
            input,
            output_dir,
        })
    }

    pub fn merge_for_partition(mut self, args: &PartitionArgs) -> Result<SweepConfig> {
        self.apply_set_values(&args.set_values)?;
        self.build_sweep_config(args.px)
    }

    fn build_sweep_config(&self, px: Option<usize>) -> Result<SweepConfig> {
        let defaults = DefaultsConfig::default();
        let program = &self.program;
        let two_dimensional = program.two_dimensional.unwrap_or(defaults.two_dimensional);

        let nx = required(self.grid.nx, "grid.nx")?;
        let nz = required(self.grid.nz, "grid.nz")?;
        let lx = required(self.domain.lx, "domain.lx")?;
        let lz = required(self.domain.lz, "domain.lz")?;
        let geometry = if two_dimensional {
            Geometry::two_d([nx, nz], [lx, lz])
        } else {
            let ny = required(self.grid.ny, "grid.ny")?;
            let ly = required(self.domain.ly, "domain.ly")?;
            Geometry::three_d([nx, ny, nz], [lx, ly, lz])
        };

        let kind = if program.scalar.unwrap_or(defaults.scalar) {
            SweepKind::Scalar
        } else {
            SweepKind::Vector {
                transverse: !program
                    .only_longitudinal
                    .unwrap_or(defaults.only_longitudinal),
            }
        };

        let q1 = required(self.structure_function.q1, "structure-function.q1")?;
        let q2 = required(self.structure_function.q2, "structure-function.q2")?;

        SweepConfigBuilder::new()
            .geometry(geometry)
            .kind(kind)
            .orders(q1, q2)
            .px(px.unwrap_or(defaults.px))
            .chunk_size(self.reduction.chunk_size)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "grid.nx" => self.grid.nx = Some(parse_value(key, value_str, "integer")?),
                "grid.ny" => self.grid.ny = Some(parse_value(key, value_str, "integer")?),
                "grid.nz" => self.grid.nz = Some(parse_value(key, value_str, "integer")?),
                "domain.lx" => self.domain.lx = Some(parse_value(key, value_str, "float")?),
                "domain.ly" => self.domain.ly = Some(parse_value(key, value_str, "float")?),
                "domain.lz" => self.domain.lz = Some(parse_value(key, value_str, "float")?),
                "structure-function.q1" => {
                    self.structure_function.q1 = Some(parse_value(key, value_str, "integer")?)
                }
                "structure-function.q2" => {
                    self.structure_function.q2 = Some(parse_value(key, value_str, "integer")?)
                }
                "program.scalar" => {
                    self.program.scalar = Some(parse_value(key, value_str, "boolean")?)
                }
                "program.only-longitudinal" => {
                    self.program.only_longitudinal = Some(parse_value(key, value_str, "boolean")?)
                }
                "program.two-dimensional" => {
                    self.program.two_dimensional = Some(parse_value(key, value_str, "boolean")?)
                }
                "input.synthetic" => {
                    self.input.synthetic = Some(parse_value(key, value_str, "boolean")?)
                }
                "input.directory" => self.input.directory = Some(PathBuf::from(value_str)),
                "output.directory" => self.output.directory = Some(PathBuf::from(value_str)),
                "reduction.chunk-size" => {
                    self.reduction.chunk_size = Some(parse_value(key, value_str, "integer")?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use fastsf::core::grid::Dimension;
    use std::fs;
    use tempfile::tempdir;

    const FULL_CONFIG: &str = r#"
        [program]
        scalar = false
        only-longitudinal = false
        two-dimensional = false

        [grid]
        nx = 8
        ny = 8
        nz = 8

        [domain]
        lx = 7.0
        ly = 7.0
        lz = 7.0

        [structure-function]
        q1 = 2
        q2 = 4

        [input]
        directory = "fields"
    "#;

    fn compute_args(config_path: &Path, extra: &[&str]) -> ComputeArgs {
        let mut args = vec!["fastsf", "compute", "-c", config_path.to_str().unwrap()];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Compute(args) => args,
            _ => panic!("Expected 'compute' subcommand"),
        }
    }

    #[test]
    fn load_from_file_and_merge_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let run = PartialRunConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&compute_args(&config_path, &[]))
            .unwrap();

        assert_eq!(run.sweep.geometry.dimension(), Dimension::Three);
        assert_eq!(run.sweep.geometry.extents(), &[8, 8, 8]);
        assert_eq!(run.sweep.kind, SweepKind::Vector { transverse: true });
        assert_eq!(run.sweep.orders.first(), 2);
        assert_eq!(run.sweep.orders.last(), 4);
        assert_eq!(run.sweep.px, 1);
        assert_eq!(run.sweep.chunk_size, None);
        assert_eq!(run.input, FieldSource::Directory(PathBuf::from("fields")));
        assert_eq!(run.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn cli_args_override_file_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let args = compute_args(
            &config_path,
            &["--synthetic", "-o", "results", "--px", "2"],
        );
        let run = PartialRunConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(run.input, FieldSource::Synthetic);
        assert_eq!(run.output_dir, PathBuf::from("results"));
        assert_eq!(run.sweep.px, 2);
    }

    #[test]
    fn set_values_override_file_and_select_planar_scalar_run() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("para.toml");
        fs::write(&config_path, FULL_CONFIG).unwrap();

        let args = compute_args(
            &config_path,
            &[
                "-S",
                "program.two-dimensional=true",
                "-S",
                "program.scalar=true",
                "-S",
                "grid.nz=16",
                "-S",
                "structure-function.q1=-1",
                "-S",
                "reduction.chunk-size=128",
            ],
        );
        let run = PartialRunConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(run.sweep.geometry.dimension(), Dimension::Two);
        assert_eq!(run.sweep.geometry.extents(), &[8, 16]);
        assert_eq!(run.sweep.kind, SweepKind::Scalar);
        assert_eq!(run.sweep.orders.first(), -1);
        assert_eq!(run.sweep.chunk_size, Some(128));
    }

    #[test]
    fn planar_runs_do_not_need_y_values() {
        let config = PartialRunConfig::from_toml(
            r#"
            [program]
            two-dimensional = true
            only-longitudinal = true
            [grid]
            nx = 4
            nz = 4
            [domain]
            lx = 1.0
            lz = 1.0
            [structure-function]
            q1 = 1
            q2 = 1
            "#,
        )
        .unwrap();
        let sweep = config.build_sweep_config(None).unwrap();
        assert_eq!(sweep.kind, SweepKind::Vector { transverse: false });
    }

    #[test]
    fn missing_required_field_returns_error() {
        let config = PartialRunConfig::from_toml("[grid]\nnx = 8\nnz = 8\n").unwrap();
        match config.build_sweep_config(None) {
            Err(CliError::Config(msg)) => assert!(msg.contains("domain.lx")),
            other => panic!("expected a config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PartialRunConfig::from_toml("[grid]\nnw = 8\n").is_err());

        let mut config = PartialRunConfig::default();
        let result = config.apply_set_values(&["grid.nw=3".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));
        let result = config.apply_set_values(&["grid.nx".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));
        let result = config.apply_set_values(&["grid.nx=eight".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_surface_engine_validation() {
        let mut config = PartialRunConfig::from_toml(FULL_CONFIG).unwrap();
        config
            .apply_set_values(&["structure-function.q1=5".to_string()])
            .unwrap();
        match config.build_sweep_config(None) {
            Err(CliError::Config(msg)) => assert!(msg.contains("q1 = 5")),
            other => panic!("expected a config error, got {:?}", other.map(|_| ())),
        }
    }
}

use fastsf::engine::config::SweepConfig;
use std::path::PathBuf;

/// Where the field store is populated from.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    Synthetic,
    Directory(PathBuf),
}

pub struct RunConfig {
    pub sweep: SweepConfig,
    pub input: FieldSource,
    pub output_dir: PathBuf,
}

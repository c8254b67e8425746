use thiserror::Error;

use super::comm::CommError;
use super::config::ConfigError;
use crate::core::field::FieldError;
use crate::core::grid::Lag;
use crate::core::io::GridIoError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Process group failure: {source}")]
    Comm {
        #[from]
        source: CommError,
    },

    #[error("Field does not match the grid: {source}")]
    Field {
        #[from]
        source: FieldError,
    },

    #[error("Grid I/O failed: {source}")]
    GridIo {
        #[from]
        source: GridIoError,
    },

    #[error("Contribution for lag {lag} and order index {order_index} lies outside the result grid")]
    AssemblyOutOfBounds { lag: Lag, order_index: usize },

    #[error("Lag {lag} and order index {order_index} received more than one contribution")]
    DuplicateContribution { lag: Lag, order_index: usize },

    #[error("{missing} result cell(s) received no contribution, first at lag {first}")]
    MissingContribution { missing: usize, first: Lag },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

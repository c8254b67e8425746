use crate::cli::BackendArgs;
use crate::error::{CliError, Result};
use fastsf::core::field::FieldSet;
use fastsf::engine::comm::SingleProcess;
#[cfg(feature = "mpi")]
use fastsf::engine::comm::{Communicator, MpiComm};
use fastsf::engine::config::SweepConfig;
use fastsf::engine::error::EngineError;
use fastsf::engine::progress::ProgressReporter;
use fastsf::engine::results::StructureFunctions;
use fastsf::workflows::compute;
use tracing::debug;

/// The process group a command runs on.
pub enum Backend {
    /// One rank, the current process.
    Single,
    /// A group of ranks simulated by threads of the current process.
    Local(usize),
    /// The world communicator of the surrounding MPI job.
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
}

impl Backend {
    pub fn from_args(args: &BackendArgs) -> Result<Self> {
        if args.mpi {
            return Self::mpi();
        }
        match args.ranks {
            None | Some(1) => Ok(Backend::Single),
            Some(0) => Err(CliError::Argument(
                "--ranks must be at least 1".to_string(),
            )),
            Some(ranks) => Ok(Backend::Local(ranks)),
        }
    }

    #[cfg(feature = "mpi")]
    fn mpi() -> Result<Self> {
        let comm = MpiComm::initialize().map_err(EngineError::from)?;
        debug!(rank = comm.rank(), size = comm.size(), "Joined MPI job.");
        Ok(Backend::Mpi(comm))
    }

    #[cfg(not(feature = "mpi"))]
    fn mpi() -> Result<Self> {
        Err(CliError::Argument(
            "--mpi requires fastsf to be built with the `mpi` feature".to_string(),
        ))
    }

    /// Rank of this process; thread groups report as rank 0 since they share the process.
    pub fn rank(&self) -> usize {
        match self {
            Backend::Single | Backend::Local(_) => 0,
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => comm.rank(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Backend::Single => 1,
            Backend::Local(ranks) => *ranks,
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => comm.size(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Terminates the MPI job; a no-op for in-process groups, whose ranks have already joined.
    #[cfg_attr(not(feature = "mpi"), allow(unused_variables))]
    pub fn abort(&self, code: i32) {
        match self {
            Backend::Single | Backend::Local(_) => {}
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => comm.abort(code),
        }
    }

    /// Runs the computation on this backend. Only the root obtains `Some` results.
    pub fn compute(
        &self,
        fields: &FieldSet,
        config: &SweepConfig,
        reporter: &ProgressReporter,
    ) -> std::result::Result<Option<StructureFunctions>, EngineError> {
        debug!(ranks = self.size(), "Dispatching computation.");
        match self {
            Backend::Single => compute::run(&SingleProcess, fields, config, reporter),
            Backend::Local(ranks) => compute::run_local(*ranks, fields, config, reporter).map(Some),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => compute::run(comm, fields, config, reporter),
        }
    }
}

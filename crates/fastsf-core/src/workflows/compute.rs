use crate::core::field::FieldSet;
use crate::engine::comm::{CommError, Communicator, LocalGroup};
use crate::engine::config::{ConfigError, SweepConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reduction::{self, ReductionPlan};
use crate::engine::results::{Assembler, StructureFunctions};
use crate::engine::sweep::SweepEngine;
use std::time::Instant;
use tracing::{info, instrument};

/// Runs the computation on one rank of `comm`.
///
/// Every rank of the group must call this with the same fields and configuration. The root
/// returns the assembled structure functions; every other rank returns `None`.
#[instrument(skip_all, name = "compute_workflow", fields(rank = comm.rank(), ranks = comm.size()))]
pub fn run<C>(
    comm: &C,
    fields: &FieldSet,
    config: &SweepConfig,
    reporter: &ProgressReporter,
) -> Result<Option<StructureFunctions>, EngineError>
where
    C: Communicator + ?Sized,
{
    let started = Instant::now();

    // === Phase 0: Validation and Partitioning ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let grid = config.process_grid(comm.size())?;
    let engine = SweepEngine::new(fields, config)?;
    let assignment = grid.assignment(&config.geometry, comm.rank());
    let plan = ReductionPlan::new(config, &grid);
    if comm.is_root() {
        info!(
            dimension = %config.geometry.dimension(),
            extents = ?config.geometry.extents(),
            q1 = config.orders.first(),
            q2 = config.orders.last(),
            px = grid.px(),
            py = grid.py(),
            "Starting structure-function computation."
        );
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Displacement Sweep ===
    reporter.report(Progress::PhaseStart { name: "Sweep" });
    let sweep_started = Instant::now();
    let results = engine.run(&assignment, reporter);
    info!(
        lags = results.len(),
        elapsed = ?sweep_started.elapsed(),
        "Time elapsed for the parallel sweep."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Reduction and Assembly ===
    reporter.report(Progress::PhaseStart { name: "Reduction" });
    let mut assembler = comm.is_root().then(|| Assembler::new(config));
    reduction::gather_contributions(comm, &plan, &results, assembler.as_mut())?;
    let output = assembler.map(Assembler::finish).transpose()?;
    reporter.report(Progress::PhaseFinish);

    if comm.is_root() {
        info!(
            elapsed = ?started.elapsed(),
            "Structure-function computation finished."
        );
    }
    Ok(output)
}

/// Runs the computation on `ranks` threads of the current process.
///
/// Only rank 0 reports progress. When several ranks fail, the first error that is not a
/// consequence of the group being aborted is returned.
pub fn run_local(
    ranks: usize,
    fields: &FieldSet,
    config: &SweepConfig,
    reporter: &ProgressReporter,
) -> Result<StructureFunctions, EngineError> {
    if ranks == 0 {
        return Err(ConfigError::EmptyProcessGroup.into());
    }

    let outcomes = LocalGroup::new(ranks).run(|comm| {
        let silent = ProgressReporter::new();
        let reporter = if comm.is_root() { reporter } else { &silent };
        run(comm, fields, config, reporter)
    });

    let mut output = None;
    let mut aborted = None;
    for outcome in outcomes {
        match outcome {
            Ok(Some(results)) => output = Some(results),
            Ok(None) => {}
            Err(EngineError::Comm {
                source: CommError::Aborted,
            }) => {
                aborted.get_or_insert(CommError::Aborted);
            }
            Err(error) => return Err(error),
        }
    }

    match (output, aborted) {
        (_, Some(error)) => Err(error.into()),
        (Some(results), None) => Ok(results),
        (None, None) => Err(EngineError::Internal(
            "root rank finished without results".to_string(),
        )),
    }
}

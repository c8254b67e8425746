//! Batched gathering of per-rank contributions to the root.
//!
//! Every `(lag, order)` a rank evaluated becomes one record: five integers
//! `(valid, x, y, z, order_index)` travelling in a `u64` buffer and `width` values travelling
//! in an `f64` buffer. All ranks pad their record list to the same length and send it in the
//! same number of rounds, so collective call counts match without any extra handshake.

use super::comm::{Communicator, ROOT};
use super::config::SweepConfig;
use super::error::EngineError;
use super::partition::ProcessGrid;
use super::results::Assembler;
use super::sweep::LagResult;
use crate::core::grid::Lag;
use tracing::{debug, instrument};

/// Integers per record: validity flag, lag coordinates and order index.
pub const RECORD_FIELDS: usize = 5;

/// One value set for a single `(lag, order)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution<'a> {
    pub lag: Lag,
    pub order_index: usize,
    pub values: &'a [f64],
}

/// Splits order-major lag results into per-order contributions.
pub fn contributions(results: &[LagResult], width: usize) -> Vec<Contribution<'_>> {
    results
        .iter()
        .flat_map(|result| {
            result
                .values
                .chunks_exact(width)
                .enumerate()
                .map(move |(order_index, values)| Contribution {
                    lag: result.lag,
                    order_index,
                    values,
                })
        })
        .collect()
}

/// Round structure shared by every rank of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionPlan {
    /// Records every rank sends, padding included.
    pub records: usize,
    /// Records per rank and round.
    pub chunk: usize,
    /// Values per record.
    pub width: usize,
}

impl ReductionPlan {
    pub fn new(config: &SweepConfig, grid: &ProcessGrid) -> Self {
        let records = grid.max_lag_count(&config.geometry) * config.orders.len();
        let chunk = config.chunk_size.unwrap_or(records).clamp(1, records.max(1));
        Self {
            records,
            chunk,
            width: config.kind.quantities().len(),
        }
    }

    pub fn rounds(&self) -> usize {
        self.records.div_ceil(self.chunk)
    }
}

fn encode_round(
    records: &[Contribution<'_>],
    range: std::ops::Range<usize>,
    width: usize,
) -> (Vec<u64>, Vec<f64>) {
    let mut meta = Vec::with_capacity(range.len() * RECORD_FIELDS);
    let mut values = Vec::with_capacity(range.len() * width);
    for i in range {
        match records.get(i) {
            Some(record) => {
                let Lag { x, y, z } = record.lag;
                meta.extend([1, x as u64, y as u64, z as u64, record.order_index as u64]);
                values.extend_from_slice(record.values);
            }
            None => {
                meta.extend([0; RECORD_FIELDS]);
                values.extend(std::iter::repeat_n(0.0, width));
            }
        }
    }
    (meta, values)
}

fn place_round(
    assembler: &mut Assembler,
    meta: &[u64],
    values: &[f64],
    expected_records: usize,
    width: usize,
) -> Result<(), EngineError> {
    if meta.len() != expected_records * RECORD_FIELDS || values.len() != expected_records * width
    {
        return Err(EngineError::Internal(format!(
            "gathered {} metadata and {} value entries for {} records",
            meta.len(),
            values.len(),
            expected_records
        )));
    }

    for (record, values) in meta
        .chunks_exact(RECORD_FIELDS)
        .zip(values.chunks_exact(width))
    {
        match record[0] {
            0 => continue,
            1 => {
                let lag = Lag::new(record[1] as usize, record[2] as usize, record[3] as usize);
                assembler.place(lag, record[4] as usize, values)?;
            }
            flag => {
                return Err(EngineError::Internal(format!(
                    "invalid record flag {flag}"
                )));
            }
        }
    }
    Ok(())
}

/// Sends this rank's results to the root and, on the root, places everything gathered.
///
/// Must be called by every rank of `comm` with the same `plan`. `assembler` is required on
/// the root and ignored elsewhere.
#[instrument(skip_all, name = "reduction_task", fields(rank = comm.rank()))]
pub fn gather_contributions<C>(
    comm: &C,
    plan: &ReductionPlan,
    results: &[LagResult],
    mut assembler: Option<&mut Assembler>,
) -> Result<(), EngineError>
where
    C: Communicator + ?Sized,
{
    let records = contributions(results, plan.width);
    if records.len() > plan.records {
        return Err(EngineError::Internal(format!(
            "rank {} holds {} records but the plan allows {}",
            comm.rank(),
            records.len(),
            plan.records
        )));
    }
    debug!(
        records = records.len(),
        padded = plan.records,
        rounds = plan.rounds(),
        "Gathering contributions."
    );

    for round in 0..plan.rounds() {
        let start = round * plan.chunk;
        let end = (start + plan.chunk).min(plan.records);
        let (meta, values) = encode_round(&records, start..end, plan.width);

        let gathered_meta = comm.gather_u64(&meta, ROOT)?;
        let gathered_values = comm.gather_f64(&values, ROOT)?;

        match (gathered_meta, gathered_values, assembler.as_deref_mut()) {
            (Some(meta), Some(values), Some(assembler)) => place_round(
                assembler,
                &meta,
                &values,
                (end - start) * comm.size(),
                plan.width,
            )?,
            (None, None, _) => {}
            (Some(_), Some(_), None) => {
                return Err(EngineError::Internal(
                    "root rank has no assembler".to_string(),
                ));
            }
            _ => {
                return Err(EngineError::Internal(
                    "only one of the paired gathers delivered data".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::Geometry;
    use crate::core::synthetic;
    use crate::engine::comm::{LocalGroup, SingleProcess};
    use crate::engine::config::{SweepConfigBuilder, SweepKind};
    use crate::engine::progress::ProgressReporter;
    use crate::engine::results::{Quantity, StructureFunctions};
    use crate::engine::sweep::SweepEngine;

    fn config(chunk_size: Option<usize>) -> SweepConfig {
        SweepConfigBuilder::new()
            .geometry(Geometry::three_d([8, 8, 4], [7.0, 7.0, 3.0]))
            .kind(SweepKind::Vector { transverse: true })
            .orders(1, 3)
            .px(2)
            .chunk_size(chunk_size)
            .build()
            .unwrap()
    }

    fn reduce(ranks: usize, config: &SweepConfig) -> StructureFunctions {
        let fields = synthetic::vector_field(&config.geometry);
        let grid = config.process_grid(ranks).unwrap();
        let plan = ReductionPlan::new(config, &grid);
        let mut outcomes = LocalGroup::new(ranks).run(|comm| {
            let engine = SweepEngine::new(&fields, config)?;
            let assignment = grid.assignment(&config.geometry, comm.rank());
            let results = engine.run(&assignment, &ProgressReporter::new());
            let mut assembler = comm.is_root().then(|| Assembler::new(config));
            gather_contributions(comm, &plan, &results, assembler.as_mut())?;
            assembler.map(Assembler::finish).transpose()
        });
        outcomes.swap_remove(0).unwrap().unwrap()
    }

    #[test]
    fn contributions_split_values_per_order() {
        let results = vec![LagResult {
            lag: Lag::new(1, 0, 2),
            values: vec![1.0, 2.0, 3.0, 4.0],
        }];
        let records = contributions(&results, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].order_index, 1);
        assert_eq!(records[1].values, &[3.0, 4.0]);
    }

    #[test]
    fn plan_rounds_cover_padded_records() {
        let config = config(Some(5));
        let grid = config.process_grid(2).unwrap();
        let plan = ReductionPlan::new(&config, &grid);
        // Half-domain 4 x 4 x 2 split over two ranks, three orders each.
        assert_eq!(plan.records, 16 * 3);
        assert_eq!(plan.rounds(), 10);
        assert_eq!(plan.width, 2);

        let single = ReductionPlan::new(&self::config(None), &grid);
        assert_eq!(single.rounds(), 1);
    }

    #[test]
    fn padding_records_are_skipped_by_the_root() {
        let records = [Contribution {
            lag: Lag::new(0, 0, 1),
            order_index: 0,
            values: &[2.0],
        }];
        let (meta, values) = encode_round(&records, 0..3, 1);
        assert_eq!(meta.len(), 3 * RECORD_FIELDS);
        assert_eq!(&meta[..RECORD_FIELDS], &[1, 0, 0, 1, 0]);
        assert!(meta[RECORD_FIELDS..].iter().all(|&v| v == 0));
        assert_eq!(values, vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn chunked_reduction_matches_single_round() {
        let single = reduce(2, &config(None));
        let chunked = reduce(2, &config(Some(7)));
        assert_eq!(single, chunked);
        assert!(
            single
                .value(Quantity::Longitudinal, Lag::new(1, 1, 1), 2)
                .is_some_and(|v| v > 0.0)
        );
    }

    #[test]
    fn single_process_reduction_fills_every_cell() {
        let config = SweepConfigBuilder::new()
            .geometry(Geometry::three_d([8, 8, 4], [7.0, 7.0, 3.0]))
            .kind(SweepKind::Vector { transverse: true })
            .orders(1, 3)
            .chunk_size(Some(3))
            .build()
            .unwrap();
        let fields = synthetic::vector_field(&config.geometry);
        let grid = config.process_grid(1).unwrap();
        let plan = ReductionPlan::new(&config, &grid);
        let engine = SweepEngine::new(&fields, &config).unwrap();
        let results = engine.run(&grid.assignment(&config.geometry, 0), &ProgressReporter::new());
        let mut assembler = Assembler::new(&config);
        gather_contributions(&SingleProcess, &plan, &results, Some(&mut assembler)).unwrap();
        let output = assembler.finish().unwrap();
        assert_eq!(output, reduce(2, &self::config(None)));
    }

    #[test]
    fn root_without_assembler_is_an_error() {
        let config = config(None);
        let grid = ProcessGrid::new(&config.geometry, 1, 1).unwrap();
        let plan = ReductionPlan::new(&config, &grid);
        let result = gather_contributions(&SingleProcess, &plan, &[], None);
        assert!(matches!(result, Err(EngineError::Internal(_))));
    }
}

use super::config::{OrderRange, SweepConfig, SweepKind};
use super::error::EngineError;
use super::partition::Assignment;
use super::progress::{Progress, ProgressReporter};
use crate::core::field::FieldSet;
use crate::core::grid::{Geometry, Lag};
use ndarray::{ArrayD, ArrayViewD, Slice, Zip};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Structure-function values at one lag.
///
/// `values` is order-major: for every order of the range, one value per quantity of the sweep
/// kind, in [`SweepKind::quantities`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct LagResult {
    pub lag: Lag,
    pub values: Vec<f64>,
}

/// Evaluates structure functions at single lags of a borrowed field.
pub struct SweepEngine<'a> {
    fields: &'a FieldSet,
    geometry: &'a Geometry,
    kind: SweepKind,
    orders: OrderRange,
}

impl<'a> SweepEngine<'a> {
    pub fn new(fields: &'a FieldSet, config: &'a SweepConfig) -> Result<Self, EngineError> {
        fields.expect_kind(config.kind.field_kind())?;
        fields.check_against(&config.geometry)?;
        Ok(Self {
            fields,
            geometry: &config.geometry,
            kind: config.kind,
            orders: config.orders,
        })
    }

    /// Number of values per order.
    #[inline]
    pub fn width(&self) -> usize {
        self.kind.quantities().len()
    }

    /// Evaluates every lag of an assignment, preserving assignment order.
    #[instrument(skip_all, name = "sweep_task", fields(rank = assignment.rank()))]
    pub fn run(&self, assignment: &Assignment, reporter: &ProgressReporter) -> Vec<LagResult> {
        let lags: Vec<Lag> = assignment.lags().collect();
        debug!(lags = lags.len(), "Sweeping owned lags.");
        reporter.report(Progress::TaskStart {
            total_steps: lags.len() as u64,
        });

        #[cfg(not(feature = "parallel"))]
        let iterator = lags.iter();

        #[cfg(feature = "parallel")]
        let iterator = lags.par_iter();

        let results = iterator
            .map(|&lag| {
                let result = self.evaluate(lag);
                reporter.report(Progress::TaskIncrement);
                result
            })
            .collect();

        reporter.report(Progress::TaskFinish);
        results
    }

    pub fn evaluate(&self, lag: Lag) -> LagResult {
        let offsets = self.geometry.lag_indices(lag);
        let differences: Vec<ArrayD<f64>> = self
            .fields
            .components()
            .iter()
            .map(|component| increment(component.view(), &offsets))
            .collect();

        let values = match self.kind {
            SweepKind::Scalar => self.moments(&[&differences[0]]),
            SweepKind::Vector { transverse } => {
                let l = self.geometry.physical_lag(lag);
                let r = l.iter().map(|c| c * c).sum::<f64>().sqrt();
                if r == 0.0 {
                    vec![0.0; self.orders.len() * self.width()]
                } else {
                    let unit: Vec<f64> = l.iter().map(|c| c / r).collect();
                    let longitudinal = project(&differences, &unit);
                    if transverse {
                        let transverse = reject(&differences, &longitudinal, &unit);
                        self.moments(&[&longitudinal, &transverse])
                    } else {
                        self.moments(&[&longitudinal])
                    }
                }
            }
        };

        LagResult { lag, values }
    }

    fn moments(&self, quantities: &[&ArrayD<f64>]) -> Vec<f64> {
        self.orders
            .iter()
            .flat_map(move |order| {
                quantities
                    .iter()
                    .map(move |increments| mean_power(increments, order as f64))
            })
            .collect()
    }
}

/// `f(i + offset) - f(i)` over the overlap window of the field and its shifted copy.
fn increment(field: ArrayViewD<f64>, offsets: &[usize]) -> ArrayD<f64> {
    let shifted = field.slice_each_axis(|axis| Slice::from(offsets[axis.axis.index()]..));
    let base = field.slice_each_axis(|axis| Slice::from(..axis.len - offsets[axis.axis.index()]));
    &shifted - &base
}

/// Component of the increment along the unit lag vector.
fn project(differences: &[ArrayD<f64>], unit: &[f64]) -> ArrayD<f64> {
    let mut longitudinal = ArrayD::zeros(differences[0].raw_dim());
    for (difference, &u) in differences.iter().zip(unit) {
        longitudinal.scaled_add(u, difference);
    }
    longitudinal
}

/// Magnitude of the increment with its longitudinal part removed.
fn reject(differences: &[ArrayD<f64>], longitudinal: &ArrayD<f64>, unit: &[f64]) -> ArrayD<f64> {
    let mut squared = ArrayD::zeros(longitudinal.raw_dim());
    for (difference, &u) in differences.iter().zip(unit) {
        Zip::from(&mut squared)
            .and(difference)
            .and(longitudinal)
            .for_each(|s, &d, &pll| {
                let residual = d - pll * u;
                *s += residual * residual;
            });
    }
    squared.mapv_inplace(f64::sqrt);
    squared
}

fn mean_power(values: &ArrayD<f64>, order: f64) -> f64 {
    values.iter().map(|v| v.powf(order)).sum::<f64>() / values.len() as f64
}

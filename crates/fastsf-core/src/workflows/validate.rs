//! Checks computed structure functions of the linear synthetic fields against their closed
//! forms: `|l|^q` (longitudinal), `0` (transverse) and `(Σ l_i)^q` (scalar).

use crate::core::grid::{Dimension, Geometry, Lag};
use crate::engine::config::SweepKind;
use crate::engine::results::{Quantity, StructureFunctions};
use std::fmt;
use tracing::{info, instrument, warn};

/// Largest accepted error, relative where the lag is non-degenerate and absolute otherwise.
pub const TOLERANCE: f64 = 1e-10;

/// Closed-form value of a quantity at a lag for the linear synthetic fields.
pub fn analytic_value(quantity: Quantity, geometry: &Geometry, lag: Lag, order: i32) -> f64 {
    let l = geometry.physical_lag(lag);
    match quantity {
        Quantity::Longitudinal => l.iter().map(|c| c * c).sum::<f64>().powf(order as f64 / 2.0),
        Quantity::Transverse => 0.0,
        Quantity::Scalar => l.iter().sum::<f64>().powf(order as f64),
    }
}

/// Error of a computed value, compared as the synthetic test mode does.
fn cell_error(quantity: Quantity, geometry: &Geometry, lag: Lag, order: i32, computed: f64) -> f64 {
    let l = geometry.physical_lag(lag);
    let magnitude = match quantity {
        Quantity::Longitudinal => l.iter().map(|c| c * c).sum::<f64>(),
        Quantity::Transverse => 0.0,
        Quantity::Scalar => l.iter().sum::<f64>().abs(),
    };
    if magnitude > TOLERANCE {
        let expected = analytic_value(quantity, geometry, lag, order);
        ((computed - expected) / expected).abs()
    } else {
        computed.abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub quantity: Quantity,
    pub max_error: f64,
    /// Lag and order of the largest error.
    pub worst: Option<(Lag, i32)>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.max_error <= TOLERANCE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    /// `VECTOR_3D`, `SCALAR_2D` and so on.
    pub label: String,
    pub reports: Vec<ValidationReport>,
}

impl ValidationSummary {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(ValidationReport::passed)
    }

    pub fn max_error(&self) -> f64 {
        self.reports
            .iter()
            .map(|r| r.max_error)
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() {
            "TEST_PASSED"
        } else {
            "TEST_FAILED"
        };
        write!(
            f,
            "{}: {}\nMAXIMUM RELATIVE ERROR: {:e}",
            self.label,
            status,
            self.max_error()
        )
    }
}

pub fn label(kind: SweepKind, dimension: Dimension) -> String {
    let field = match kind {
        SweepKind::Scalar => "SCALAR",
        SweepKind::Vector { .. } => "VECTOR",
    };
    format!("{}_{}", field, dimension)
}

#[instrument(skip_all, name = "validation_workflow")]
pub fn run(results: &StructureFunctions) -> ValidationSummary {
    let geometry = results.geometry();
    let reports = results
        .grids()
        .iter()
        .map(|grid| {
            let mut report = ValidationReport {
                quantity: grid.quantity(),
                max_error: 0.0,
                worst: None,
            };
            for order in results.orders().iter() {
                let Some(view) = grid.order_view(order) else {
                    continue;
                };
                for (index, &computed) in view.indexed_iter() {
                    let indices: Vec<usize> = (0..geometry.ndim()).map(|a| index[a]).collect();
                    let lag = geometry.lag_from_indices(&indices);
                    let error = cell_error(grid.quantity(), geometry, lag, order, computed);
                    // NaN errors must fail the check.
                    if error.is_nan() || error > report.max_error {
                        report.max_error = if error.is_nan() { f64::INFINITY } else { error };
                        report.worst = Some((lag, order));
                    }
                }
            }
            report
        })
        .collect();

    let summary = ValidationSummary {
        label: label(results.kind(), geometry.dimension()),
        reports,
    };
    if summary.passed() {
        info!(label = %summary.label, max_error = summary.max_error(), "Analytic validation passed.");
    } else {
        warn!(label = %summary.label, max_error = summary.max_error(), "Analytic validation failed.");
    }
    summary
}

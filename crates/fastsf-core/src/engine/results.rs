use super::config::{OrderRange, SweepConfig, SweepKind};
use super::error::EngineError;
use crate::core::grid::{Dimension, Geometry, Lag};
use crate::core::io::{GridIoError, csv};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// A structure-function flavour stored as its own result grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Longitudinal,
    Transverse,
    Scalar,
}

impl Quantity {
    pub fn file_stem(self) -> &'static str {
        match self {
            Quantity::Longitudinal => "SF_Grid_pll",
            Quantity::Transverse => "SF_Grid_perp",
            Quantity::Scalar => "SF_Grid_scalar",
        }
    }

    /// Output file name for one order, e.g. `SF_Grid_pll2.csv`.
    pub fn file_name(self, order: i32) -> String {
        format!("{}{}.csv", self.file_stem(), order)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Longitudinal => "longitudinal",
            Quantity::Transverse => "transverse",
            Quantity::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// Values of one quantity over the half-domain, with the order as the trailing axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGrid {
    quantity: Quantity,
    orders: OrderRange,
    data: ArrayD<f64>,
}

impl ResultGrid {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// The half-domain slice for one order.
    pub fn order_view(&self, order: i32) -> Option<ArrayViewD<'_, f64>> {
        let index = self.orders.index_of(order)?;
        Some(self.data.index_axis(Axis(self.data.ndim() - 1), index))
    }
}

/// The assembled output of a computation, owned by the root rank.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureFunctions {
    geometry: Geometry,
    kind: SweepKind,
    orders: OrderRange,
    grids: Vec<ResultGrid>,
}

impl StructureFunctions {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn kind(&self) -> SweepKind {
        self.kind
    }

    #[inline]
    pub fn orders(&self) -> OrderRange {
        self.orders
    }

    pub fn grids(&self) -> &[ResultGrid] {
        &self.grids
    }

    pub fn grid(&self, quantity: Quantity) -> Option<&ResultGrid> {
        self.grids.iter().find(|g| g.quantity == quantity)
    }

    pub fn value(&self, quantity: Quantity, lag: Lag, order: i32) -> Option<f64> {
        if !self.geometry.contains_half_domain(lag) {
            return None;
        }
        let view = self.grid(quantity)?.order_view(order)?;
        Some(view[self.geometry.lag_indices(lag).as_slice()])
    }

    /// Writes one CSV file per quantity and order into `dir`.
    #[instrument(skip_all, name = "write_results")]
    pub fn write_csv(&self, dir: &Path) -> Result<Vec<PathBuf>, GridIoError> {
        let mut written = Vec::new();
        for grid in &self.grids {
            for order in self.orders.iter() {
                let Some(view) = grid.order_view(order) else {
                    continue;
                };
                let path = dir.join(grid.quantity.file_name(order));
                csv::write_grid(&path, self.geometry.dimension(), view)?;
                written.push(path);
            }
        }
        info!(files = written.len(), "Structure functions written to {:?}", dir);
        Ok(written)
    }
}

/// Places gathered contributions into the result grids on the root rank.
pub struct Assembler {
    geometry: Geometry,
    kind: SweepKind,
    orders: OrderRange,
    grids: Vec<ArrayD<f64>>,
    filled: ArrayD<bool>,
}

impl Assembler {
    pub fn new(config: &SweepConfig) -> Self {
        let mut shape = config.geometry.half_extents();
        shape.push(config.orders.len());
        let quantities = config.kind.quantities();
        Self {
            geometry: config.geometry.clone(),
            kind: config.kind,
            orders: config.orders,
            grids: quantities
                .iter()
                .map(|_| ArrayD::zeros(IxDyn(&shape)))
                .collect(),
            filled: ArrayD::from_elem(IxDyn(&shape), false),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grids.len()
    }

    fn cell_index(&self, lag: Lag, order_index: usize) -> Result<Vec<usize>, EngineError> {
        let planar_y = self.geometry.dimension() == Dimension::Two && lag.y != 0;
        if planar_y || !self.geometry.contains_half_domain(lag) || order_index >= self.orders.len()
        {
            return Err(EngineError::AssemblyOutOfBounds { lag, order_index });
        }
        let mut index = self.geometry.lag_indices(lag);
        index.push(order_index);
        Ok(index)
    }

    /// Stores one value per quantity for `(lag, order_index)`.
    pub fn place(
        &mut self,
        lag: Lag,
        order_index: usize,
        values: &[f64],
    ) -> Result<(), EngineError> {
        if values.len() != self.width() {
            return Err(EngineError::Internal(format!(
                "contribution carries {} value(s), expected {}",
                values.len(),
                self.width()
            )));
        }
        let index = self.cell_index(lag, order_index)?;
        let cell = index.as_slice();
        if self.filled[cell] {
            return Err(EngineError::DuplicateContribution { lag, order_index });
        }
        self.filled[cell] = true;
        for (grid, &value) in self.grids.iter_mut().zip(values) {
            grid[cell] = value;
        }
        Ok(())
    }

    /// Checks coverage, zeroes the origin and hands out the finished grids.
    pub fn finish(mut self) -> Result<StructureFunctions, EngineError> {
        let ndim = self.geometry.ndim();
        let missing: Vec<Lag> = self
            .filled
            .indexed_iter()
            .filter(|(_, filled)| !**filled)
            .map(|(index, _)| {
                let lag: Vec<usize> = (0..ndim).map(|axis| index[axis]).collect();
                self.geometry.lag_from_indices(&lag)
            })
            .collect();
        if let Some(&first) = missing.first() {
            return Err(EngineError::MissingContribution {
                missing: missing.len(),
                first,
            });
        }

        let origin = vec![0; ndim];
        for grid in &mut self.grids {
            for order_index in 0..self.orders.len() {
                let mut cell = origin.clone();
                cell.push(order_index);
                grid[cell.as_slice()] = 0.0;
            }
        }

        let grids = self
            .kind
            .quantities()
            .iter()
            .zip(self.grids)
            .map(|(&quantity, data)| ResultGrid {
                quantity,
                orders: self.orders,
                data,
            })
            .collect();

        Ok(StructureFunctions {
            geometry: self.geometry,
            kind: self.kind,
            orders: self.orders,
            grids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SweepConfigBuilder;
    use tempfile::tempdir;

    fn config(kind: SweepKind) -> SweepConfig {
        SweepConfigBuilder::new()
            .geometry(Geometry::two_d([4, 4], [3.0, 3.0]))
            .kind(kind)
            .orders(1, 2)
            .build()
            .unwrap()
    }

    fn fill(assembler: &mut Assembler, value: impl Fn(Lag, usize) -> f64) {
        let width = assembler.width();
        let lags: Vec<_> = assembler.geometry.half_domain_lags().collect();
        for lag in lags {
            for order_index in 0..2 {
                let values = vec![value(lag, order_index); width];
                assembler.place(lag, order_index, &values).unwrap();
            }
        }
    }

    #[test]
    fn quantity_file_names_carry_the_order() {
        assert_eq!(Quantity::Longitudinal.file_name(2), "SF_Grid_pll2.csv");
        assert_eq!(Quantity::Transverse.file_name(-1), "SF_Grid_perp-1.csv");
        assert_eq!(Quantity::Scalar.file_name(10), "SF_Grid_scalar10.csv");
    }

    #[test]
    fn finish_zeroes_origin_and_keeps_other_cells() {
        let mut assembler = Assembler::new(&config(SweepKind::Vector { transverse: true }));
        fill(&mut assembler, |lag, order| 1.0 + lag.x as f64 + 10.0 * order as f64);

        let results = assembler.finish().unwrap();
        for order in 1..=2 {
            assert_eq!(results.value(Quantity::Longitudinal, Lag::ORIGIN, order), Some(0.0));
            assert_eq!(results.value(Quantity::Transverse, Lag::ORIGIN, order), Some(0.0));
        }
        assert_eq!(results.value(Quantity::Transverse, Lag::planar(1, 0), 2), Some(12.0));
        assert_eq!(results.value(Quantity::Scalar, Lag::planar(1, 0), 2), None);
        assert_eq!(results.value(Quantity::Longitudinal, Lag::planar(2, 0), 1), None);
    }

    #[test]
    fn place_rejects_duplicates_and_out_of_bounds() {
        let mut assembler = Assembler::new(&config(SweepKind::Scalar));
        assembler.place(Lag::planar(1, 1), 0, &[1.0]).unwrap();
        assert!(matches!(
            assembler.place(Lag::planar(1, 1), 0, &[1.0]),
            Err(EngineError::DuplicateContribution { order_index: 0, .. })
        ));
        assert!(matches!(
            assembler.place(Lag::planar(2, 0), 0, &[1.0]),
            Err(EngineError::AssemblyOutOfBounds { .. })
        ));
        assert!(matches!(
            assembler.place(Lag::new(0, 1, 0), 0, &[1.0]),
            Err(EngineError::AssemblyOutOfBounds { .. })
        ));
        assert!(matches!(
            assembler.place(Lag::planar(0, 0), 2, &[1.0]),
            Err(EngineError::AssemblyOutOfBounds { .. })
        ));
        assert!(matches!(
            assembler.place(Lag::planar(0, 0), 0, &[1.0, 2.0]),
            Err(EngineError::Internal(_))
        ));
    }

    #[test]
    fn finish_reports_missing_cells() {
        let mut assembler = Assembler::new(&config(SweepKind::Scalar));
        assembler.place(Lag::planar(0, 0), 0, &[1.0]).unwrap();
        match assembler.finish() {
            Err(EngineError::MissingContribution { missing, first }) => {
                assert_eq!(missing, 2 * 2 * 2 - 1);
                assert_eq!(first, Lag::planar(0, 0));
            }
            other => panic!("expected MissingContribution, got {:?}", other),
        }
    }

    #[test]
    fn write_csv_emits_one_file_per_quantity_and_order() {
        let mut assembler = Assembler::new(&config(SweepKind::Vector { transverse: false }));
        fill(&mut assembler, |_, _| 0.5);
        let results = assembler.finish().unwrap();

        let dir = tempdir().unwrap();
        let written = results.write_csv(dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("SF_Grid_pll1.csv"),
                dir.path().join("SF_Grid_pll2.csv")
            ]
        );
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content.lines().next(), Some("x,z,value"));
        assert_eq!(content.lines().nth(1), Some("0,0,0.0"));
        assert_eq!(content.lines().nth(2), Some("0,1,0.5"));
    }
}

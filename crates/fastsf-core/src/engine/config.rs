use super::partition::ProcessGrid;
use super::results::Quantity;
use crate::core::field::FieldKind;
use crate::core::grid::Geometry;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Order range is empty: q1 = {q1} exceeds q2 = {q2}")]
    InvalidOrderRange { q1: i32, q2: i32 },

    #[error("Grid extent along {axis} must be at least 2, got {extent}")]
    ExtentTooSmall { axis: char, extent: usize },

    #[error("Domain length along {axis} must be finite and non-negative")]
    InvalidLength { axis: char },

    #[error("Reduction chunk size must be positive")]
    InvalidChunkSize,

    #[error("The process group is empty")]
    EmptyProcessGroup,

    #[error(
        "Number of processes along x ({px}) must be between 1 and the total number of processes ({total})"
    )]
    AxisProcessCount { px: usize, total: usize },

    #[error("Total number of processes ({total}) is not divisible by the number along x ({px})")]
    IndivisibleProcessGrid { px: usize, total: usize },

    #[error(
        "Half-extent {half_extent} along {axis} is not divisible by its {processes} process(es)"
    )]
    IndivisibleAxis {
        axis: char,
        half_extent: usize,
        processes: usize,
    },
}

/// Inclusive range of structure-function orders `[q1, q2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRange {
    first: i32,
    last: i32,
}

impl OrderRange {
    pub fn new(first: i32, last: i32) -> Result<Self, ConfigError> {
        if first > last {
            return Err(ConfigError::InvalidOrderRange {
                q1: first,
                q2: last,
            });
        }
        Ok(Self { first, last })
    }

    #[inline]
    pub fn first(&self) -> i32 {
        self.first
    }

    #[inline]
    pub fn last(&self) -> i32 {
        self.last
    }

    #[inline]
    pub fn len(&self) -> usize {
        (i64::from(self.last) - i64::from(self.first)) as usize + 1
    }

    /// Always `false`: construction rejects `first > last`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.first..=self.last
    }

    pub fn index_of(&self, order: i32) -> Option<usize> {
        self.iter()
            .contains(&order)
            .then(|| (i64::from(order) - i64::from(self.first)) as usize)
    }

    pub fn order_at(&self, index: usize) -> Option<i32> {
        if index >= self.len() {
            return None;
        }
        i32::try_from(i64::from(self.first) + index as i64).ok()
    }
}

/// What the sweep computes for every lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    /// Raw increments of a scalar field.
    Scalar,
    /// Longitudinal increments of a vector field, plus transverse ones when `transverse`.
    Vector { transverse: bool },
}

impl SweepKind {
    pub fn field_kind(self) -> FieldKind {
        match self {
            SweepKind::Scalar => FieldKind::Scalar,
            SweepKind::Vector { .. } => FieldKind::Vector,
        }
    }

    /// Quantities produced per `(lag, order)`, in the order the sweep emits them.
    pub fn quantities(self) -> &'static [Quantity] {
        match self {
            SweepKind::Scalar => &[Quantity::Scalar],
            SweepKind::Vector { transverse: false } => &[Quantity::Longitudinal],
            SweepKind::Vector { transverse: true } => {
                &[Quantity::Longitudinal, Quantity::Transverse]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub geometry: Geometry,
    pub kind: SweepKind,
    pub orders: OrderRange,
    /// Processes along the first decomposed axis.
    pub px: usize,
    /// Maximum number of records per rank and collective round; `None` sends everything at once.
    pub chunk_size: Option<usize>,
}

impl SweepConfig {
    /// Validates the decomposition for a group of `total` ranks.
    pub fn process_grid(&self, total: usize) -> Result<ProcessGrid, ConfigError> {
        ProcessGrid::new(&self.geometry, self.px, total)
    }
}

#[derive(Default)]
pub struct SweepConfigBuilder {
    geometry: Option<Geometry>,
    kind: Option<SweepKind>,
    orders: Option<(i32, i32)>,
    px: Option<usize>,
    chunk_size: Option<usize>,
}

impl SweepConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
    pub fn kind(mut self, kind: SweepKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn orders(mut self, q1: i32, q2: i32) -> Self {
        self.orders = Some((q1, q2));
        self
    }
    pub fn px(mut self, px: usize) -> Self {
        self.px = Some(px);
        self
    }
    pub fn chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<SweepConfig, ConfigError> {
        let geometry = self
            .geometry
            .ok_or(ConfigError::MissingParameter("geometry"))?;
        let kind = self.kind.ok_or(ConfigError::MissingParameter("kind"))?;
        let (q1, q2) = self.orders.ok_or(ConfigError::MissingParameter("orders"))?;

        let axes = geometry.dimension().axis_names();
        for ((&axis, &extent), &length) in axes
            .iter()
            .zip(geometry.extents())
            .zip(geometry.lengths())
        {
            if extent < 2 {
                return Err(ConfigError::ExtentTooSmall { axis, extent });
            }
            if !length.is_finite() || length < 0.0 {
                return Err(ConfigError::InvalidLength { axis });
            }
        }

        if self.chunk_size == Some(0) {
            return Err(ConfigError::InvalidChunkSize);
        }

        Ok(SweepConfig {
            geometry,
            kind,
            orders: OrderRange::new(q1, q2)?,
            px: self.px.unwrap_or(1),
            chunk_size: self.chunk_size,
        })
    }
}

use super::config::ConfigError;
use crate::core::grid::{Dimension, Geometry, Lag};
use itertools::Itertools;
use std::fmt;
use tracing::debug;

/// Indices of one axis of length `half_extent` owned by `rank` out of `processes`.
///
/// Index `i` is paired with its mirror `half_extent - 1 - i` so that every pair carries the
/// same total window cost; pair `p` goes to rank `p mod processes`. An unpaired middle index
/// goes to rank `(half_extent / 2) mod processes`. With one process per index every rank
/// simply owns its own index.
///
/// Pairs are dealt with stride `processes`, so when `half_extent / 2` is not a multiple of
/// `processes` the lower ranks own one pair more than the others. For `half_extent = 6` and
/// two processes rank 0 owns pairs `{0, 2}` and rank 1 only `{1}`; on a 2 x 2 grid this
/// compounds to a 4:1 load ratio. [`PartitionReport`] flags such splits.
pub fn partition_axis(half_extent: usize, processes: usize, rank: usize) -> Vec<usize> {
    if processes == half_extent {
        return vec![rank];
    }

    let mut owned = Vec::new();
    for pair in (rank..half_extent / 2).step_by(processes.max(1)) {
        owned.push(pair);
        owned.push(half_extent - 1 - pair);
    }
    if half_extent % 2 == 1 && (half_extent / 2) % processes == rank {
        owned.push(half_extent / 2);
    }
    owned
}

/// A validated `px × py` arrangement of the process group over the two decomposed axes.
///
/// 3D fields decompose `(x, y)` and sweep `z` in full on every rank; 2D fields decompose
/// `(x, z)` and have no swept axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGrid {
    px: usize,
    py: usize,
}

impl ProcessGrid {
    pub fn new(geometry: &Geometry, px: usize, total: usize) -> Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::EmptyProcessGroup);
        }
        if px == 0 || px > total {
            return Err(ConfigError::AxisProcessCount { px, total });
        }
        if total % px != 0 {
            return Err(ConfigError::IndivisibleProcessGrid { px, total });
        }
        let py = total / px;

        let axes = geometry.dimension().axis_names();
        let half = geometry.half_extents();
        for (axis, processes) in [(0, px), (1, py)] {
            if half[axis] % processes != 0 {
                return Err(ConfigError::IndivisibleAxis {
                    axis: axes[axis],
                    half_extent: half[axis],
                    processes,
                });
            }
        }

        Ok(Self { px, py })
    }

    #[inline]
    pub fn px(&self) -> usize {
        self.px
    }

    #[inline]
    pub fn py(&self) -> usize {
        self.py
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.px * self.py
    }

    /// Row-major coordinates `(rank_x, rank_y)` of a rank in the process grid.
    pub fn coordinates(&self, rank: usize) -> (usize, usize) {
        let rank_y = rank % self.py;
        ((rank - rank_y) / self.py, rank_y)
    }

    pub fn assignment(&self, geometry: &Geometry, rank: usize) -> Assignment {
        let half = geometry.half_extents();
        let (rank_x, rank_y) = self.coordinates(rank);
        let first = partition_axis(half[0], self.px, rank_x);
        let second = partition_axis(half[1], self.py, rank_y);

        let pairs: Vec<_> = first
            .iter()
            .flat_map(|&a| second.iter().map(move |&b| (a, b)))
            .collect();
        debug!(
            rank,
            rank_x,
            rank_y,
            pairs = pairs.len(),
            "Computed lag assignment."
        );

        Assignment {
            rank,
            dimension: geometry.dimension(),
            pairs,
            swept: match geometry.dimension() {
                Dimension::Three => half[2],
                Dimension::Two => 1,
            },
        }
    }

    /// Assignments of every rank, in rank order.
    pub fn assignments(&self, geometry: &Geometry) -> Vec<Assignment> {
        (0..self.size())
            .map(|rank| self.assignment(geometry, rank))
            .collect()
    }

    /// The largest number of lags any rank owns.
    pub fn max_lag_count(&self, geometry: &Geometry) -> usize {
        self.assignments(geometry)
            .iter()
            .map(Assignment::lag_count)
            .max()
            .unwrap_or(0)
    }
}

/// The lags one rank evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    rank: usize,
    dimension: Dimension,
    pairs: Vec<(usize, usize)>,
    swept: usize,
}

impl Assignment {
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Owned coordinates on the decomposed axes, first-axis major.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn lags(&self) -> impl Iterator<Item = Lag> + '_ {
        let dimension = self.dimension;
        self.pairs.iter().flat_map(move |&(a, b)| {
            (0..self.swept).map(move |c| match dimension {
                Dimension::Three => Lag::new(a, b, c),
                Dimension::Two => Lag::planar(a, b),
            })
        })
    }

    #[inline]
    pub fn lag_count(&self) -> usize {
        self.pairs.len() * self.swept
    }

    /// Total number of point pairs the rank differences, summed over its lags.
    pub fn load(&self, geometry: &Geometry) -> u64 {
        self.lags().map(|lag| geometry.window_len(lag) as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankLoad {
    pub rank: usize,
    pub pairs: usize,
    pub lags: usize,
    pub load: u64,
}

/// Per-rank work summary of a decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionReport {
    pub px: usize,
    pub py: usize,
    pub ranks: Vec<RankLoad>,
}

impl PartitionReport {
    pub fn new(geometry: &Geometry, grid: &ProcessGrid) -> Self {
        let ranks = grid
            .assignments(geometry)
            .iter()
            .map(|assignment| RankLoad {
                rank: assignment.rank(),
                pairs: assignment.pairs().len(),
                lags: assignment.lag_count(),
                load: assignment.load(geometry),
            })
            .collect();
        Self {
            px: grid.px(),
            py: grid.py(),
            ranks,
        }
    }

    /// Whether some ranks own more index pairs than others.
    pub fn uneven_pairs(&self) -> bool {
        self.ranks
            .iter()
            .map(|r| r.pairs)
            .minmax()
            .into_option()
            .is_some_and(|(min, max)| min != max)
    }

    pub fn total_lags(&self) -> usize {
        self.ranks.iter().map(|r| r.lags).sum()
    }

    /// Ratio of the heaviest to the lightest rank load; `1.0` is perfect balance.
    pub fn imbalance(&self) -> f64 {
        let max = self.ranks.iter().map(|r| r.load).max().unwrap_or(0);
        let min = self.ranks.iter().map(|r| r.load).min().unwrap_or(0);
        if min == 0 {
            if max == 0 { 1.0 } else { f64::INFINITY }
        } else {
            max as f64 / min as f64
        }
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Process grid: {} x {} ({} ranks)",
            self.px,
            self.py,
            self.ranks.len()
        )?;
        writeln!(f, "{:>6} {:>8} {:>8} {:>14}", "rank", "pairs", "lags", "load")?;
        for rank in &self.ranks {
            writeln!(
                f,
                "{:>6} {:>8} {:>8} {:>14}",
                rank.rank, rank.pairs, rank.lags, rank.load
            )?;
        }
        write!(
            f,
            "Total lags: {}, load imbalance (max/min): {:.4}",
            self.total_lags(),
            self.imbalance()
        )?;
        if self.uneven_pairs() {
            write!(
                f,
                "\nNote: ranks own unequal numbers of index pairs; a half-extent whose pair \
                 count is a multiple of the processes on its axis balances exactly."
            )?;
        }
        Ok(())
    }
}

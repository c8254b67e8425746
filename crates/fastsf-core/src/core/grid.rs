use itertools::Itertools;
use std::fmt;

/// Dimensionality of the sampled field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Fields over an `(x, z)` plane.
    Two,
    /// Fields over an `(x, y, z)` volume.
    Three,
}

impl Dimension {
    #[inline]
    pub fn ndim(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    /// Axis labels in storage order.
    pub fn axis_names(self) -> &'static [char] {
        match self {
            Dimension::Two => &['x', 'z'],
            Dimension::Three => &['x', 'y', 'z'],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Two => write!(f, "2D"),
            Dimension::Three => write!(f, "3D"),
        }
    }
}

/// An integer displacement between two grid points.
///
/// Two-dimensional fields live in the `(x, z)` plane, so their lags always carry `y == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Lag {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Lag {
    pub const ORIGIN: Lag = Lag { x: 0, y: 0, z: 0 };

    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub fn planar(x: usize, z: usize) -> Self {
        Self { x, y: 0, z }
    }
}

impl fmt::Display for Lag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Grid spacing along one axis; a single-point axis has zero spacing.
pub fn grid_spacing(points: usize, length: f64) -> f64 {
    if points <= 1 {
        0.0
    } else {
        length / (points - 1) as f64
    }
}

/// Shape and physical size of the sampled grid.
///
/// Extents and lengths are stored in axis order (`x, z` in 2D, `x, y, z` in 3D), which is
/// also the axis order of every field component and of every result grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    dimension: Dimension,
    extents: Vec<usize>,
    lengths: Vec<f64>,
}

impl Geometry {
    pub fn three_d(extents: [usize; 3], lengths: [f64; 3]) -> Self {
        Self {
            dimension: Dimension::Three,
            extents: extents.to_vec(),
            lengths: lengths.to_vec(),
        }
    }

    pub fn two_d(extents: [usize; 2], lengths: [f64; 2]) -> Self {
        Self {
            dimension: Dimension::Two,
            extents: extents.to_vec(),
            lengths: lengths.to_vec(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dimension.ndim()
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    /// Extents of the symmetry-reduced displacement domain, `N / 2` per axis.
    pub fn half_extents(&self) -> Vec<usize> {
        self.extents.iter().map(|&n| n / 2).collect()
    }

    pub fn spacing(&self) -> Vec<f64> {
        self.extents
            .iter()
            .zip(&self.lengths)
            .map(|(&n, &l)| grid_spacing(n, l))
            .collect()
    }

    /// Per-axis indices of a lag, in storage order.
    pub fn lag_indices(&self, lag: Lag) -> Vec<usize> {
        match self.dimension {
            Dimension::Two => vec![lag.x, lag.z],
            Dimension::Three => vec![lag.x, lag.y, lag.z],
        }
    }

    pub fn lag_from_indices(&self, indices: &[usize]) -> Lag {
        match self.dimension {
            Dimension::Two => Lag::planar(indices[0], indices[1]),
            Dimension::Three => Lag::new(indices[0], indices[1], indices[2]),
        }
    }

    /// The lag expressed in physical units, `(x·dx, [y·dy,] z·dz)`.
    pub fn physical_lag(&self, lag: Lag) -> Vec<f64> {
        self.lag_indices(lag)
            .into_iter()
            .zip(self.spacing())
            .map(|(i, d)| i as f64 * d)
            .collect()
    }

    /// Number of point pairs separated by `lag`, i.e. the size of the overlap window.
    pub fn window_len(&self, lag: Lag) -> usize {
        self.lag_indices(lag)
            .into_iter()
            .zip(&self.extents)
            .map(|(l, &n)| n.saturating_sub(l))
            .product()
    }

    pub fn contains_half_domain(&self, lag: Lag) -> bool {
        self.lag_indices(lag)
            .into_iter()
            .zip(self.half_extents())
            .all(|(l, h)| l < h)
    }

    pub fn half_domain_len(&self) -> usize {
        self.half_extents().into_iter().product()
    }

    /// Every lag of the half-domain in row-major order.
    pub fn half_domain_lags(&self) -> impl Iterator<Item = Lag> + '_ {
        self.half_extents()
            .into_iter()
            .map(|h| 0..h)
            .multi_cartesian_product()
            .map(move |indices| self.lag_from_indices(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_is_zero_for_single_point_axis() {
        assert_eq!(grid_spacing(1, 5.0), 0.0);
        assert_eq!(grid_spacing(8, 7.0), 1.0);
        assert_eq!(grid_spacing(5, 1.0), 0.25);
    }

    #[test]
    fn planar_geometry_maps_lags_onto_x_and_z() {
        let geometry = Geometry::two_d([8, 4], [7.0, 3.0]);
        let lag = Lag::planar(3, 1);
        assert_eq!(geometry.lag_indices(lag), vec![3, 1]);
        assert_eq!(geometry.lag_from_indices(&[3, 1]), lag);
        assert_eq!(geometry.physical_lag(lag), vec![3.0, 1.0]);
        assert_eq!(geometry.half_extents(), vec![4, 2]);
    }

    #[test]
    fn window_len_shrinks_with_lag() {
        let geometry = Geometry::three_d([8, 6, 4], [1.0, 1.0, 1.0]);
        assert_eq!(geometry.window_len(Lag::ORIGIN), 8 * 6 * 4);
        assert_eq!(geometry.window_len(Lag::new(3, 2, 1)), 5 * 4 * 3);
    }

    #[test]
    fn half_domain_lags_are_row_major_and_complete() {
        let geometry = Geometry::three_d([4, 4, 6], [1.0, 1.0, 1.0]);
        let lags: Vec<_> = geometry.half_domain_lags().collect();
        assert_eq!(lags.len(), geometry.half_domain_len());
        assert_eq!(lags.len(), 2 * 2 * 3);
        assert_eq!(lags[0], Lag::ORIGIN);
        assert_eq!(lags[1], Lag::new(0, 0, 1));
        assert_eq!(lags[3], Lag::new(0, 1, 0));
        assert!(lags.iter().all(|&l| geometry.contains_half_domain(l)));
    }

    #[test]
    fn contains_half_domain_rejects_upper_half() {
        let geometry = Geometry::two_d([8, 8], [1.0, 1.0]);
        assert!(geometry.contains_half_domain(Lag::planar(3, 3)));
        assert!(!geometry.contains_half_domain(Lag::planar(4, 0)));
    }
}

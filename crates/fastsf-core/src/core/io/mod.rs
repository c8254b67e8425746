//! Reading field components and writing result grids.
//!
//! Grids are exchanged as CSV tables with one row per grid point: the integer index along
//! every axis followed by the value (`x,z,value` in 2D, `x,y,z,value` in 3D).

pub mod csv;

use crate::core::field::{FieldKind, FieldSet};
use crate::core::grid::{Dimension, Geometry};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GridIoError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: ::csv::Error },
    #[error("Index {index:?} in '{path}' lies outside the grid {shape:?}")]
    OutOfBounds {
        path: String,
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("Grid point {index:?} appears more than once in '{path}'")]
    DuplicatePoint { path: String, index: Vec<usize> },
    #[error("'{path}' covers {found} of {expected} grid points")]
    Incomplete {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// File stems of the input components for a field kind, in axis order.
pub fn component_stems(kind: FieldKind, dimension: Dimension) -> &'static [&'static str] {
    match (kind, dimension) {
        (FieldKind::Scalar, _) => &["T.Fr"],
        (FieldKind::Vector, Dimension::Two) => &["U.V1r", "U.V3r"],
        (FieldKind::Vector, Dimension::Three) => &["U.V1r", "U.V2r", "U.V3r"],
    }
}

pub fn component_paths(dir: &Path, kind: FieldKind, dimension: Dimension) -> Vec<PathBuf> {
    component_stems(kind, dimension)
        .iter()
        .map(|stem| dir.join(format!("{stem}.csv")))
        .collect()
}

/// Loads every component of a field from `dir`.
pub fn load_fields(
    dir: &Path,
    geometry: &Geometry,
    kind: FieldKind,
) -> Result<FieldSet, GridIoError> {
    let paths = component_paths(dir, kind, geometry.dimension());
    info!(
        "Reading {} field component(s) from {:?}",
        paths.len(),
        dir
    );
    let mut components = paths
        .iter()
        .map(|path| csv::read_grid(path, geometry.dimension(), geometry.extents()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match kind {
        FieldKind::Scalar => FieldSet::scalar(components.swap_remove(0)),
        FieldKind::Vector => FieldSet::vector(components),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthetic;
    use tempfile::tempdir;

    #[test]
    fn component_stems_follow_field_layout() {
        assert_eq!(
            component_stems(FieldKind::Vector, Dimension::Two),
            &["U.V1r", "U.V3r"]
        );
        assert_eq!(component_stems(FieldKind::Scalar, Dimension::Three), &["T.Fr"]);
    }

    #[test]
    fn load_fields_reads_every_component() {
        let dir = tempdir().unwrap();
        let geometry = Geometry::three_d([4, 2, 3], [3.0, 1.0, 2.0]);
        let expected = synthetic::vector_field(&geometry);
        for (path, component) in component_paths(dir.path(), FieldKind::Vector, Dimension::Three)
            .iter()
            .zip(expected.components())
        {
            csv::write_grid(path, geometry.dimension(), component.view()).unwrap();
        }

        let loaded = load_fields(dir.path(), &geometry, FieldKind::Vector).unwrap();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn load_fields_reports_missing_component_file() {
        let dir = tempdir().unwrap();
        let geometry = Geometry::two_d([4, 4], [1.0, 1.0]);
        let result = load_fields(dir.path(), &geometry, FieldKind::Scalar);
        assert!(matches!(result, Err(GridIoError::Csv { .. })));
    }
}

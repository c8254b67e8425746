use super::GridIoError;
use crate::core::grid::Dimension;
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct PlanarRow {
    x: usize,
    z: usize,
    value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct VolumeRow {
    x: usize,
    y: usize,
    z: usize,
    value: f64,
}

fn csv_error(path: &Path, source: ::csv::Error) -> GridIoError {
    GridIoError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn io_error(path: &Path, source: std::io::Error) -> GridIoError {
    GridIoError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

struct GridFiller<'p> {
    path: &'p Path,
    grid: ArrayD<f64>,
    seen: ArrayD<bool>,
    filled: usize,
}

impl<'p> GridFiller<'p> {
    fn new(path: &'p Path, shape: &[usize]) -> Self {
        Self {
            path,
            grid: ArrayD::zeros(IxDyn(shape)),
            seen: ArrayD::from_elem(IxDyn(shape), false),
            filled: 0,
        }
    }

    fn place(&mut self, index: &[usize], value: f64) -> Result<(), GridIoError> {
        if index.iter().zip(self.grid.shape()).any(|(i, n)| i >= n) {
            return Err(GridIoError::OutOfBounds {
                path: self.path.to_string_lossy().to_string(),
                index: index.to_vec(),
                shape: self.grid.shape().to_vec(),
            });
        }
        if self.seen[index] {
            return Err(GridIoError::DuplicatePoint {
                path: self.path.to_string_lossy().to_string(),
                index: index.to_vec(),
            });
        }
        self.seen[index] = true;
        self.grid[index] = value;
        self.filled += 1;
        Ok(())
    }

    fn finish(self) -> Result<ArrayD<f64>, GridIoError> {
        if self.filled != self.grid.len() {
            return Err(GridIoError::Incomplete {
                path: self.path.to_string_lossy().to_string(),
                expected: self.grid.len(),
                found: self.filled,
            });
        }
        Ok(self.grid)
    }
}

/// Reads a dense grid of the given shape; every point must be listed exactly once.
pub fn read_grid(
    path: &Path,
    dimension: Dimension,
    shape: &[usize],
) -> Result<ArrayD<f64>, GridIoError> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut filler = GridFiller::new(path, shape);

    match dimension {
        Dimension::Two => {
            for row in reader.deserialize::<PlanarRow>() {
                let row = row.map_err(|e| csv_error(path, e))?;
                filler.place(&[row.x, row.z], row.value)?;
            }
        }
        Dimension::Three => {
            for row in reader.deserialize::<VolumeRow>() {
                let row = row.map_err(|e| csv_error(path, e))?;
                filler.place(&[row.x, row.y, row.z], row.value)?;
            }
        }
    }

    filler.finish()
}

/// Writes a dense grid in row-major order, creating parent directories as needed.
pub fn write_grid(
    path: &Path,
    dimension: Dimension,
    grid: ArrayViewD<f64>,
) -> Result<(), GridIoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
    }
    let mut writer = ::csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    for (index, &value) in grid.indexed_iter() {
        let written = match dimension {
            Dimension::Two => writer.serialize(PlanarRow {
                x: index[0],
                z: index[1],
                value,
            }),
            Dimension::Three => writer.serialize(VolumeRow {
                x: index[0],
                y: index[1],
                z: index[2],
                value,
            }),
        };
        written.map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    #[test]
    fn read_grid_places_values_by_index_not_row_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("T.Fr.csv");
        write_file(&path, "x,z,value\n1,1,4.0\n0,1,2.0\n1,0,3.0\n0,0,1.0\n");

        let grid = read_grid(&path, Dimension::Two, &[2, 2]).unwrap();
        assert_eq!(grid[[0, 0]], 1.0);
        assert_eq!(grid[[0, 1]], 2.0);
        assert_eq!(grid[[1, 0]], 3.0);
        assert_eq!(grid[[1, 1]], 4.0);
    }

    #[test]
    fn read_grid_rejects_out_of_bounds_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        write_file(&path, "x,z,value\n0,0,1.0\n2,0,1.0\n");

        let result = read_grid(&path, Dimension::Two, &[2, 1]);
        assert!(matches!(result, Err(GridIoError::OutOfBounds { .. })));
    }

    #[test]
    fn read_grid_rejects_duplicate_points() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        write_file(&path, "x,y,z,value\n0,0,0,1.0\n0,0,0,2.0\n");

        let result = read_grid(&path, Dimension::Three, &[1, 1, 2]);
        assert!(matches!(result, Err(GridIoError::DuplicatePoint { .. })));
    }

    #[test]
    fn read_grid_rejects_incomplete_coverage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        write_file(&path, "x,z,value\n0,0,1.0\n");

        match read_grid(&path, Dimension::Two, &[2, 2]) {
            Err(GridIoError::Incomplete { expected, found, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 1);
            }
            other => panic!("expected Incomplete, got {:?}", other),
        }
    }

    #[test]
    fn write_grid_emits_header_and_row_major_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let grid = ndarray::arr2(&[[0.5, 1.5], [2.5, 3.5]]).into_dyn();

        write_grid(&path, Dimension::Two, grid.view()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "x,z,value");
        assert_eq!(lines[1], "0,0,0.5");
        assert_eq!(lines[4], "1,1,3.5");
    }
}

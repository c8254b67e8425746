use super::grid::Geometry;
use ndarray::ArrayD;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    Vector,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Expected a {expected:?} field but a {found:?} field was supplied")]
    KindMismatch { expected: FieldKind, found: FieldKind },

    #[error("{kind:?} field needs {expected} component(s) but {found} were supplied")]
    ComponentCount {
        kind: FieldKind,
        expected: usize,
        found: usize,
    },

    #[error("Component {component} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        component: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// The immutable field store consumed by the displacement sweep.
///
/// A scalar field holds a single array; a vector field holds one array per spatial
/// component, in axis order (`x, z` in 2D, `x, y, z` in 3D).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    kind: FieldKind,
    components: Vec<ArrayD<f64>>,
}

impl FieldSet {
    pub fn scalar(field: ArrayD<f64>) -> Self {
        Self {
            kind: FieldKind::Scalar,
            components: vec![field],
        }
    }

    pub fn vector(components: Vec<ArrayD<f64>>) -> Self {
        Self {
            kind: FieldKind::Vector,
            components,
        }
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn components(&self) -> &[ArrayD<f64>] {
        &self.components
    }

    pub fn expect_kind(&self, expected: FieldKind) -> Result<(), FieldError> {
        if self.kind != expected {
            return Err(FieldError::KindMismatch {
                expected,
                found: self.kind,
            });
        }
        Ok(())
    }

    /// Checks that the component count and every component shape match the grid.
    pub fn check_against(&self, geometry: &Geometry) -> Result<(), FieldError> {
        let expected_components = match self.kind {
            FieldKind::Scalar => 1,
            FieldKind::Vector => geometry.ndim(),
        };
        if self.components.len() != expected_components {
            return Err(FieldError::ComponentCount {
                kind: self.kind,
                expected: expected_components,
                found: self.components.len(),
            });
        }

        for (component, array) in self.components.iter().enumerate() {
            if array.shape() != geometry.extents() {
                return Err(FieldError::ShapeMismatch {
                    component,
                    expected: geometry.extents().to_vec(),
                    found: array.shape().to_vec(),
                });
            }
        }
        Ok(())
    }
}

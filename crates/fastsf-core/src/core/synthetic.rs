//! Linear test fields whose structure functions are known in closed form.
//!
//! For `u = (x·dx, [y·dy,] z·dz)` every velocity increment equals the physical lag, so the
//! longitudinal structure function of order `q` is `|l|^q` and the transverse one vanishes.
//! For `θ = x·dx + [y·dy +] z·dz` the scalar increment is `lx + [ly +] lz`.

use super::field::FieldSet;
use super::grid::Geometry;
use ndarray::{ArrayD, IxDyn};
use tracing::info;

/// Generates `u_i = index_i · spacing_i` for every axis.
pub fn vector_field(geometry: &Geometry) -> FieldSet {
    info!(dimension = %geometry.dimension(), "Generating linear synthetic velocity field.");
    let spacing = geometry.spacing();
    let components = (0..geometry.ndim())
        .map(|axis| {
            let d = spacing[axis];
            ArrayD::from_shape_fn(IxDyn(geometry.extents()), |idx| idx[axis] as f64 * d)
        })
        .collect();
    FieldSet::vector(components)
}

/// Generates `θ = Σ_i index_i · spacing_i`.
pub fn scalar_field(geometry: &Geometry) -> FieldSet {
    info!(dimension = %geometry.dimension(), "Generating linear synthetic scalar field.");
    let spacing = geometry.spacing();
    let field = ArrayD::from_shape_fn(IxDyn(geometry.extents()), |idx| {
        spacing
            .iter()
            .enumerate()
            .map(|(axis, d)| idx[axis] as f64 * d)
            .sum()
    });
    FieldSet::scalar(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldKind;

    #[test]
    fn vector_field_components_follow_their_axis() {
        let geometry = Geometry::three_d([4, 3, 5], [3.0, 4.0, 2.0]);
        let fields = vector_field(&geometry);
        assert_eq!(fields.kind(), FieldKind::Vector);
        assert!(fields.check_against(&geometry).is_ok());

        let [ux, uy, uz] = fields.components() else {
            panic!("expected three components");
        };
        assert_eq!(ux[[2, 1, 3]], 2.0);
        assert_eq!(uy[[2, 1, 3]], 2.0);
        assert_eq!(uz[[2, 1, 3]], 1.5);
    }

    #[test]
    fn scalar_field_is_sum_of_coordinates() {
        let geometry = Geometry::two_d([5, 3], [4.0, 1.0]);
        let fields = scalar_field(&geometry);
        assert_eq!(fields.kind(), FieldKind::Scalar);
        assert_eq!(fields.components()[0][[4, 2]], 4.0 + 1.0);
        assert_eq!(fields.components()[0][[0, 0]], 0.0);
    }
}

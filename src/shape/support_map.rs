//! Support functions of convex shapes.

use crate::math::{Isometry, Point, Real, UnitVector, Vector};

/// A convex shape described by its support function.
///
/// The support point of a shape in a direction is the point of the shape with the largest dot
/// product with that direction. GJK and EPA only ever look at convex shapes through it.
pub trait SupportMap {
    /// The support point in direction `dir`, both in local-space.
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real>;

    /// The support point in the unit direction `dir`, both in local-space.
    fn local_support_point_toward(&self, dir: &UnitVector<Real>) -> Point<Real> {
        self.local_support_point(dir)
    }

    /// The support point of this shape placed at `pos`, with `dir` and the result in world-space.
    fn support_point(&self, pos: &Isometry<Real>, dir: &Vector<Real>) -> Point<Real> {
        pos * self.local_support_point(&pos.inverse_transform_vector(dir))
    }

    /// The support point of this shape placed at `pos` in the world-space unit direction `dir`.
    fn support_point_toward(&self, pos: &Isometry<Real>, dir: &UnitVector<Real>) -> Point<Real> {
        pos * self.local_support_point_toward(&pos.inverse_transform_unit_vector(dir))
    }
}

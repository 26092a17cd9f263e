use crate::math::{Point, Real, UnitVector, Vector};
use crate::shape::SupportMap;

/// A single point seen as a degenerate convex shape.
///
/// Stands for the center of a ball when a ball is reduced to its core.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConstantPoint(pub Point<Real>);

impl SupportMap for ConstantPoint {
    #[inline]
    fn local_support_point(&self, _: &Vector<Real>) -> Point<Real> {
        self.0
    }

    #[inline]
    fn local_support_point_toward(&self, _: &UnitVector<Real>) -> Point<Real> {
        self.0
    }
}

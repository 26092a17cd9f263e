use crate::math::{Isometry, Point, Real, UnitVector, Vector};
use crate::shape::SupportMap;
use core::ops::Sub;

/// A vertex of the Minkowski difference `g1 - g2`, with the two shape points it comes from.
///
/// Keeping `orig1` and `orig2` around lets GJK and EPA recover witness points on each shape
/// from barycentric coordinates on the difference.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CSOPoint {
    /// `orig1 - orig2`.
    pub point: Point<Real>,
    /// The point on the first shape.
    pub orig1: Point<Real>,
    /// The point on the second shape.
    pub orig2: Point<Real>,
}

impl CSOPoint {
    /// The difference point of `orig1` and `orig2`.
    pub fn new(orig1: Point<Real>, orig2: Point<Real>) -> Self {
        Self {
            point: Point::from(orig1 - orig2),
            orig1,
            orig2,
        }
    }

    /// The difference of the two origins.
    pub fn origin() -> Self {
        Self::new(Point::origin(), Point::origin())
    }

    /// The support point of `g1 - g2` in direction `dir`.
    ///
    /// `dir` and the result are in the local-space of `g1`, and `pos12` places `g2` in that
    /// space.
    pub fn from_shapes<G1, G2>(pos12: &Isometry<Real>, g1: &G1, g2: &G2, dir: &Vector<Real>) -> Self
    where
        G1: ?Sized + SupportMap,
        G2: ?Sized + SupportMap,
    {
        Self::new(
            g1.local_support_point(dir),
            g2.support_point(pos12, &-dir),
        )
    }

    /// Same as [`CSOPoint::from_shapes`] for a unit direction.
    pub fn from_shapes_toward<G1, G2>(
        pos12: &Isometry<Real>,
        g1: &G1,
        g2: &G2,
        dir: &UnitVector<Real>,
    ) -> Self
    where
        G1: ?Sized + SupportMap,
        G2: ?Sized + SupportMap,
    {
        Self::new(
            g1.local_support_point_toward(dir),
            g2.support_point_toward(pos12, &-*dir),
        )
    }
}

impl Sub<CSOPoint> for CSOPoint {
    type Output = Vector<Real>;

    #[inline]
    fn sub(self, rhs: CSOPoint) -> Vector<Real> {
        self.point - rhs.point
    }
}

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, UnitVector, Vector};
use crate::shape::SupportMap;

/// A sphere centered on the origin of its local-space.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Ball {
    /// The radius.
    pub radius: Real,
}

impl Ball {
    /// A ball of the given radius.
    #[inline]
    pub fn new(radius: Real) -> Self {
        Self { radius }
    }

    /// The AABB of this ball in its local-space.
    #[inline]
    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_half_extents(Point::origin(), Vector::repeat(self.radius))
    }
}

impl SupportMap for Ball {
    #[inline]
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real> {
        match UnitVector::try_new(*dir, Real::EPSILON) {
            Some(dir) => self.local_support_point_toward(&dir),
            // Any point of the sphere will do.
            None => Point::new(0.0, self.radius, 0.0),
        }
    }

    #[inline]
    fn local_support_point_toward(&self, dir: &UnitVector<Real>) -> Point<Real> {
        Point::from(dir.into_inner() * self.radius)
    }
}

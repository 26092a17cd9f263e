use crate::math::Real;

/// The operations the AABB tree and the collision detectors need from a bounding volume.
pub trait BoundingVolume: Sized {
    /// Do the two volumes overlap? Touching volumes overlap.
    fn intersects(&self, other: &Self) -> bool;

    /// Is `other` entirely inside `self`?
    fn contains(&self, other: &Self) -> bool;

    /// Grows `self` so that it also encloses `other`.
    fn merge(&mut self, other: &Self);

    /// The smallest volume enclosing both `self` and `other`.
    fn merged(&self, other: &Self) -> Self;

    /// Grows `self` by `margin` in every direction.
    ///
    /// # Panics
    /// If `margin` is negative.
    fn loosen(&mut self, margin: Real);

    /// A copy of `self` grown by `margin` in every direction.
    fn loosened(&self, margin: Real) -> Self;
}

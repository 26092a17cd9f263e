use crate::bounding_volume::Aabb;
use crate::dynamics::RigidBodyHandle;
use crate::math::{Isometry, Real};
use crate::shape::{MassProperties, Shape};

/// The geometric part of a rigid body.
///
/// A collider is owned by exactly one [`RigidBody`](crate::dynamics::RigidBody). It caches its
/// world-space pose and AABB, which the body refreshes whenever it moves, and raises an
/// `updated` flag read by the coarse collision detector to know which tree leaves to refit.
#[derive(Clone, Debug)]
pub struct Collider {
    shape: Shape,
    position_wrt_parent: Isometry<Real>,
    position: Isometry<Real>,
    aabb: Aabb,
    updated: bool,
    parent: RigidBodyHandle,
}

impl Collider {
    /// Creates a collider located at the origin of its parent body.
    pub fn new(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let aabb = shape.local_aabb();
        Self {
            shape,
            position_wrt_parent: Isometry::identity(),
            position: Isometry::identity(),
            aabb,
            updated: true,
            parent: RigidBodyHandle::invalid(),
        }
    }

    /// Offsets this collider relative to its parent body.
    #[must_use]
    pub fn with_position_wrt_parent(mut self, position: Isometry<Real>) -> Self {
        self.position_wrt_parent = position;
        self.set_position(position);
        self
    }

    /// The shape of this collider.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The position of this collider relative to its parent body.
    #[inline]
    pub fn position_wrt_parent(&self) -> &Isometry<Real> {
        &self.position_wrt_parent
    }

    /// The world-space position of this collider.
    #[inline]
    pub fn position(&self) -> &Isometry<Real> {
        &self.position
    }

    /// The world-space AABB of this collider.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Has this collider moved since the last time the flag was cleared?
    #[inline]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// The handle of the body owning this collider.
    ///
    /// Invalid until the body is added to a world.
    #[inline]
    pub fn parent(&self) -> RigidBodyHandle {
        self.parent
    }

    /// The mass properties of this collider's shape, expressed in the parent body's frame.
    pub fn mass_properties(&self, density: Real) -> MassProperties {
        self.shape
            .mass_properties(density)
            .transform_by(&self.position_wrt_parent)
    }

    /// Moves this collider to the world-space `position` and raises its `updated` flag.
    pub fn set_position(&mut self, position: Isometry<Real>) {
        self.position = position;
        self.aabb = self.shape.compute_aabb(&position);
        self.updated = true;
    }

    /// Places this collider relative to its parent body located at `body_position`.
    pub(crate) fn set_parent_position(&mut self, body_position: &Isometry<Real>) {
        self.set_position(body_position * self.position_wrt_parent);
    }

    pub(crate) fn set_parent(&mut self, parent: RigidBodyHandle) {
        self.parent = parent;
    }

    pub(crate) fn clear_updated(&mut self) {
        self.updated = false;
    }
}

#[cfg(test)]
mod test {
    use super::Collider;
    use crate::math::{Isometry, Point, Vector};
    use crate::shape::Ball;

    #[test]
    fn moving_a_collider_refreshes_its_aabb() {
        let mut collider = Collider::new(Ball::new(0.5));
        collider.clear_updated();
        assert!(!collider.is_updated());

        collider.set_parent_position(&Isometry::translation(2.0, 0.0, 0.0));
        assert!(collider.is_updated());
        assert_relative_eq!(collider.aabb().center(), Point::new(2.0, 0.0, 0.0));
        assert_relative_eq!(collider.aabb().half_extents(), Vector::repeat(0.5));
    }

    #[test]
    fn offset_colliders_follow_their_parent() {
        let mut collider = Collider::new(Ball::new(1.0))
            .with_position_wrt_parent(Isometry::translation(0.0, 1.0, 0.0));
        let body = Isometry::new(Vector::new(1.0, 0.0, 0.0), Vector::z() * core::f32::consts::PI);
        collider.set_parent_position(&body);

        assert_relative_eq!(
            collider.position().translation.vector,
            Vector::new(1.0, -1.0, 0.0),
            epsilon = 1.0e-5
        );
    }
}

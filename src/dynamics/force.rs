use crate::dynamics::RigidBody;
use crate::math::{Point, Real, Vector};
use crate::utils::{Arena, Index};

/// A force generator shared by any number of rigid bodies.
///
/// Forces are stored once in the world's [`ForceSet`] and attached to bodies by handle. Every
/// step, each awake dynamic body calls [`Force::apply`] for every force attached to it, after
/// its accumulators have been reset.
pub trait Force: Send + Sync {
    /// Adds the contribution of this force to the accumulators of `body`.
    fn apply(&self, body: &mut RigidBody);
}

/// The unique identifier of a force added to a [`ForceSet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ForceHandle(pub(crate) Index);

/// A uniform acceleration field, scaled by the mass of each body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Gravity {
    /// The acceleration applied to every body.
    pub acceleration: Vector<Real>,
}

impl Gravity {
    /// Creates a gravity field.
    pub fn new(acceleration: Vector<Real>) -> Self {
        Self { acceleration }
    }
}

impl Force for Gravity {
    fn apply(&self, body: &mut RigidBody) {
        if !body.is_immovable() {
            let mass = body.mass();
            body.add_force(self.acceleration * mass);
        }
    }
}

/// A constant force, and torque, applied at a point fixed relative to each body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstantForce {
    /// The world-space force.
    pub force: Vector<Real>,
    /// The world-space torque.
    pub torque: Vector<Real>,
    /// Where the force is applied, in the body's local-space.
    pub local_point: Point<Real>,
}

impl ConstantForce {
    /// A force applied at the origin of each body.
    pub fn new(force: Vector<Real>) -> Self {
        Self {
            force,
            torque: Vector::zeros(),
            local_point: Point::origin(),
        }
    }

    /// A pure torque.
    pub fn torque(torque: Vector<Real>) -> Self {
        Self {
            force: Vector::zeros(),
            torque,
            local_point: Point::origin(),
        }
    }

    /// Applies the force at `local_point` instead of the body's origin.
    #[must_use]
    pub fn at_local_point(mut self, local_point: Point<Real>) -> Self {
        self.local_point = local_point;
        self
    }
}

impl Force for ConstantForce {
    fn apply(&self, body: &mut RigidBody) {
        let point = body.isometry() * self.local_point;
        body.add_force_at_point(self.force, &point);
        body.add_torque(self.torque);
    }
}

/// The set of forces of a world.
#[derive(Default)]
pub struct ForceSet {
    forces: Arena<Box<dyn Force>>,
}

impl ForceSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a force.
    pub fn insert(&mut self, force: impl Force + 'static) -> ForceHandle {
        ForceHandle(self.forces.insert(Box::new(force)))
    }

    /// Removes a force, returning it if it existed.
    pub fn remove(&mut self, handle: ForceHandle) -> Option<Box<dyn Force>> {
        self.forces.remove(handle.0)
    }

    /// Is `handle` a live force of this set?
    pub fn contains(&self, handle: ForceHandle) -> bool {
        self.forces.contains(handle.0)
    }

    /// The force with the given handle.
    pub fn get(&self, handle: ForceHandle) -> Option<&dyn Force> {
        self.forces.get(handle.0).map(|f| &**f)
    }

    /// The number of forces.
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    /// Is this set empty?
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Iterates through every force handle.
    pub fn handles(&self) -> impl Iterator<Item = ForceHandle> + '_ {
        self.forces.iter().map(|(i, _)| ForceHandle(i))
    }
}

impl core::fmt::Debug for ForceSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForceSet")
            .field("len", &self.forces.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{ConstantForce, ForceSet, Gravity};
    use crate::dynamics::{RigidBody, RigidBodyProperties};
    use crate::math::{Point, Vector};

    #[test]
    fn gravity_is_proportional_to_mass() {
        let mut forces = ForceSet::new();
        let g = forces.insert(Gravity::new(Vector::new(0.0, -10.0, 0.0)));
        let props = RigidBodyProperties {
            inv_mass: 0.5,
            ..RigidBodyProperties::default()
        };
        let mut body = RigidBody::new(props);
        let _ = body.attach_force(g);
        body.process_forces(&forces);
        assert_relative_eq!(body.state().force, Vector::new(0.0, -20.0, 0.0));

        let mut ground = RigidBody::fixed();
        let _ = ground.attach_force(g);
        ground.process_forces(&forces);
        assert_eq!(ground.state().force, Vector::zeros());
    }

    #[test]
    fn off_center_force_produces_torque() {
        let mut forces = ForceSet::new();
        let push = forces.insert(
            ConstantForce::new(Vector::new(0.0, 0.0, 1.0)).at_local_point(Point::new(1.0, 0.0, 0.0)),
        );
        let mut body = RigidBody::new(RigidBodyProperties::default());
        let _ = body.attach_force(push);
        body.process_forces(&forces);
        // r × f = x × z = -y
        assert_relative_eq!(body.state().torque, Vector::new(0.0, -1.0, 0.0));

        // Removed forces are skipped.
        assert!(forces.remove(push).is_some());
        body.process_forces(&forces);
        assert_eq!(body.state().force, Vector::zeros());
    }
}

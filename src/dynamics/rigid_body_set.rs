use crate::dynamics::RigidBody;
use crate::utils::{Arena, Index};

/// The unique identifier of a rigid body added to a [`RigidBodySet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidBodyHandle(pub(crate) Index);

impl RigidBodyHandle {
    /// A handle that never matches any body.
    pub fn invalid() -> Self {
        Self(Index::invalid())
    }

    /// The underlying arena index.
    pub fn index(self) -> Index {
        self.0
    }
}

/// The set of rigid bodies of a world.
#[derive(Clone, Debug, Default)]
pub struct RigidBodySet {
    bodies: Arena<RigidBody>,
}

impl RigidBodySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body, pointing its collider back at the new handle.
    pub fn insert(&mut self, body: RigidBody) -> RigidBodyHandle {
        let handle = RigidBodyHandle(self.bodies.insert(body));
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_handle(handle);
        }
        handle
    }

    /// Removes a body, returning it if it existed.
    pub fn remove(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.bodies.remove(handle.0)
    }

    /// Is `handle` a live body of this set?
    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle.0)
    }

    /// The body with the given handle.
    pub fn get(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)
    }

    /// The body with the given handle.
    pub fn get_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0)
    }

    /// Two distinct bodies at once.
    pub fn get2_mut(
        &mut self,
        handle1: RigidBodyHandle,
        handle2: RigidBodyHandle,
    ) -> Option<(&mut RigidBody, &mut RigidBody)> {
        self.bodies.get2_mut(handle1.0, handle2.0)
    }

    /// The number of bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Is this set empty?
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterates through every body and its handle.
    pub fn iter(&self) -> impl Iterator<Item = (RigidBodyHandle, &RigidBody)> {
        self.bodies.iter().map(|(i, b)| (RigidBodyHandle(i), b))
    }

    /// Iterates mutably through every body and its handle.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RigidBodyHandle, &mut RigidBody)> {
        self.bodies.iter_mut().map(|(i, b)| (RigidBodyHandle(i), b))
    }
}

impl core::ops::Index<RigidBodyHandle> for RigidBodySet {
    type Output = RigidBody;

    #[track_caller]
    fn index(&self, handle: RigidBodyHandle) -> &RigidBody {
        match self.get(handle) {
            Some(body) => body,
            None => panic!("unknown rigid-body handle {:?}", handle),
        }
    }
}

impl core::ops::IndexMut<RigidBodyHandle> for RigidBodySet {
    #[track_caller]
    fn index_mut(&mut self, handle: RigidBodyHandle) -> &mut RigidBody {
        match self.get_mut(handle) {
            Some(body) => body,
            None => panic!("unknown rigid-body handle {:?}", handle),
        }
    }
}

#[cfg(test)]
mod test {
    use super::RigidBodySet;
    use crate::dynamics::{RigidBody, RigidBodyProperties};
    use crate::geometry::Collider;
    use crate::shape::Ball;

    #[test]
    fn inserted_colliders_know_their_parent() {
        let mut set = RigidBodySet::new();
        let body = RigidBody::new(RigidBodyProperties::default()).with_collider(Collider::new(Ball::new(1.0)));
        let handle = set.insert(body);
        assert_eq!(set[handle].collider().map(|c| c.parent()), Some(handle));

        let removed = set.remove(handle);
        assert!(removed.is_some());
        assert!(set.get(handle).is_none());

        // The slot is reused but the stale handle stays invalid.
        let other = set.insert(RigidBody::new(RigidBodyProperties::default()));
        assert_ne!(handle, other);
        assert!(!set.contains(handle));
    }
}

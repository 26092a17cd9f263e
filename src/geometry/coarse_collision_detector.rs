use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::dynamics::{RigidBodyHandle, RigidBodySet};
use crate::math::Real;
use crate::partitioning::{AabbTree, TreeNodeId};
use crate::query::Ray;
use hashbrown::HashMap;

/// The broad phase: a dynamic AABB tree over the world-space AABBs of every collider.
///
/// Colliders are identified by the handle of their parent body. Only colliders whose AABB
/// intersects the world bounds are registered in the tree.
#[derive(Clone, Debug)]
pub struct CoarseCollisionDetector {
    tree: AabbTree<RigidBodyHandle>,
    nodes: HashMap<RigidBodyHandle, TreeNodeId>,
    world_bounds: Aabb,
}

impl CoarseCollisionDetector {
    /// Creates an empty detector tracking colliders inside of `world_bounds`.
    pub fn new(world_bounds: Aabb) -> Self {
        Self {
            tree: AabbTree::new(),
            nodes: HashMap::default(),
            world_bounds,
        }
    }

    /// The region of space outside of which colliders are ignored.
    pub fn world_bounds(&self) -> &Aabb {
        &self.world_bounds
    }

    /// The number of colliders currently registered.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Is no collider registered?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Is the collider of `body` registered in the tree?
    pub fn contains(&self, body: RigidBodyHandle) -> bool {
        self.nodes.contains_key(&body)
    }

    /// The underlying AABB tree.
    pub fn tree(&self) -> &AabbTree<RigidBodyHandle> {
        &self.tree
    }

    /// Registers, or re-registers, the collider of `body` with the world-space `aabb`.
    ///
    /// Returns `false` if the AABB lies outside of the world bounds, in which case the collider
    /// is left unregistered.
    pub fn add_collider(&mut self, body: RigidBodyHandle, aabb: Aabb) -> bool {
        let _ = self.remove_collider(body);

        if !self.world_bounds.intersects(&aabb) {
            log::debug!("collider of {:?} is out of the world bounds", body);
            return false;
        }

        let id = self.tree.insert(aabb, body);
        let _ = self.nodes.insert(body, id);
        true
    }

    /// Unregisters the collider of `body`, returning `true` if it was registered.
    pub fn remove_collider(&mut self, body: RigidBodyHandle) -> bool {
        match self.nodes.remove(&body) {
            Some(id) => {
                let _ = self.tree.remove(id);
                true
            }
            None => false,
        }
    }

    /// Refits the tree leaves of every collider raising its `updated` flag.
    pub fn update(&mut self, bodies: &RigidBodySet) {
        for (handle, body) in bodies.iter() {
            match body.collider() {
                Some(collider) if collider.is_updated() => {
                    let _ = self.add_collider(handle, *collider.aabb());
                }
                Some(_) => {}
                None => {
                    let _ = self.remove_collider(handle);
                }
            }
        }
    }

    /// Calls `callback` on every pair of colliders with AABBs closer than `2 * epsilon`.
    pub fn calculate_collisions(
        &self,
        epsilon: Real,
        mut callback: impl FnMut(RigidBodyHandle, RigidBodyHandle),
    ) {
        self.tree.all_overlaps(epsilon, |a, b| callback(*a, *b))
    }

    /// Calls `callback` on every collider with an AABB, enlarged by `epsilon`, hit by `ray`
    /// before `max_toi`.
    pub fn calculate_intersections(
        &self,
        ray: &Ray,
        max_toi: Real,
        epsilon: Real,
        mut callback: impl FnMut(RigidBodyHandle),
    ) {
        self.tree
            .intersects_with(ray, max_toi, epsilon, |_, body| callback(*body))
    }
}

#[cfg(test)]
mod test {
    use super::CoarseCollisionDetector;
    use crate::bounding_volume::Aabb;
    use crate::dynamics::RigidBodyHandle;
    use crate::math::{Point, Vector};
    use crate::query::Ray;
    use crate::utils::Arena;

    fn handles(n: usize) -> Vec<RigidBodyHandle> {
        let mut arena = Arena::new();
        (0..n).map(|_| RigidBodyHandle(arena.insert(()))).collect()
    }

    fn cube(x: f32) -> Aabb {
        Aabb::from_half_extents(Point::new(x, 0.0, 0.0), Vector::repeat(0.5))
    }

    #[test]
    fn reports_overlapping_pairs_once() {
        let h = handles(3);
        let bounds = Aabb::from_half_extents(Point::origin(), Vector::repeat(100.0));
        let mut coarse = CoarseCollisionDetector::new(bounds);
        assert!(coarse.add_collider(h[0], cube(0.0)));
        assert!(coarse.add_collider(h[1], cube(0.9)));
        assert!(coarse.add_collider(h[2], cube(5.0)));

        let mut pairs = vec![];
        coarse.calculate_collisions(0.01, |a, b| pairs.push((a.min(b), a.max(b))));
        assert_eq!(pairs, vec![(h[0].min(h[1]), h[0].max(h[1]))]);

        // Re-registering replaces the previous leaf.
        assert!(coarse.add_collider(h[2], cube(1.8)));
        assert_eq!(coarse.len(), 3);
        let mut count = 0;
        coarse.calculate_collisions(0.01, |_, _| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn out_of_bounds_colliders_are_unregistered() {
        let h = handles(1);
        let bounds = Aabb::from_half_extents(Point::origin(), Vector::repeat(10.0));
        let mut coarse = CoarseCollisionDetector::new(bounds);

        assert!(coarse.add_collider(h[0], cube(0.0)));
        assert!(!coarse.add_collider(h[0], cube(50.0)));
        assert!(!coarse.contains(h[0]));
        assert!(coarse.is_empty());
        assert!(coarse.add_collider(h[0], cube(9.0)));
        assert!(coarse.contains(h[0]));
    }

    #[test]
    fn ray_reports_crossed_colliders() {
        let h = handles(3);
        let bounds = Aabb::from_half_extents(Point::origin(), Vector::repeat(100.0));
        let mut coarse = CoarseCollisionDetector::new(bounds);
        let _ = coarse.add_collider(h[0], cube(0.0));
        let _ = coarse.add_collider(h[1], cube(3.0));
        let _ = coarse.add_collider(h[2], cube(3.0).translated(&Vector::new(0.0, 4.0, 0.0)));

        let ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::x());
        let mut hits = vec![];
        coarse.calculate_intersections(&ray, 100.0, 0.0, |b| hits.push(b));
        hits.sort();
        let mut expected = vec![h[0], h[1]];
        expected.sort();
        assert_eq!(hits, expected);

        hits.clear();
        coarse.calculate_intersections(&ray, 6.0, 0.0, |b| hits.push(b));
        assert_eq!(hits, vec![h[0]]);
    }
}

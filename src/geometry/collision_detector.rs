use crate::bounding_volume::Aabb;
use crate::dynamics::{RigidBody, RigidBodyHandle, RigidBodySet};
use crate::geometry::{CoarseCollisionDetector, FineCollisionDetector, Manifold, ManifoldFlags};
use crate::math::{Point, Real, Vector};
use crate::query::{ContactOptions, Ray, RayCast};
use crate::utils::SortedPair;
use hashbrown::HashMap;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Receives the contact manifolds produced by every collision detection update.
///
/// Listeners are `Send` so that a whole update can run on a worker thread.
pub trait CollisionListener: Send {
    /// Called once per live manifold at the end of every update.
    fn manifold_updated(&mut self, manifold: &Manifold, bodies: &RigidBodySet) {
        let _ = (manifold, bodies);
    }

    /// Called when a manifold stops intersecting or when one of its bodies is removed.
    fn manifold_removed(&mut self, manifold: &Manifold) {
        let _ = manifold;
    }
}

/// A ray hit reported by [`CollisionDetector::ray_cast_all`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RayHit {
    /// The body whose collider was hit.
    pub body: RigidBodyHandle,
    /// The time of impact of the ray with the collider.
    pub time_of_impact: Real,
    /// The world-space point hit.
    pub point: Point<Real>,
    /// The world-space normal at the point hit.
    pub normal: Vector<Real>,
}

/// Parameters of the [`CollisionDetector`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionDetectorOptions {
    /// The region of space where collisions are detected.
    pub world_bounds: Aabb,
    /// The margin by which AABBs are enlarged in the coarse phase.
    pub aabb_epsilon: Real,
    /// The maximum number of simultaneous manifolds.
    pub max_colliders_intersecting: usize,
    /// The parameters of the contact generation.
    pub contact_options: ContactOptions,
    /// The distance under which a new contact updates an existing one.
    pub contact_separation: Real,
}

/// Orchestrates the coarse and fine phases and maintains the contact manifolds.
///
/// Each pair of bodies goes through the states `NoManifold → Intersecting → (Updated |
/// Disjoint) → removed`: a manifold is created when the coarse phase first reports the pair,
/// re-evaluated in place while the pair's AABBs overlap, and erased in the update where the
/// pair stops intersecting.
#[derive(Clone, Debug)]
pub struct CollisionDetector {
    coarse: CoarseCollisionDetector,
    fine: FineCollisionDetector,
    manifolds: HashMap<SortedPair<RigidBodyHandle>, Manifold>,
    aabb_epsilon: Real,
    max_colliders_intersecting: usize,
}

impl CollisionDetector {
    /// Creates a collision detector without any manifold.
    pub fn new(options: CollisionDetectorOptions) -> Self {
        Self {
            coarse: CoarseCollisionDetector::new(options.world_bounds),
            fine: FineCollisionDetector::new(options.contact_options, options.contact_separation),
            manifolds: HashMap::default(),
            aabb_epsilon: options.aabb_epsilon,
            max_colliders_intersecting: options.max_colliders_intersecting,
        }
    }

    /// The broad phase.
    pub fn coarse(&self) -> &CoarseCollisionDetector {
        &self.coarse
    }

    /// The broad phase.
    pub fn coarse_mut(&mut self) -> &mut CoarseCollisionDetector {
        &mut self.coarse
    }

    /// The narrow phase.
    pub fn fine(&self) -> &FineCollisionDetector {
        &self.fine
    }

    /// The number of live manifolds.
    pub fn num_manifolds(&self) -> usize {
        self.manifolds.len()
    }

    /// The manifold between two bodies, if any.
    pub fn manifold(&self, body1: RigidBodyHandle, body2: RigidBodyHandle) -> Option<&Manifold> {
        self.manifolds.get(&SortedPair::new(body1, body2))
    }

    /// Iterates through every live manifold.
    pub fn manifolds(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    /// Runs one collision detection update and notifies every listener.
    ///
    /// With `parallel` set (and the `parallel` feature enabled), the narrow phase of each
    /// manifold runs on the current rayon thread pool.
    pub fn update(
        &mut self,
        bodies: &RigidBodySet,
        listeners: &mut [&mut dyn CollisionListener],
        parallel: bool,
    ) {
        self.coarse.update(bodies);

        for manifold in self.manifolds.values_mut() {
            manifold.set_flags(ManifoldFlags::UPDATED);
            manifold.candidate = false;
        }

        let manifolds = &mut self.manifolds;
        let max_manifolds = self.max_colliders_intersecting;
        self.coarse
            .calculate_collisions(self.aabb_epsilon, |h1, h2| {
                let (Some(b1), Some(b2)) = (bodies.get(h1), bodies.get(h2)) else {
                    return;
                };
                let pair = SortedPair::new(h1, h2);

                if !is_active(b1) && !is_active(b2) {
                    // Keep the contacts of resting pairs until one of them wakes up.
                    if let Some(manifold) = manifolds.get_mut(&pair) {
                        if !manifold.is_empty() {
                            manifold.insert_flags(ManifoldFlags::INTERSECTING);
                        }
                    }
                    return;
                }

                if let Some(manifold) = manifolds.get_mut(&pair) {
                    manifold.candidate = true;
                } else if manifolds.len() >= max_manifolds {
                    log::warn!(
                        "too many intersecting colliders ({}), ignoring the pair {:?}",
                        max_manifolds,
                        pair
                    );
                } else {
                    let mut manifold = Manifold::new(pair);
                    manifold.set_flags(ManifoldFlags::UPDATED);
                    manifold.candidate = true;
                    let _ = manifolds.insert(pair, manifold);
                }
            });

        let fine = &self.fine;
        let evaluate = |manifold: &mut Manifold| {
            let body1 = bodies.get(manifold.body1());
            let body2 = bodies.get(manifold.body2());
            if let (Some(c1), Some(c2)) = (
                body1.and_then(|b| b.collider()),
                body2.and_then(|b| b.collider()),
            ) {
                let _ = fine.evaluate(c1, c2, manifold);
            }
        };

        let mut candidates: Vec<&mut Manifold> = self
            .manifolds
            .values_mut()
            .filter(|m| m.candidate)
            .collect();

        #[cfg(feature = "parallel")]
        {
            if parallel {
                candidates.par_iter_mut().for_each(|m| evaluate(&mut **m));
            } else {
                candidates.iter_mut().for_each(|m| evaluate(&mut **m));
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = parallel;
            candidates.iter_mut().for_each(|m| evaluate(&mut **m));
        }

        self.manifolds.retain(|_, manifold| {
            manifold.candidate = false;
            if manifold.is_intersecting() {
                true
            } else {
                for listener in listeners.iter_mut() {
                    listener.manifold_removed(manifold);
                }
                false
            }
        });

        // Notify in a deterministic order.
        let mut pairs: Vec<_> = self.manifolds.keys().copied().collect();
        pairs.sort_unstable();

        for pair in pairs {
            if let Some(manifold) = self.manifolds.get(&pair) {
                for listener in listeners.iter_mut() {
                    listener.manifold_updated(manifold, bodies);
                }
            }
        }
    }

    /// Unregisters the collider of `body` and erases all of its manifolds.
    pub fn remove_body(&mut self, body: RigidBodyHandle, listeners: &mut [&mut dyn CollisionListener]) {
        let _ = self.coarse.remove_collider(body);
        self.manifolds.retain(|pair, manifold| {
            if pair.contains(&body) {
                for listener in listeners.iter_mut() {
                    listener.manifold_removed(manifold);
                }
                false
            } else {
                true
            }
        });
    }

    /// Casts a ray against every collider, returning the hits sorted by time of impact.
    ///
    /// Only the bodies for which `filter` returns `true` are tested.
    pub fn ray_cast_all(
        &self,
        bodies: &RigidBodySet,
        ray: &Ray,
        max_toi: Real,
        mut filter: impl FnMut(RigidBodyHandle, &RigidBody) -> bool,
    ) -> Vec<RayHit> {
        let mut hits = Vec::new();

        self.coarse
            .calculate_intersections(ray, max_toi, self.aabb_epsilon, |handle| {
                let Some(body) = bodies.get(handle) else {
                    return;
                };
                let Some(collider) = body.collider() else {
                    return;
                };

                if !filter(handle, body) {
                    return;
                }

                if let Some(hit) = collider
                    .shape()
                    .cast_ray_and_get_normal(collider.position(), ray, max_toi, true)
                {
                    hits.push(RayHit {
                        body: handle,
                        time_of_impact: hit.time_of_impact,
                        point: ray.point_at(hit.time_of_impact),
                        normal: hit.normal,
                    });
                }
            });

        hits.sort_by(|a, b| a.time_of_impact.total_cmp(&b.time_of_impact));
        hits
    }

    /// The first collider hit by a ray, if any.
    pub fn ray_cast_first(&self, bodies: &RigidBodySet, ray: &Ray, max_toi: Real) -> Option<RayHit> {
        self.ray_cast_all(bodies, ray, max_toi, |_, _| true)
            .into_iter()
            .next()
    }
}

/// Can the body move during the next step?
fn is_active(body: &RigidBody) -> bool {
    !body.is_immovable() && !body.is_sleeping()
}

#[cfg(test)]
mod test {
    use super::{CollisionDetector, CollisionListener};
    use crate::dynamics::{RigidBody, RigidBodySet};
    use crate::geometry::{Collider, Manifold};
    use crate::math::{Point, Vector};
    use crate::pipeline::WorldConfig;
    use crate::query::Ray;
    use crate::shape::Ball;

    #[derive(Default)]
    struct Counter {
        updated: usize,
        removed: usize,
    }

    impl CollisionListener for Counter {
        fn manifold_updated(&mut self, _: &Manifold, _: &RigidBodySet) {
            self.updated += 1;
        }

        fn manifold_removed(&mut self, _: &Manifold) {
            self.removed += 1;
        }
    }

    fn ball_at(x: f32) -> RigidBody {
        RigidBody::dynamic_with_collider(Collider::new(Ball::new(0.5)), 1.0)
            .with_position(Point::new(x, 0.0, 0.0))
    }

    fn detector() -> CollisionDetector {
        CollisionDetector::new(WorldConfig::default().collision_detector_options())
    }

    #[test]
    fn manifolds_live_while_the_pair_intersects() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(ball_at(0.0));
        let b = bodies.insert(ball_at(0.9));
        let mut detector = detector();
        let mut counter = Counter::default();

        detector.update(&bodies, &mut [&mut counter], false);
        assert_eq!(detector.num_manifolds(), 1);
        assert_eq!(counter.updated, 1);
        let manifold = detector.manifold(b, a).unwrap();
        assert!(manifold.is_intersecting());
        assert_relative_eq!(manifold.max_depth(), 0.1, epsilon = 1.0e-5);
        assert_relative_eq!(manifold.contacts()[0].normal.into_inner(), Vector::x(), epsilon = 1.0e-5);

        bodies[b].set_position(Point::new(3.0, 0.0, 0.0));
        detector.update(&bodies, &mut [&mut counter], false);
        assert_eq!(detector.num_manifolds(), 0);
        assert_eq!(counter.removed, 1);
        assert_eq!(counter.updated, 1);
    }

    #[test]
    fn resting_pairs_are_not_reevaluated() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(ball_at(0.0));
        let b = bodies.insert(ball_at(0.9));
        let mut detector = detector();
        detector.update(&bodies, &mut [], false);

        bodies[a].sleep();
        bodies[b].sleep();
        detector.update(&bodies, &mut [], false);
        assert!(detector.manifold(a, b).is_some_and(|m| !m.is_empty()));
    }

    #[test]
    fn manifold_budget_is_respected() {
        let mut bodies = RigidBodySet::new();
        for i in 0..4 {
            let _ = bodies.insert(ball_at(i as f32 * 0.9));
        }
        let mut options = WorldConfig::default().collision_detector_options();
        options.max_colliders_intersecting = 2;
        let mut detector = CollisionDetector::new(options);
        detector.update(&bodies, &mut [], false);
        assert_eq!(detector.num_manifolds(), 2);
    }

    #[test]
    fn removing_a_body_notifies_listeners() {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(ball_at(0.0));
        let _ = bodies.insert(ball_at(0.9));
        let _ = bodies.insert(ball_at(-0.9));
        let mut detector = detector();
        detector.update(&bodies, &mut [], false);
        assert_eq!(detector.num_manifolds(), 2);

        let mut counter = Counter::default();
        detector.remove_body(a, &mut [&mut counter]);
        assert_eq!(counter.removed, 2);
        assert_eq!(detector.num_manifolds(), 0);
        assert!(!detector.coarse().contains(a));

        let ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::x());
        let hit = detector.ray_cast_first(&bodies, &ray, 10.0).unwrap();
        assert_relative_eq!(hit.time_of_impact, 3.6, epsilon = 1.0e-4);
    }
}

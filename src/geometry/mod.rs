//! Colliders, contact manifolds, and the coarse and fine collision detection phases.

pub use self::coarse_collision_detector::CoarseCollisionDetector;
pub use self::collider::Collider;
pub use self::collision_detector::{
    CollisionDetector, CollisionDetectorOptions, CollisionListener, RayHit,
};
pub use self::fine_collision_detector::FineCollisionDetector;
pub use self::manifold::{reduce_contacts, Contact, Manifold, ManifoldFlags, MAX_MANIFOLD_CONTACTS};

mod coarse_collision_detector;
mod collider;
mod collision_detector;
mod fine_collision_detector;
mod manifold;

//! Ray casting against shapes and bounding volumes.

pub use self::ray::{Ray, RayCast, RayIntersection};
pub use self::ray_ball::ray_toi_with_ball;
pub use self::ray_concave::local_ray_intersection_with_concave_shape;
pub use self::ray_convex_polyhedron::local_ray_intersection_with_planes;
pub use self::ray_triangle::local_ray_intersection_with_triangle;

mod ray;
mod ray_aabb;
mod ray_ball;
mod ray_concave;
mod ray_convex_polyhedron;
mod ray_triangle;

#[macro_use]
extern crate approx;
extern crate nalgebra as na;

use impulse3d::prelude::*;

mod constraint_bounds;
mod free_fall;
mod listeners;
#[cfg(feature = "parallel")]
mod parallel;
mod ray_cast;
mod removal;
mod resting_contact;
mod sleeping;

/// A static box whose top face lies on the `y = 0` plane.
pub fn ground() -> RigidBody {
    let shape = ConvexPolyhedron::cuboid(Vector::new(10.0, 0.5, 10.0));
    RigidBody::fixed()
        .with_collider(Collider::new(shape))
        .with_position(Point::new(0.0, -0.5, 0.0))
}

/// A unit dynamic cube of density 1.
pub fn unit_box(position: Point<Real>) -> RigidBody {
    let shape = ConvexPolyhedron::cuboid(Vector::repeat(0.5));
    RigidBody::dynamic_with_collider(Collider::new(shape), 1.0).with_position(position)
}

pub fn ball(radius: Real, position: Point<Real>) -> RigidBody {
    RigidBody::dynamic_with_collider(Collider::new(Ball::new(radius)), 1.0).with_position(position)
}

pub fn run(world: &RigidBodyWorld, seconds: Real) {
    let dt = 1.0 / 60.0;
    let steps = (seconds / dt).round() as usize;
    for _ in 0..steps {
        world.update(dt);
    }
}

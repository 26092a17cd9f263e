use crate::{ball, ground, run, unit_box};
use impulse3d::prelude::*;

fn floating_body(world: &RigidBodyWorld) -> RigidBodyHandle {
    world.add_rigid_body(RigidBody::new(RigidBodyProperties::default()).with_position(Point::new(0.0, 5.0, 0.0)))
}

#[test]
fn sleeping_is_idempotent() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let body = floating_body(&world);
    let _ = world.with_body_mut(body, |b| b.sleep());
    let _ = world.with_body_mut(body, |b| b.sleep());
    let before = world.body_snapshot(body).unwrap();
    assert!(before.sleeping);

    run(&world, 1.0);

    let after = world.body_snapshot(body).unwrap();
    assert!(after.sleeping);
    assert_eq!(after.position, before.position);
    assert_eq!(after.linvel, Vector::zeros());
    assert_eq!(after.angvel, Vector::zeros());
}

#[test]
fn state_edits_wake_bodies_up() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let body = floating_body(&world);

    let _ = world.with_body_mut(body, |b| b.sleep());
    assert!(world.set_velocity(body, Vector::x(), Vector::zeros()));
    assert!(!world.body_snapshot(body).unwrap().sleeping);

    let _ = world.with_body_mut(body, |b| b.sleep());
    assert!(world.set_transform(body, Point::new(1.0, 2.0, 3.0), Rotation::identity()));
    let snapshot = world.body_snapshot(body).unwrap();
    assert!(!snapshot.sleeping);
    assert_eq!(snapshot.position.translation.vector, Vector::new(1.0, 2.0, 3.0));

    let _ = world.with_body_mut(body, |b| b.sleep());
    let _ = world.with_body_mut(body, |b| b.apply_impulse(Vector::y(), &Point::new(1.0, 2.0, 3.0)));
    assert!(!world.body_snapshot(body).unwrap().sleeping);

    let _ = world.with_body_mut(body, |b| b.sleep());
    let force = world.add_force(ConstantForce::new(Vector::x()));
    assert!(world.attach_force(body, force));
    assert!(!world.body_snapshot(body).unwrap().sleeping);

    let y = world.body_snapshot(body).unwrap().position.translation.y;
    run(&world, 0.5);
    assert!(world.body_snapshot(body).unwrap().position.translation.y < y);
}

#[test]
fn resting_bodies_fall_asleep_unless_disabled() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let _ = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));
    run(&world, 3.0);
    let snapshot = world.body_snapshot(cube).unwrap();
    assert!(snapshot.sleeping);
    assert_eq!(snapshot.linvel, Vector::zeros());

    let mut config = WorldConfig::default();
    config.sleep.enabled = false;
    let world = RigidBodyWorld::new(config).unwrap();
    let _ = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));
    run(&world, 3.0);
    assert!(!world.body_snapshot(cube).unwrap().sleeping);
}

#[test]
fn contact_wakes_sleeping_bodies_up() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    // A sleeping box floating in the air, and a ball dropped on it.
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.0, 0.0)));
    let _ = world.with_body_mut(cube, |b| b.sleep());
    let _ = world.add_rigid_body(ball(0.5, Point::new(0.0, 2.0, 0.0)));

    run(&world, 0.2);
    assert!(world.body_snapshot(cube).unwrap().sleeping);

    run(&world, 0.8);
    let snapshot = world.body_snapshot(cube).unwrap();
    assert!(!snapshot.sleeping);
    assert!(snapshot.position.translation.y < -0.1);
}

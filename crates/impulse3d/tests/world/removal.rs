use crate::{ball, ground, run, unit_box};
use impulse3d::prelude::*;

#[test]
fn removing_a_body_removes_its_manifolds_and_constraints() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let ground = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));
    let other = world.add_rigid_body(unit_box(Point::new(3.0, 0.5, 0.0)));

    run(&world, 0.2);
    assert_eq!(world.num_manifolds(), 2);
    assert!(world.num_contacts() > 0);
    assert_eq!(world.num_constraints(), 3 * world.num_contacts());
    assert!(world.has_constraints(cube));

    assert!(world.remove_rigid_body(cube).is_some());
    assert_eq!(world.num_bodies(), 2);
    assert_eq!(world.num_manifolds(), 1);
    assert!(world.manifold(ground, cube).is_none());
    assert!(!world.has_constraints(cube));
    assert!(world.has_constraints(other));
    assert_eq!(world.num_constraints(), 3 * world.num_contacts());

    assert!(world.remove_rigid_body(ground).is_some());
    assert_eq!(world.num_manifolds(), 0);
    assert_eq!(world.num_constraints(), 0);
    assert_eq!(world.num_contacts(), 0);
    assert!(!world.has_constraints(other));

    // The remaining body falls freely.
    run(&world, 0.5);
    assert!(world.body_snapshot(other).unwrap().position.translation.y < 0.0);
    assert_eq!(world.num_manifolds(), 0);
}

#[test]
fn removing_the_support_wakes_resting_bodies_up() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let ground = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));

    run(&world, 3.0);
    assert!(world.body_snapshot(cube).unwrap().sleeping);

    let _ = world.remove_rigid_body(ground);
    assert!(!world.body_snapshot(cube).unwrap().sleeping);

    run(&world, 1.0);
    assert!(world.body_snapshot(cube).unwrap().position.translation.y < -1.0);
}

#[test]
fn removing_a_collider_drops_its_manifolds() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let ground = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));

    run(&world, 0.2);
    assert!(world.manifold(ground, cube).is_some());

    let removed = world.with_body_mut(cube, |b| b.set_collider(None)).unwrap();
    assert!(removed.is_some());
    world.update(1.0 / 60.0);
    assert!(world.manifold(ground, cube).is_none());
    assert_eq!(world.num_constraints(), 0);
}

#[test]
fn a_removed_static_body_collides_again_once_added_back() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let ground = world.add_rigid_body(ground());
    world.update(1.0 / 60.0);

    let ground = world.add_rigid_body(world.remove_rigid_body(ground).unwrap());
    let ball = world.add_rigid_body(ball(0.5, Point::new(0.0, 2.0, 0.0)));

    run(&world, 2.0);
    assert!(world.manifold(ground, ball).is_some());
    let y = world.body_snapshot(ball).unwrap().position.translation.y;
    assert!(y > 0.3 && y < 0.6, "ball ended at y = {}", y);
}

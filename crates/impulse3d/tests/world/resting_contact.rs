use crate::{ball, ground, run, unit_box};
use impulse3d::prelude::*;

#[test]
fn box_comes_to_rest_on_static_ground() {
    let config = WorldConfig::default();
    let world = RigidBodyWorld::new(config).unwrap();
    let _ = world.add_rigid_body(ground());
    let cube = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));

    run(&world, 2.0);

    let snapshot = world.body_snapshot(cube).unwrap();
    let penetration = 0.5 - snapshot.position.translation.y;
    assert!(snapshot.linvel.y.abs() < 1.0e-2, "{:?}", snapshot.linvel);
    assert!(penetration < config.solver.penetration_slop, "{}", penetration);
    assert!(penetration > -1.0e-2, "{}", penetration);
    assert!(snapshot.position.rotation.angle() < 1.0e-2);
}

#[test]
fn ball_comes_to_rest_on_static_ground() {
    let config = WorldConfig {
        num_substeps: 2,
        ..WorldConfig::default()
    };
    let world = RigidBodyWorld::new(config).unwrap();
    let ground = world.add_rigid_body(ground());
    let ball = world.add_rigid_body(ball(0.5, Point::new(1.0, 0.5, -2.0)));

    run(&world, 2.0);

    let snapshot = world.body_snapshot(ball).unwrap();
    let penetration = 0.5 - snapshot.position.translation.y;
    assert!(snapshot.linvel.norm() < 1.0e-2);
    assert!(penetration < config.solver.penetration_slop, "{}", penetration);
    assert_relative_eq!(snapshot.position.translation.x, 1.0, epsilon = 1.0e-3);

    let manifold = world.manifold(ground, ball).unwrap();
    assert_eq!(manifold.body1(), ground);
    assert_eq!(manifold.len(), 1);
    assert_relative_eq!(manifold.contacts()[0].normal.y, 1.0, epsilon = 1.0e-3);
}

#[test]
fn stacked_boxes_stay_stacked() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let _ = world.add_rigid_body(ground());
    let bottom = world.add_rigid_body(unit_box(Point::new(0.0, 0.5, 0.0)));
    let top = world.add_rigid_body(unit_box(Point::new(0.0, 1.5, 0.0)));

    run(&world, 2.0);

    let bottom = world.body_snapshot(bottom).unwrap().position.translation.vector;
    let top = world.body_snapshot(top).unwrap().position.translation.vector;
    assert_relative_eq!(bottom.y, 0.5, epsilon = 0.05);
    assert_relative_eq!(top.y, 1.5, epsilon = 0.1);
    assert!((top.xz() - bottom.xz()).norm() < 0.05);
}

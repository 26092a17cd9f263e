use crate::run;
use impulse3d::prelude::*;

fn fall_for_one_second(num_substeps: u32) -> RigidBodySnapshot {
    let config = WorldConfig {
        num_substeps,
        ..WorldConfig::default()
    };
    let world = RigidBodyWorld::new(config).unwrap();
    let props = RigidBodyProperties::default().with_damping(0.0, 0.0);
    let body = world.add_rigid_body(RigidBody::new(props).with_position(Point::new(0.0, 10.0, 0.0)));
    run(&world, 1.0);
    world.body_snapshot(body).unwrap()
}

#[test]
fn constant_gravity_matches_the_analytic_solution() {
    let g = 9.81;

    for substeps in [1, 4] {
        let snapshot = fall_for_one_second(substeps);
        assert!(!snapshot.sleeping);
        assert_relative_eq!(snapshot.linvel.y, -g, epsilon = 1.0e-3);
        assert_relative_eq!(snapshot.linvel.x, 0.0);
        // Semi-implicit Euler overshoots by g·dt/2.
        assert_relative_eq!(snapshot.position.translation.y, 10.0 - g / 2.0, epsilon = 0.1);
    }
}

#[test]
fn substeps_do_not_change_the_trajectory() {
    let one = fall_for_one_second(1);
    let four = fall_for_one_second(4);
    assert_relative_eq!(one.linvel, four.linvel, epsilon = 1.0e-3);
    assert_relative_eq!(
        one.position.translation.vector,
        four.position.translation.vector,
        epsilon = 0.1
    );
}

#[test]
fn attached_forces_act_on_their_bodies_only() {
    let config = WorldConfig {
        gravity: Vector::zeros(),
        ..WorldConfig::default()
    };
    let world = RigidBodyWorld::new(config).unwrap();
    let props = RigidBodyProperties::default().with_damping(0.0, 0.0);
    let pushed = world.add_rigid_body(RigidBody::new(props));
    let idle = world.add_rigid_body(RigidBody::new(props).with_position(Point::new(5.0, 0.0, 0.0)));

    let push = world.add_force(ConstantForce::new(Vector::new(2.0, 0.0, 0.0)));
    assert!(world.attach_force(pushed, push));
    assert!(!world.attach_force(pushed, push));

    run(&world, 0.5);
    let vx = world.body_snapshot(pushed).unwrap().linvel.x;
    assert_relative_eq!(vx, 1.0, epsilon = 1.0e-3);
    assert_eq!(world.body_snapshot(idle).unwrap().linvel, Vector::zeros());

    assert!(world.remove_force(push));
    assert!(!world.detach_force(pushed, push));
    assert!(world.with_body(pushed, |b| b.forces().is_empty()).unwrap());
    run(&world, 0.5);
    let vx_after = world.body_snapshot(pushed).unwrap().linvel.x;
    assert_relative_eq!(vx_after, vx, epsilon = 1.0e-5);
}

#[test]
fn gravity_force_adds_to_the_world_gravity() {
    let config = WorldConfig {
        gravity: Vector::zeros(),
        ..WorldConfig::default()
    };
    let world = RigidBodyWorld::new(config).unwrap();
    let props = RigidBodyProperties::default().with_damping(0.0, 0.0);
    let body = world.add_rigid_body(RigidBody::new(props));
    let gravity = world.add_force(Gravity::new(Vector::new(0.0, 0.0, -2.0)));
    assert!(world.attach_force(body, gravity));

    run(&world, 1.0);
    let snapshot = world.body_snapshot(body).unwrap();
    assert_relative_eq!(snapshot.linvel.z, -2.0, epsilon = 1.0e-3);
}

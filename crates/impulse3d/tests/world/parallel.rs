use crate::{ball, ground, run};
use impulse3d::prelude::*;

fn drop_balls(num_threads: usize) -> Vec<RigidBodySnapshot> {
    let config = WorldConfig {
        num_threads,
        ..WorldConfig::default()
    };
    let world = RigidBodyWorld::new(config).unwrap();
    let _ = world.add_rigid_body(ground());
    let balls: Vec<_> = (0..16)
        .map(|i| {
            let x = (i % 4) as Real * 1.5 - 2.25;
            let z = (i / 4) as Real * 1.5 - 2.25;
            world.add_rigid_body(ball(0.5, Point::new(x, 1.0 + 0.1 * i as Real, z)))
        })
        .collect();

    run(&world, 2.0);
    balls
        .into_iter()
        .map(|h| world.body_snapshot(h).unwrap())
        .collect()
}

#[test]
fn worker_pool_matches_the_caller_thread() {
    let sequential = drop_balls(1);
    let parallel = drop_balls(4);

    for (a, b) in sequential.iter().zip(parallel.iter()) {
        assert!(b.position.translation.y > 0.4 && b.position.translation.y < 0.6);
        assert_relative_eq!(
            a.position.translation.vector,
            b.position.translation.vector,
            epsilon = 1.0e-3
        );
    }
}

#[test]
fn zero_threads_uses_every_core() {
    let config = WorldConfig {
        num_threads: 0,
        ..WorldConfig::default()
    };
    assert!(RigidBodyWorld::new(config).is_ok());
}

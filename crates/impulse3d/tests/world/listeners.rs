use crate::{ball, ground, run};
use impulse3d::dynamics::RigidBodySet;
use impulse3d::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Events {
    updated: usize,
    removed: usize,
    max_contacts: usize,
}

struct Recorder(Arc<Mutex<Events>>);

impl CollisionListener for Recorder {
    fn manifold_updated(&mut self, manifold: &Manifold, bodies: &RigidBodySet) {
        assert!(bodies.contains(manifold.body1()));
        assert!(bodies.contains(manifold.body2()));
        let mut events = self.0.lock().unwrap();
        events.updated += 1;
        events.max_contacts = events.max_contacts.max(manifold.len());
    }

    fn manifold_removed(&mut self, _manifold: &Manifold) {
        self.0.lock().unwrap().removed += 1;
    }
}

#[test]
fn listeners_see_every_manifold_update_and_removal() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let events = Arc::new(Mutex::new(Events::default()));
    world.add_collision_listener(Box::new(Recorder(events.clone())));

    let ground = world.add_rigid_body(ground());
    let _ = world.add_rigid_body(ball(0.5, Point::new(0.0, 0.5, 0.0)));

    run(&world, 0.5);
    {
        let events = events.lock().unwrap();
        // One notification per update once the ball sinks into the ground.
        assert!(events.updated >= 25, "{}", events.updated);
        assert_eq!(events.removed, 0);
        assert_eq!(events.max_contacts, 1);
    }

    let _ = world.remove_rigid_body(ground);
    assert_eq!(events.lock().unwrap().removed, 1);

    run(&world, 0.5);
    assert_eq!(events.lock().unwrap().removed, 1);
}

#[test]
fn separating_bodies_remove_their_manifold() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let events = Arc::new(Mutex::new(Events::default()));
    world.add_collision_listener(Box::new(Recorder(events.clone())));

    let _ = world.add_rigid_body(ground());
    let ball = world.add_rigid_body(ball(0.5, Point::new(0.0, 0.5, 0.0)));
    run(&world, 0.2);
    assert_eq!(world.num_manifolds(), 1);

    assert!(world.set_velocity(ball, Vector::new(0.0, 10.0, 0.0), Vector::zeros()));
    run(&world, 0.2);
    assert_eq!(world.num_manifolds(), 0);
    assert_eq!(events.lock().unwrap().removed, 1);
}

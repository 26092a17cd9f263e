use impulse3d::prelude::*;

fn world_with_targets() -> (RigidBodyWorld, RigidBodyHandle, RigidBodyHandle) {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let ball = world.add_rigid_body(
        RigidBody::fixed()
            .with_collider(Collider::new(Ball::new(1.0)))
            .with_position(Point::origin()),
    );
    let cube = world.add_rigid_body(
        RigidBody::fixed()
            .with_collider(Collider::new(ConvexPolyhedron::cuboid(Vector::repeat(1.0))))
            .with_position(Point::new(5.0, 0.0, 0.0)),
    );
    // Colliders join the coarse tree during an update.
    world.update(1.0 / 60.0);
    (world, ball, cube)
}

#[test]
fn ray_cast_all_sorts_hits_by_time_of_impact() {
    let (world, ball, cube) = world_with_targets();
    let ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::x());

    let hits = world.ray_cast_all(&ray, 100.0, |_, _| true);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].body, ball);
    assert_eq!(hits[1].body, cube);
    assert_relative_eq!(hits[0].time_of_impact, 4.0, epsilon = 1.0e-4);
    assert_relative_eq!(hits[1].time_of_impact, 9.0, epsilon = 1.0e-4);
    assert_relative_eq!(hits[0].normal, -Vector::x(), epsilon = 1.0e-4);
    assert_relative_eq!(hits[1].point, Point::new(4.0, 0.0, 0.0), epsilon = 1.0e-4);
}

#[test]
fn ray_cast_respects_max_toi_and_filters() {
    let (world, ball, cube) = world_with_targets();
    let ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::x());

    let hits = world.ray_cast_all(&ray, 5.0, |_, _| true);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].body, ball);

    let hits = world.ray_cast_all(&ray, 100.0, |handle, _| handle != ball);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].body, cube);

    let first = world.ray_cast_first(&ray, 100.0).unwrap();
    assert_eq!(first.body, ball);

    let missing = Ray::new(Point::new(-5.0, 3.0, 0.0), Vector::x());
    assert!(world.ray_cast_first(&missing, 100.0).is_none());
}

#[test]
fn ray_cast_hits_concave_terrain() {
    let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
    let heights = na::DMatrix::from_element(5, 5, 0.0);
    let terrain = HeightField::new(heights, Vector::new(8.0, 1.0, 8.0)).unwrap();
    let terrain = world.add_rigid_body(RigidBody::fixed().with_collider(Collider::new(terrain)));
    world.update(1.0 / 60.0);

    let ray = Ray::new(Point::new(1.3, 10.0, 0.6), -Vector::y());
    let hit = world.ray_cast_first(&ray, 100.0).unwrap();
    assert_eq!(hit.body, terrain);
    assert_relative_eq!(hit.time_of_impact, 10.0, epsilon = 1.0e-4);
    assert_relative_eq!(hit.normal, Vector::y(), epsilon = 1.0e-4);
}

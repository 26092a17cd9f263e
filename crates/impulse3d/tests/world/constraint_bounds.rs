use crate::unit_box;
use impulse3d::dynamics::{CollisionSolver, ConstraintBehavior, ForceSet, RigidBodySet};
use impulse3d::geometry::CollisionDetector;
use impulse3d::prelude::*;

// Steps the simulation by hand to inspect the multipliers after every solve.
#[test]
fn multipliers_stay_within_their_bounds() {
    let config = WorldConfig::default();
    let dt = 1.0 / 60.0;
    let tilt = Rotation::from_axis_angle(&Vector::z_axis(), 0.35);
    let up = tilt * Vector::y();

    let mut bodies = RigidBodySet::new();
    let ground = bodies.insert(
        RigidBody::fixed()
            .with_collider(Collider::new(ConvexPolyhedron::cuboid(Vector::new(10.0, 0.5, 10.0))))
            .with_orientation(tilt)
            .with_position(Point::from(-up * 0.5)),
    );
    let cube = bodies.insert(unit_box(Point::from(up * 0.5)).with_orientation(tilt));

    let forces = ForceSet::new();
    let mut detector = CollisionDetector::new(config.collision_detector_options());
    let mut solver = CollisionSolver::new(
        config.solver.collision_solver_options(),
        config.solver.constraint_solver_options(),
    );

    let mut max_normal: Real = 0.0;
    let mut max_friction_bound: Real = 0.0;

    for _ in 0..120 {
        for (_, body) in bodies.iter_mut() {
            if body.is_immovable() {
                continue;
            }
            body.process_forces(&forces);
            body.add_force(config.gravity * body.mass());
            body.integrate(dt);
            body.update_transforms();
        }

        {
            let mut listeners: [&mut dyn CollisionListener; 1] = [&mut solver];
            detector.update(&bodies, &mut listeners, false);
        }
        solver.constraint_solver_mut().update(dt, &mut bodies);

        let constraints = solver.constraint_solver();
        for slot in solver.contact_constraints(ground, cube) {
            let normal = constraints.lambda(slot.normal).unwrap();
            assert!(normal >= 0.0, "{}", normal);
            max_normal = max_normal.max(normal);

            for handle in slot.friction {
                let (lo, hi) = constraints.constraint(handle).unwrap().bounds();
                let lambda = constraints.lambda(handle).unwrap();
                assert!(lo <= hi);
                assert!(lambda >= lo - 1.0e-5 && lambda <= hi + 1.0e-5, "{} not in [{}, {}]", lambda, lo, hi);
                max_friction_bound = max_friction_bound.max(hi);
            }
        }
    }

    assert!(max_normal > 0.0);
    assert!(max_friction_bound > 0.0);

    // Static friction holds the cube on a 20° slope.
    let slide = *bodies[cube].position() - Point::from(up * 0.5);
    assert!(slide.norm() < 0.1, "{:?}", slide);
}

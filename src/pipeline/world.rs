use crate::dynamics::{
    BodyStatus, CollisionSolver, Force, ForceHandle, ForceSet, RigidBody, RigidBodyHandle,
    RigidBodySet,
};
use crate::geometry::{CollisionDetector, CollisionListener, Manifold, RayHit};
use crate::math::{Isometry, Point, Real, Rotation, Vector};
use crate::pipeline::{WorldConfig, WorldConfigError};
use crate::query::Ray;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Error returned when a [`RigidBodyWorld`] cannot be created.
#[derive(thiserror::Error, Debug)]
pub enum WorldError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] WorldConfigError),
    /// The worker thread pool could not be built.
    #[cfg(feature = "parallel")]
    #[error("failed to build the worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A copy of the pose, velocities and sleep state of a rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidBodySnapshot {
    /// The body this snapshot was taken from.
    pub handle: RigidBodyHandle,
    /// The pose at the end of the last world update.
    pub position: Isometry<Real>,
    /// The pose at the start of the last world update.
    pub previous_position: Isometry<Real>,
    /// The linear velocity.
    pub linvel: Vector<Real>,
    /// The angular velocity.
    pub angvel: Vector<Real>,
    /// Is the body sleeping?
    pub sleeping: bool,
}

impl RigidBodySnapshot {
    fn new(body: &RigidBody) -> Self {
        Self {
            handle: body.handle(),
            position: *body.isometry(),
            previous_position: *body.previous_isometry(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
            sleeping: body.is_sleeping(),
        }
    }

    /// The pose interpolated between the start (`alpha = 0`) and the end (`alpha = 1`) of the
    /// last world update.
    pub fn interpolated(&self, alpha: Real) -> Isometry<Real> {
        let alpha = alpha.clamp(0.0, 1.0);
        self.previous_position
            .try_lerp_slerp(&self.position, alpha, crate::math::DEFAULT_EPSILON)
            .unwrap_or(if alpha < 0.5 {
                self.previous_position
            } else {
                self.position
            })
    }
}

struct WorldState {
    config: WorldConfig,
    bodies: RigidBodySet,
    forces: ForceSet,
    detector: CollisionDetector,
    collision_solver: CollisionSolver,
    listeners: Vec<Box<dyn CollisionListener + Send>>,
}

/// Runs work on the caller thread or on a dedicated worker pool.
struct Executor {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

#[cfg(feature = "parallel")]
impl Executor {
    fn new(num_threads: usize) -> Result<Self, WorldError> {
        let pool = if num_threads == 1 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("impulse3d-worker-{i}"))
                    .build()?,
            )
        };
        Ok(Self { pool })
    }

    fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

#[cfg(not(feature = "parallel"))]
impl Executor {
    fn new(num_threads: usize) -> Result<Self, WorldError> {
        if num_threads != 1 {
            log::debug!(
                "the `parallel` feature is disabled, running on the caller thread instead of {} worker(s)",
                num_threads
            );
        }
        Ok(Self {})
    }

    fn is_parallel(&self) -> bool {
        false
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        op()
    }
}

/// The rigid-body simulation: bodies, forces, collision detection and contact resolution.
///
/// Every operation locks the whole world; queries copy their results out.
///
/// # Example
///
/// ```rust
/// use impulse3d::prelude::*;
///
/// let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
/// let ground = Collider::new(ConvexPolyhedron::cuboid(Vector::new(10.0, 0.5, 10.0)));
/// let _ = world.add_rigid_body(RigidBody::fixed().with_collider(ground));
///
/// let ball = Collider::new(Ball::new(0.5));
/// let ball = world.add_rigid_body(
///     RigidBody::dynamic_with_collider(ball, 1.0).with_position(Point::new(0.0, 3.0, 0.0)),
/// );
///
/// for _ in 0..60 {
///     world.update(1.0 / 60.0);
/// }
///
/// let y = world.body_snapshot(ball).unwrap().position.translation.y;
/// assert!(y < 3.0 && y > 0.5);
/// ```
pub struct RigidBodyWorld {
    state: Mutex<WorldState>,
    executor: Executor,
}

impl RigidBodyWorld {
    /// Creates an empty world.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let executor = Executor::new(config.num_threads)?;

        let collision_solver = CollisionSolver::new(
            config.solver.collision_solver_options(),
            config.solver.constraint_solver_options(),
        );
        let state = WorldState {
            config,
            bodies: RigidBodySet::new(),
            forces: ForceSet::new(),
            detector: CollisionDetector::new(config.collision_detector_options()),
            collision_solver,
            listeners: Vec::new(),
        };

        Ok(Self {
            state: Mutex::new(state),
            executor,
        })
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configuration this world was created with.
    pub fn config(&self) -> WorldConfig {
        self.lock().config
    }

    /// Adds a body to the world. Its collider joins collision detection at the next update.
    pub fn add_rigid_body(&self, body: RigidBody) -> RigidBodyHandle {
        self.lock().bodies.insert(body)
    }

    /// Removes a body along with its manifolds and contact constraints.
    ///
    /// The bodies it was touching are woken up.
    pub fn remove_rigid_body(&self, handle: RigidBodyHandle) -> Option<RigidBody> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.bodies.contains(handle) {
            return None;
        }

        let touching: Vec<_> = state
            .detector
            .manifolds()
            .filter_map(|m| m.pair().other(handle))
            .collect();
        for other in touching {
            if let Some(body) = state.bodies.get_mut(other) {
                body.wake_up();
            }
        }

        let mut listeners = listeners(&mut state.collision_solver, &mut state.listeners);
        state.detector.remove_body(handle, &mut listeners);
        state.collision_solver.remove_body(handle);
        state.bodies.remove(handle)
    }

    /// The number of bodies.
    pub fn num_bodies(&self) -> usize {
        self.lock().bodies.len()
    }

    /// Registers a force. It acts on the bodies it is attached to.
    pub fn add_force(&self, force: impl Force + 'static) -> ForceHandle {
        self.lock().forces.insert(force)
    }

    /// Unregisters a force, detaching it from every body.
    pub fn remove_force(&self, handle: ForceHandle) -> bool {
        let mut state = self.lock();
        if !state.forces.contains(handle) {
            return false;
        }
        for (_, body) in state.bodies.iter_mut() {
            let _ = body.detach_force(handle);
        }
        state.forces.remove(handle).is_some()
    }

    /// Attaches a registered force to a body.
    ///
    /// Returns `false` if either handle is unknown or if the force was already attached.
    pub fn attach_force(&self, body: RigidBodyHandle, force: ForceHandle) -> bool {
        let mut state = self.lock();
        if !state.forces.contains(force) {
            return false;
        }
        state
            .bodies
            .get_mut(body)
            .is_some_and(|b| b.attach_force(force))
    }

    /// Detaches a force from a body.
    pub fn detach_force(&self, body: RigidBodyHandle, force: ForceHandle) -> bool {
        self.lock()
            .bodies
            .get_mut(body)
            .is_some_and(|b| b.detach_force(force))
    }

    /// Teleports a body, waking it up.
    pub fn set_transform(
        &self,
        handle: RigidBodyHandle,
        position: Point<Real>,
        orientation: Rotation<Real>,
    ) -> bool {
        self.with_body_mut(handle, |body| {
            body.set_position(position);
            body.set_orientation(orientation);
        })
        .is_some()
    }

    /// Sets the velocities of a body, waking it up.
    pub fn set_velocity(
        &self,
        handle: RigidBodyHandle,
        linvel: Vector<Real>,
        angvel: Vector<Real>,
    ) -> bool {
        self.with_body_mut(handle, |body| {
            body.set_linvel(linvel);
            body.set_angvel(angvel);
        })
        .is_some()
    }

    /// Calls `f` on a body.
    pub fn with_body<R>(&self, handle: RigidBodyHandle, f: impl FnOnce(&RigidBody) -> R) -> Option<R> {
        self.lock().bodies.get(handle).map(f)
    }

    /// Calls `f` on a body. Changes made through the body's setters are picked up by the
    /// next update.
    pub fn with_body_mut<R>(
        &self,
        handle: RigidBodyHandle,
        f: impl FnOnce(&mut RigidBody) -> R,
    ) -> Option<R> {
        self.lock().bodies.get_mut(handle).map(f)
    }

    /// A copy of the pose, velocities, and sleep state of a body.
    pub fn body_snapshot(&self, handle: RigidBodyHandle) -> Option<RigidBodySnapshot> {
        self.lock().bodies.get(handle).map(RigidBodySnapshot::new)
    }

    /// A snapshot of every body.
    pub fn snapshots(&self) -> Vec<RigidBodySnapshot> {
        self.lock()
            .bodies
            .iter()
            .map(|(_, body)| RigidBodySnapshot::new(body))
            .collect()
    }

    /// Registers a listener notified of every contact manifold change.
    pub fn add_collision_listener(&self, listener: Box<dyn CollisionListener + Send>) {
        self.lock().listeners.push(listener);
    }

    /// The first collider hit by a ray.
    pub fn ray_cast_first(&self, ray: &Ray, max_toi: Real) -> Option<RayHit> {
        let state = self.lock();
        state.detector.ray_cast_first(&state.bodies, ray, max_toi)
    }

    /// Every collider hit by a ray, sorted by time of impact.
    pub fn ray_cast_all(
        &self,
        ray: &Ray,
        max_toi: Real,
        filter: impl FnMut(RigidBodyHandle, &RigidBody) -> bool,
    ) -> Vec<RayHit> {
        let state = self.lock();
        state.detector.ray_cast_all(&state.bodies, ray, max_toi, filter)
    }

    /// The number of live contact manifolds.
    pub fn num_manifolds(&self) -> usize {
        self.lock().detector.num_manifolds()
    }

    /// The manifold between two bodies, if they are touching.
    pub fn manifold(&self, body1: RigidBodyHandle, body2: RigidBodyHandle) -> Option<Manifold> {
        self.lock().detector.manifold(body1, body2).cloned()
    }

    /// The number of constraints registered with the constraint solver.
    pub fn num_constraints(&self) -> usize {
        self.lock().collision_solver.constraint_solver().len()
    }

    /// The number of contacts turned into constraints.
    pub fn num_contacts(&self) -> usize {
        self.lock().collision_solver.num_contacts()
    }

    /// Is any constraint of the solver attached to `body`?
    pub fn has_constraints(&self, body: RigidBodyHandle) -> bool {
        self.lock()
            .collision_solver
            .constraint_solver()
            .contains_body(body)
    }

    /// Advances the simulation by `dt` seconds, split into the configured number of substeps.
    pub fn update(&self, dt: Real) {
        if !(dt > 0.0) || !dt.is_finite() {
            log::debug!("ignoring a world update with dt = {}", dt);
            return;
        }

        let mut guard = self.lock();
        let state = &mut *guard;

        for (_, body) in state.bodies.iter_mut() {
            body.begin_update();
        }
        state.wake_edited_neighbors();

        let num_substeps = state.config.num_substeps;
        let substep_dt = dt / num_substeps as Real;
        for _ in 0..num_substeps {
            state.substep(substep_dt, &self.executor);
        }

        for (_, body) in state.bodies.iter_mut() {
            body.clear_change_flags();
        }
    }
}

impl core::fmt::Debug for RigidBodyWorld {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.lock();
        f.debug_struct("RigidBodyWorld")
            .field("config", &state.config)
            .field("num_bodies", &state.bodies.len())
            .field("num_forces", &state.forces.len())
            .field("num_manifolds", &state.detector.num_manifolds())
            .field("num_listeners", &state.listeners.len())
            .finish()
    }
}

impl WorldState {
    fn substep(&mut self, dt: Real, executor: &Executor) {
        self.advance_bodies(dt, executor);

        let parallel = executor.is_parallel();
        let detector = &mut self.detector;
        let bodies = &self.bodies;
        let mut listeners = listeners(&mut self.collision_solver, &mut self.listeners);
        executor.install(|| detector.update(bodies, &mut listeners, parallel));

        self.wake_touched_sleepers();

        self.collision_solver
            .constraint_solver_mut()
            .update(dt, &mut self.bodies);

        if self.config.sleep.enabled {
            let sleep = self.config.sleep;
            for (_, body) in self.bodies.iter_mut() {
                let cap = sleep.motion_cap_factor * body.properties().sleep_motion;
                body.update_motion(sleep.motion_bias, cap);
            }
        }
    }

    /// Applies the forces then integrates every awake dynamic body.
    fn advance_bodies(&mut self, dt: Real, executor: &Executor) {
        let forces = &self.forces;
        let gravity = self.config.gravity;
        let advance = |body: &mut RigidBody| {
            if body.is_immovable() || body.is_sleeping() {
                return;
            }
            body.process_forces(forces);
            body.add_force(gravity * body.mass());
            body.integrate(dt);
            body.update_transforms();
        };

        #[cfg(feature = "parallel")]
        {
            if executor.is_parallel() {
                let mut bodies: Vec<&mut RigidBody> =
                    self.bodies.iter_mut().map(|(_, b)| b).collect();
                executor.install(|| bodies.par_iter_mut().for_each(|b| advance(&mut **b)));
                return;
            }
        }

        let _ = executor;
        for (_, body) in self.bodies.iter_mut() {
            advance(body);
        }
    }

    /// Wakes the sleeping bodies touching an awake dynamic body.
    fn wake_touched_sleepers(&mut self) {
        let mut to_wake = Vec::new();
        for manifold in self.detector.manifolds() {
            let (Some(b1), Some(b2)) = (
                self.bodies.get(manifold.body1()),
                self.bodies.get(manifold.body2()),
            ) else {
                continue;
            };

            if b1.is_sleeping() && is_awake_dynamic(b2) {
                to_wake.push(manifold.body1());
            } else if b2.is_sleeping() && is_awake_dynamic(b1) {
                to_wake.push(manifold.body2());
            }
        }

        for handle in to_wake {
            if let Some(body) = self.bodies.get_mut(handle) {
                log::trace!("waking {:?} up on contact", handle);
                body.wake_up();
            }
        }
    }

    /// Wakes the bodies touching a body edited since the last update.
    fn wake_edited_neighbors(&mut self) {
        let mut to_wake = Vec::new();
        for manifold in self.detector.manifolds() {
            let pair = manifold.pair();
            for (this, other) in [(pair.first(), pair.second()), (pair.second(), pair.first())] {
                let edited = self
                    .bodies
                    .get(this)
                    .is_some_and(|b| b.status().intersects(BodyStatus::CHANGED));
                if edited {
                    to_wake.push(other);
                }
            }
        }

        for handle in to_wake {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.wake_up();
            }
        }
    }
}

fn is_awake_dynamic(body: &RigidBody) -> bool {
    !body.is_immovable() && !body.is_sleeping()
}

/// The collision solver first, then the user listeners.
fn listeners<'a>(
    collision_solver: &'a mut CollisionSolver,
    user: &'a mut [Box<dyn CollisionListener + Send>],
) -> Vec<&'a mut dyn CollisionListener> {
    let mut listeners: Vec<&'a mut dyn CollisionListener> = Vec::with_capacity(1 + user.len());
    listeners.push(collision_solver);
    for listener in user.iter_mut() {
        listeners.push(listener.as_mut());
    }
    listeners
}

#[cfg(test)]
mod test {
    use super::{RigidBodySnapshot, RigidBodyWorld};
    use crate::dynamics::{RigidBody, RigidBodyProperties};
    use crate::geometry::Collider;
    use crate::math::{Isometry, Point, Real, Rotation, Translation, Vector};
    use crate::pipeline::{WorldConfig, WorldError};
    use crate::shape::Ball;

    #[test]
    fn invalid_configs_are_rejected() {
        let config = WorldConfig {
            num_substeps: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            RigidBodyWorld::new(config),
            Err(WorldError::Config(_))
        ));
    }

    #[test]
    fn snapshot_interpolation() {
        let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
        let props = RigidBodyProperties::default().with_damping(0.0, 0.0);
        let handle = world.add_rigid_body(
            RigidBody::new(props).with_linvel(Vector::new(1.0, 0.0, 0.0)),
        );
        world.update(0.1);

        let snapshot: RigidBodySnapshot = world.body_snapshot(handle).unwrap();
        let start = snapshot.interpolated(0.0).translation.vector;
        let end = snapshot.interpolated(1.0).translation.vector;
        let mid = snapshot.interpolated(0.5).translation.vector;
        assert_relative_eq!(start, Vector::zeros());
        assert_relative_eq!(end, snapshot.position.translation.vector);
        assert_relative_eq!(mid, (start + end) / 2.0, epsilon = 1.0e-6);
    }

    #[test]
    fn interpolation_slerps_orientations() {
        let rot = Rotation::<Real>::from_axis_angle(&Vector::y_axis(), 1.0);
        let snapshot = RigidBodySnapshot {
            handle: crate::dynamics::RigidBodyHandle::invalid(),
            position: Isometry::from_parts(Translation::identity(), rot),
            previous_position: Isometry::identity(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            sleeping: false,
        };
        let half = snapshot.interpolated(0.5);
        assert_relative_eq!(half.rotation.angle(), 0.5 as Real, epsilon = 1.0e-5);
    }

    #[test]
    fn unknown_handles_are_reported() {
        let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
        let handle = world.add_rigid_body(RigidBody::fixed());
        assert!(world.remove_rigid_body(handle).is_some());
        assert!(world.remove_rigid_body(handle).is_none());
        assert!(world.body_snapshot(handle).is_none());
        assert!(!world.set_velocity(handle, Vector::x(), Vector::zeros()));
        assert!(!world.set_transform(handle, Point::origin(), Rotation::identity()));
    }

    #[test]
    fn non_positive_timesteps_are_ignored() {
        let world = RigidBodyWorld::new(WorldConfig::default()).unwrap();
        let handle = world.add_rigid_body(
            RigidBody::dynamic_with_collider(Collider::new(Ball::new(0.5)), 1.0)
                .with_position(Point::new(0.0, 2.0, 0.0)),
        );
        world.update(0.0);
        world.update(-1.0);
        world.update(Real::NAN);
        let snapshot = world.body_snapshot(handle).unwrap();
        assert_eq!(snapshot.position.translation.y, 2.0);
    }
}

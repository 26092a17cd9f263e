use crate::dynamics::{ForceHandle, ForceSet, RigidBodyHandle};
use crate::geometry::Collider;
use crate::math::{AngularInertia, Isometry, Point, Real, Rotation, Translation, Vector};
use crate::shape::MassProperties;
use na::Quaternion;

/// Whether a rigid body is affected by forces and contacts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum RigidBodyKind {
    /// The body never moves by itself; it can still be teleported.
    Static,
    /// The body is integrated and reacts to contacts.
    #[default]
    Dynamic,
}

bitflags::bitflags! {
    /// The status of a rigid body.
    ///
    /// Every flag but `SLEEPING` is cleared at the end of each world update.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    pub struct BodyStatus: u8 {
        /// The body is asleep: it is neither integrated nor moved by contacts.
        const SLEEPING = 1 << 0;
        /// The properties changed since the last update.
        const PROPERTIES_CHANGED = 1 << 1;
        /// The pose or the velocities were edited since the last update.
        const STATE_CHANGED = 1 << 2;
        /// The collider was replaced or removed since the last update.
        const COLLIDER_CHANGED = 1 << 3;
        /// A force was attached or detached since the last update.
        const FORCES_CHANGED = 1 << 4;
        /// All the change flags.
        const CHANGED = Self::PROPERTIES_CHANGED.bits()
            | Self::STATE_CHANGED.bits()
            | Self::COLLIDER_CHANGED.bits()
            | Self::FORCES_CHANGED.bits();
    }
}

/// The mostly-constant properties of a rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidBodyProperties {
    /// Static or dynamic.
    pub kind: RigidBodyKind,
    /// The inverse of the mass. Zero makes the body immovable.
    pub inv_mass: Real,
    /// The inverse of the inertia tensor, in local-space.
    pub inv_inertia: AngularInertia<Real>,
    /// The fraction of linear velocity lost per second.
    pub linear_damping: Real,
    /// The fraction of angular velocity lost per second.
    pub angular_damping: Real,
    /// The friction coefficient.
    pub friction: Real,
    /// The motion below which the body falls asleep.
    pub sleep_motion: Real,
    /// Data left untouched by the engine.
    pub user_data: u128,
}

impl Default for RigidBodyProperties {
    fn default() -> Self {
        Self {
            kind: RigidBodyKind::Dynamic,
            inv_mass: 1.0,
            inv_inertia: AngularInertia::identity(),
            linear_damping: 0.01,
            angular_damping: 0.05,
            friction: 0.5,
            sleep_motion: 0.01,
            user_data: 0,
        }
    }
}

impl RigidBodyProperties {
    /// The properties of a static body.
    pub fn fixed() -> Self {
        Self {
            kind: RigidBodyKind::Static,
            ..Self::default()
        }
        .sanitized()
    }

    /// The properties of a dynamic body with the given mass properties.
    ///
    /// The body's origin is assumed to be its center of mass: the inertia is shifted
    /// accordingly if `mprops.local_com` is not at the origin.
    pub fn dynamic(mprops: &MassProperties) -> Self {
        let shifted = MassProperties::new(
            Point::origin(),
            mprops.mass,
            mprops.shifted_inertia(&mprops.local_com.coords),
        );

        Self {
            inv_mass: shifted.inv_mass(),
            inv_inertia: shifted.inv_inertia(),
            ..Self::default()
        }
    }

    /// Sets the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the linear and angular damping.
    #[must_use]
    pub fn with_damping(mut self, linear: Real, angular: Real) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Sets the user data.
    #[must_use]
    pub fn with_user_data(mut self, user_data: u128) -> Self {
        self.user_data = user_data;
        self
    }

    /// These properties with a zero inverse mass and inertia if the body is static.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.kind == RigidBodyKind::Static {
            self.inv_mass = 0.0;
            self.inv_inertia = AngularInertia::zeros();
        }
        self
    }
}

/// The evolving state of a rigid body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RigidBodyState {
    /// The world-space position of the body's origin.
    pub position: Point<Real>,
    /// The world-space orientation.
    pub orientation: Rotation<Real>,
    /// The linear velocity.
    pub linvel: Vector<Real>,
    /// The angular velocity.
    pub angvel: Vector<Real>,
    /// The linear acceleration of the last integration.
    pub linacc: Vector<Real>,
    /// The angular acceleration of the last integration.
    pub angacc: Vector<Real>,
    /// The accumulated force.
    pub force: Vector<Real>,
    /// The accumulated torque.
    pub torque: Vector<Real>,
    /// The exponentially weighted average of the squared velocities.
    pub motion: Real,
    /// The world transform, derived from `position` and `orientation`.
    pub transform: Isometry<Real>,
    /// The inverse inertia tensor, in world-space.
    pub world_inv_inertia: AngularInertia<Real>,
    /// The world transform at the start of the last world update.
    pub previous_transform: Isometry<Real>,
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            position: Point::origin(),
            orientation: Rotation::identity(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            linacc: Vector::zeros(),
            angacc: Vector::zeros(),
            force: Vector::zeros(),
            torque: Vector::zeros(),
            motion: 0.0,
            transform: Isometry::identity(),
            world_inv_inertia: AngularInertia::zeros(),
            previous_transform: Isometry::identity(),
        }
    }
}

/// A rigid body: properties, state, an optional collider, and the forces acting on it.
#[derive(Clone, Debug)]
pub struct RigidBody {
    properties: RigidBodyProperties,
    state: RigidBodyState,
    collider: Option<Collider>,
    forces: Vec<ForceHandle>,
    status: BodyStatus,
    handle: RigidBodyHandle,
}

impl RigidBody {
    /// Creates an awake body at the origin.
    pub fn new(properties: RigidBodyProperties) -> Self {
        let mut body = Self {
            properties: properties.sanitized(),
            state: RigidBodyState::default(),
            collider: None,
            forces: Vec::new(),
            status: BodyStatus::empty(),
            handle: RigidBodyHandle::invalid(),
        };
        body.state.motion = body.wake_motion();
        body.update_transforms();
        body.state.previous_transform = body.state.transform;
        body
    }

    /// A static body.
    pub fn fixed() -> Self {
        Self::new(RigidBodyProperties::fixed())
    }

    /// A dynamic body with the mass properties of `collider` at the given density.
    pub fn dynamic_with_collider(collider: Collider, density: Real) -> Self {
        let mprops = collider.mass_properties(density);
        Self::new(RigidBodyProperties::dynamic(&mprops)).with_collider(collider)
    }

    /// Places this body at `position`.
    #[must_use]
    pub fn with_position(mut self, position: Point<Real>) -> Self {
        self.state.position = position;
        self.update_transforms();
        self.state.previous_transform = self.state.transform;
        self
    }

    /// Rotates this body.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Rotation<Real>) -> Self {
        self.state.orientation = orientation;
        self.update_transforms();
        self.state.previous_transform = self.state.transform;
        self
    }

    /// Sets the initial linear velocity of this body.
    #[must_use]
    pub fn with_linvel(mut self, linvel: Vector<Real>) -> Self {
        if !self.is_immovable() {
            self.state.linvel = linvel;
        }
        self
    }

    /// Sets the initial angular velocity of this body.
    #[must_use]
    pub fn with_angvel(mut self, angvel: Vector<Real>) -> Self {
        if !self.is_immovable() {
            self.state.angvel = angvel;
        }
        self
    }

    /// Attaches a collider to this body.
    #[must_use]
    pub fn with_collider(mut self, collider: Collider) -> Self {
        let _ = self.set_collider(Some(collider));
        self
    }

    /// The handle of this body, invalid until it is added to a world.
    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    /// The properties of this body.
    pub fn properties(&self) -> &RigidBodyProperties {
        &self.properties
    }

    /// The state of this body.
    pub fn state(&self) -> &RigidBodyState {
        &self.state
    }

    /// Static or dynamic.
    pub fn kind(&self) -> RigidBodyKind {
        self.properties.kind
    }

    /// The data attached to this body by the user.
    pub fn user_data(&self) -> u128 {
        self.properties.user_data
    }

    /// The world-space position of the body's origin.
    pub fn position(&self) -> &Point<Real> {
        &self.state.position
    }

    /// The world-space orientation.
    pub fn orientation(&self) -> &Rotation<Real> {
        &self.state.orientation
    }

    /// The world transform.
    pub fn isometry(&self) -> &Isometry<Real> {
        &self.state.transform
    }

    /// The world transform at the start of the last world update.
    pub fn previous_isometry(&self) -> &Isometry<Real> {
        &self.state.previous_transform
    }

    /// The linear velocity.
    pub fn linvel(&self) -> &Vector<Real> {
        &self.state.linvel
    }

    /// The angular velocity.
    pub fn angvel(&self) -> &Vector<Real> {
        &self.state.angvel
    }

    /// The velocity of the material point at the world-space `point`.
    pub fn velocity_at_point(&self, point: &Point<Real>) -> Vector<Real> {
        self.state.linvel + self.state.angvel.cross(&(point - self.state.position))
    }

    /// The current motion estimate used to decide when to sleep.
    pub fn motion(&self) -> Real {
        self.state.motion
    }

    /// The inverse inertia tensor in world-space.
    pub fn world_inv_inertia(&self) -> &AngularInertia<Real> {
        &self.state.world_inv_inertia
    }

    /// The collider attached to this body.
    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    /// The forces attached to this body.
    pub fn forces(&self) -> &[ForceHandle] {
        &self.forces
    }

    /// The status flags of this body.
    pub fn status(&self) -> BodyStatus {
        self.status
    }

    /// Is this body asleep?
    pub fn is_sleeping(&self) -> bool {
        self.status.contains(BodyStatus::SLEEPING)
    }

    /// Does this body have an infinite mass?
    pub fn is_immovable(&self) -> bool {
        self.properties.inv_mass == 0.0
    }

    /// The mass of this body, infinite if it is immovable.
    pub fn mass(&self) -> Real {
        if self.is_immovable() {
            Real::INFINITY
        } else {
            1.0 / self.properties.inv_mass
        }
    }

    /// Adds a force to the accumulator of the current step.
    ///
    /// Meant to be called by [`Force::apply`](crate::dynamics::Force::apply).
    pub fn add_force(&mut self, force: Vector<Real>) {
        self.state.force += force;
    }

    /// Adds a torque to the accumulator of the current step.
    pub fn add_torque(&mut self, torque: Vector<Real>) {
        self.state.torque += torque;
    }

    /// Adds a force applied at the world-space `point`.
    pub fn add_force_at_point(&mut self, force: Vector<Real>, point: &Point<Real>) {
        self.state.force += force;
        self.state.torque += (point - self.state.position).cross(&force);
    }

    /// Resets the accumulators then applies every attached force.
    pub fn process_forces(&mut self, forces: &ForceSet) {
        self.state.force = Vector::zeros();
        self.state.torque = Vector::zeros();

        for i in 0..self.forces.len() {
            let handle = self.forces[i];
            if let Some(force) = forces.get(handle) {
                force.apply(self);
            }
        }
    }

    /// Advances the velocities then the pose by `dt` (semi-implicit Euler).
    pub fn integrate(&mut self, dt: Real) {
        if self.is_immovable() || self.is_sleeping() {
            return;
        }

        let state = &mut self.state;
        state.linacc = state.force * self.properties.inv_mass;
        state.angacc = state.world_inv_inertia * state.torque;

        state.linvel *= (1.0 - self.properties.linear_damping).max(0.0).powf(dt);
        state.angvel *= (1.0 - self.properties.angular_damping).max(0.0).powf(dt);
        state.linvel += state.linacc * dt;
        state.angvel += state.angacc * dt;

        state.position += state.linvel * dt;
        state.orientation = integrate_orientation(&state.orientation, &state.angvel, dt);
    }

    /// Refreshes the world transform, the world inverse inertia, and the collider's pose.
    pub fn update_transforms(&mut self) {
        let state = &mut self.state;
        state.transform =
            Isometry::from_parts(Translation::from(state.position.coords), state.orientation);
        let rot = state.orientation.to_rotation_matrix().into_inner();
        state.world_inv_inertia = rot * self.properties.inv_inertia * rot.transpose();

        if let Some(collider) = &mut self.collider {
            collider.set_parent_position(&state.transform);
        }
    }

    /// Updates the motion estimate and puts the body to sleep if it falls under its threshold.
    ///
    /// `bias` weights the previous estimate; the new estimate never exceeds `cap`.
    pub fn update_motion(&mut self, bias: Real, cap: Real) {
        if self.is_immovable() || self.is_sleeping() {
            return;
        }

        let current = self.state.linvel.norm_squared() + self.state.angvel.norm_squared();
        self.state.motion = (bias * self.state.motion + (1.0 - bias) * current).min(cap);

        if self.state.motion < self.properties.sleep_motion {
            self.sleep();
        }
    }

    /// Moves this body, waking it up.
    pub fn set_position(&mut self, position: Point<Real>) {
        self.state.position = position;
        self.update_transforms();
        self.status.insert(BodyStatus::STATE_CHANGED);
        self.wake_up();
    }

    /// Rotates this body, waking it up.
    pub fn set_orientation(&mut self, orientation: Rotation<Real>) {
        self.state.orientation = orientation;
        self.update_transforms();
        self.status.insert(BodyStatus::STATE_CHANGED);
        self.wake_up();
    }

    /// Sets the linear velocity, waking the body up. Ignored by immovable bodies.
    pub fn set_linvel(&mut self, linvel: Vector<Real>) {
        if self.is_immovable() {
            return;
        }
        self.state.linvel = linvel;
        self.status.insert(BodyStatus::STATE_CHANGED);
        self.wake_up();
    }

    /// Sets the angular velocity, waking the body up. Ignored by immovable bodies.
    pub fn set_angvel(&mut self, angvel: Vector<Real>) {
        if self.is_immovable() {
            return;
        }
        self.state.angvel = angvel;
        self.status.insert(BodyStatus::STATE_CHANGED);
        self.wake_up();
    }

    /// Replaces the properties of this body, waking it up.
    pub fn set_properties(&mut self, properties: RigidBodyProperties) {
        self.properties = properties.sanitized();
        if self.is_immovable() {
            self.state.linvel = Vector::zeros();
            self.state.angvel = Vector::zeros();
        }
        self.update_transforms();
        self.status.insert(BodyStatus::PROPERTIES_CHANGED);
        self.wake_up();
    }

    /// Replaces, or removes, the collider of this body.
    pub fn set_collider(&mut self, collider: Option<Collider>) -> Option<Collider> {
        let old = core::mem::replace(&mut self.collider, collider);
        if let Some(collider) = &mut self.collider {
            collider.set_parent(self.handle);
            collider.set_parent_position(&self.state.transform);
        }
        self.status.insert(BodyStatus::COLLIDER_CHANGED);
        self.wake_up();
        old
    }

    /// Attaches a force to this body. Returns `false` if it was already attached.
    pub fn attach_force(&mut self, force: ForceHandle) -> bool {
        if self.forces.contains(&force) {
            return false;
        }
        self.forces.push(force);
        self.status.insert(BodyStatus::FORCES_CHANGED);
        self.wake_up();
        true
    }

    /// Detaches a force from this body. Returns `false` if it was not attached.
    pub fn detach_force(&mut self, force: ForceHandle) -> bool {
        let Some(i) = self.forces.iter().position(|f| *f == force) else {
            return false;
        };
        let _ = self.forces.remove(i);
        self.status.insert(BodyStatus::FORCES_CHANGED);
        self.wake_up();
        true
    }

    /// Applies an impulse at the world-space `point`, waking the body up.
    ///
    /// Immovable bodies are not affected.
    pub fn apply_impulse(&mut self, impulse: Vector<Real>, point: &Point<Real>) {
        if self.is_immovable() {
            return;
        }
        let torque_impulse = (point - self.state.position).cross(&impulse);
        self.state.linvel += impulse * self.properties.inv_mass;
        self.state.angvel += self.state.world_inv_inertia * torque_impulse;
        self.status.insert(BodyStatus::STATE_CHANGED);
        self.wake_up();
    }

    /// Wakes this body up. Immovable bodies never sleep.
    pub fn wake_up(&mut self) {
        if self.is_sleeping() {
            self.status.remove(BodyStatus::SLEEPING);
            self.state.motion = self.wake_motion();
        }
    }

    /// Puts this body to sleep, zeroing its velocities.
    pub fn sleep(&mut self) {
        if self.is_immovable() {
            return;
        }
        self.state.linvel = Vector::zeros();
        self.state.angvel = Vector::zeros();
        self.status.insert(BodyStatus::SLEEPING);
    }

    pub(crate) fn set_handle(&mut self, handle: RigidBodyHandle) {
        self.handle = handle;
        if let Some(collider) = &mut self.collider {
            collider.set_parent(handle);
            // A body added back to a world must be registered again by the coarse phase.
            collider.set_parent_position(&self.state.transform);
        }
    }

    /// Applies a velocity change computed by the constraint solver and moves the body
    /// accordingly over `dt`.
    pub(crate) fn apply_velocity_change(&mut self, dlinvel: &Vector<Real>, dangvel: &Vector<Real>, dt: Real) {
        self.state.linvel += dlinvel;
        self.state.angvel += dangvel;
        self.state.position += dlinvel * dt;
        self.state.orientation = integrate_orientation(&self.state.orientation, dangvel, dt);
        self.update_transforms();
    }

    pub(crate) fn begin_update(&mut self) {
        self.state.previous_transform = self.state.transform;
    }

    pub(crate) fn clear_change_flags(&mut self) {
        self.status.remove(BodyStatus::CHANGED);
        if let Some(collider) = &mut self.collider {
            collider.clear_updated();
        }
    }

    // Keeps freshly woken bodies awake for a few steps.
    fn wake_motion(&self) -> Real {
        self.properties.sleep_motion * 2.0
    }
}

/// Integrates `orientation` by the world-space angular velocity `angvel` over `dt`.
fn integrate_orientation(orientation: &Rotation<Real>, angvel: &Vector<Real>, dt: Real) -> Rotation<Real> {
    let q = orientation.quaternion();
    let omega = Quaternion::from_parts(0.0, *angvel);
    let derivative = omega * q * 0.5;
    Rotation::new_normalize(q + derivative * dt)
}

#[cfg(test)]
mod test {
    use super::{BodyStatus, RigidBody, RigidBodyKind, RigidBodyProperties};
    use crate::dynamics::{ConstantForce, ForceSet};
    use crate::math::{Point, Real, Rotation, Vector};

    #[test]
    fn static_bodies_are_immovable() {
        let props = RigidBodyProperties {
            kind: RigidBodyKind::Static,
            inv_mass: 3.0,
            ..RigidBodyProperties::default()
        };
        let mut body = RigidBody::new(props);
        assert!(body.is_immovable());
        assert_eq!(body.properties().inv_inertia.norm(), 0.0);

        body.apply_impulse(Vector::x(), &Point::origin());
        body.set_linvel(Vector::y());
        body.integrate(1.0);
        assert_eq!(*body.linvel(), Vector::zeros());
        assert_eq!(*body.position(), Point::origin());
    }

    #[test]
    fn forces_are_integrated_semi_implicitly() {
        let mut forces = ForceSet::new();
        let push = forces.insert(ConstantForce::new(Vector::new(2.0, 0.0, 0.0)));
        let mut body = RigidBody::new(RigidBodyProperties::default().with_damping(0.0, 0.0));
        assert!(body.attach_force(push));
        assert!(!body.attach_force(push));

        body.process_forces(&forces);
        body.integrate(0.5);
        // v = a·dt = 1, then x = v·dt = 0.5.
        assert_relative_eq!(*body.linvel(), Vector::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*body.position(), Point::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn angular_velocity_rotates_the_body() {
        let mut body = RigidBody::new(RigidBodyProperties::default().with_damping(0.0, 0.0));
        body.set_angvel(Vector::z() * core::f32::consts::FRAC_PI_2);

        let dt = 1.0 / 240.0;
        for _ in 0..240 {
            body.integrate(dt);
        }
        body.update_transforms();

        let expected = Rotation::from_axis_angle(&Vector::z_axis(), core::f32::consts::FRAC_PI_2);
        assert!(body.orientation().angle_to(&expected) < 1.0e-2);
        assert_relative_eq!(body.orientation().norm(), 1.0, epsilon = 1.0e-5);
    }

    #[test]
    fn world_inertia_follows_the_orientation() {
        let props = RigidBodyProperties {
            inv_inertia: na::Matrix3::from_diagonal(&Vector::new(1.0, 2.0, 3.0)),
            ..RigidBodyProperties::default()
        };
        let rot = Rotation::from_axis_angle(&Vector::z_axis(), core::f32::consts::FRAC_PI_2);
        let body = RigidBody::new(props).with_orientation(rot);
        let expected = na::Matrix3::from_diagonal(&Vector::new(2.0, 1.0, 3.0));
        assert_relative_eq!(*body.world_inv_inertia(), expected, epsilon = 1.0e-5);
    }

    #[test]
    fn sleeping_is_idempotent_and_edits_wake_up() {
        let mut body = RigidBody::new(RigidBodyProperties::default());
        let mut steps = 0;
        while !body.is_sleeping() {
            body.update_motion(0.5, 1.0);
            steps += 1;
            assert!(steps < 100);
        }

        let snapshot = *body.state();
        body.sleep();
        body.update_motion(0.5, 1.0);
        body.integrate(0.1);
        assert_eq!(*body.state(), snapshot);
        assert!(body.is_sleeping());

        body.set_linvel(Vector::x());
        assert!(!body.is_sleeping());
        assert!(body.status().contains(BodyStatus::STATE_CHANGED));
        body.clear_change_flags();
        assert_eq!(body.status(), BodyStatus::empty());
    }

    #[test]
    fn motion_is_capped() {
        let mut body = RigidBody::new(RigidBodyProperties::default());
        body.set_linvel(Vector::x() * 100.0);
        body.update_motion(0.0, 0.5);
        assert_relative_eq!(body.motion(), 0.5 as Real);
    }
}

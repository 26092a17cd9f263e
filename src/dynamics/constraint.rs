use crate::dynamics::RigidBodyHandle;
use crate::math::{Real, Vector};
use crate::utils::Index;

/// The unique identifier of a constraint registered with a
/// [`ConstraintSolver`](crate::dynamics::ConstraintSolver).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstraintHandle(pub(crate) Index);

/// One row of a constraint Jacobian: the linear and angular parts for each of the two bodies.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct JacobianRow {
    /// The linear part of the first body.
    pub linear1: Vector<Real>,
    /// The angular part of the first body.
    pub angular1: Vector<Real>,
    /// The linear part of the second body.
    pub linear2: Vector<Real>,
    /// The angular part of the second body.
    pub angular2: Vector<Real>,
}

impl JacobianRow {
    /// The Jacobian of a point constraint along `dir`, with lever arms `r1` and `r2` from each
    /// body's origin to the constrained point.
    pub fn along(dir: &Vector<Real>, r1: &Vector<Real>, r2: &Vector<Real>) -> Self {
        Self {
            linear1: -dir,
            angular1: -r1.cross(dir),
            linear2: *dir,
            angular2: r2.cross(dir),
        }
    }

    /// The product of this row with the velocities of the two bodies.
    #[inline]
    pub fn dot_velocities(
        &self,
        linvel1: &Vector<Real>,
        angvel1: &Vector<Real>,
        linvel2: &Vector<Real>,
        angvel2: &Vector<Real>,
    ) -> Real {
        self.linear1.dot(linvel1)
            + self.angular1.dot(angvel1)
            + self.linear2.dot(linvel2)
            + self.angular2.dot(angvel2)
    }
}

/// The behavior shared by every constraint.
pub trait ConstraintBehavior {
    /// The two bodies constrained.
    fn bodies(&self) -> [RigidBodyHandle; 2];

    /// The bounds `(lambda_min, lambda_max)` of the accumulated multiplier.
    fn bounds(&self) -> (Real, Real);

    /// The velocity bias given the current relative velocity `J·v`.
    fn bias(&self, dt: Real, relative_velocity: Real) -> Real;

    /// The Jacobian row.
    fn jacobian(&self) -> JacobianRow;
}

/// The tuning parameters of non-penetration constraints.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalConstraintParams {
    /// The fraction of the penetration corrected per second, times the timestep.
    pub baumgarte_beta: Real,
    /// The penetration left uncorrected.
    pub penetration_slop: Real,
    /// The coefficient of restitution.
    pub restitution: Real,
    /// The approach velocity under which restitution is ignored.
    pub restitution_slop: Real,
}

impl Default for NormalConstraintParams {
    fn default() -> Self {
        Self {
            baumgarte_beta: 0.2,
            penetration_slop: 0.01,
            restitution: 0.1,
            restitution_slop: 0.5,
        }
    }
}

/// Prevents two bodies from interpenetrating along a contact normal.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalConstraint {
    /// The two bodies; the normal points from the first toward the second.
    pub bodies: [RigidBodyHandle; 2],
    /// The contact normal.
    pub normal: Vector<Real>,
    /// From the first body's origin to its contact point.
    pub r1: Vector<Real>,
    /// From the second body's origin to its contact point.
    pub r2: Vector<Real>,
    /// The penetration depth.
    pub depth: Real,
    /// The tuning parameters.
    pub params: NormalConstraintParams,
}

impl NormalConstraint {
    /// A constraint without contact geometry yet.
    pub fn new(bodies: [RigidBodyHandle; 2], params: NormalConstraintParams) -> Self {
        Self {
            bodies,
            normal: Vector::zeros(),
            r1: Vector::zeros(),
            r2: Vector::zeros(),
            depth: 0.0,
            params,
        }
    }
}

impl ConstraintBehavior for NormalConstraint {
    fn bodies(&self) -> [RigidBodyHandle; 2] {
        self.bodies
    }

    fn bounds(&self) -> (Real, Real) {
        (0.0, Real::INFINITY)
    }

    fn bias(&self, dt: Real, relative_velocity: Real) -> Real {
        let p = &self.params;
        let correction = p.baumgarte_beta / dt * (self.depth - p.penetration_slop).max(0.0);
        let bounce = if relative_velocity < -p.restitution_slop {
            -p.restitution * relative_velocity
        } else {
            0.0
        };

        -correction.max(bounce)
    }

    fn jacobian(&self) -> JacobianRow {
        JacobianRow::along(&self.normal, &self.r1, &self.r2)
    }
}

/// Opposes the sliding of two bodies along a contact tangent.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FrictionConstraint {
    /// The two bodies.
    pub bodies: [RigidBodyHandle; 2],
    /// The tangent direction.
    pub tangent: Vector<Real>,
    /// From the first body's origin to its contact point.
    pub r1: Vector<Real>,
    /// From the second body's origin to its contact point.
    pub r2: Vector<Real>,
    /// The combined friction coefficient.
    pub friction: Real,
    /// The share of the pair's mass supported by this contact, once known.
    pub mass: Option<Real>,
    /// The gravity used to turn the mass into a normal force estimate.
    pub friction_gravity: Real,
}

impl FrictionConstraint {
    /// A constraint that stays inert until its mass is set.
    pub fn new(bodies: [RigidBodyHandle; 2], friction_gravity: Real) -> Self {
        Self {
            bodies,
            tangent: Vector::zeros(),
            r1: Vector::zeros(),
            r2: Vector::zeros(),
            friction: 0.0,
            mass: None,
            friction_gravity,
        }
    }
}

impl ConstraintBehavior for FrictionConstraint {
    fn bodies(&self) -> [RigidBodyHandle; 2] {
        self.bodies
    }

    fn bounds(&self) -> (Real, Real) {
        match self.mass {
            Some(mass) if mass.is_finite() => {
                let limit = (self.friction * mass * self.friction_gravity).abs();
                (-limit, limit)
            }
            _ => (0.0, 0.0),
        }
    }

    fn bias(&self, _dt: Real, _relative_velocity: Real) -> Real {
        0.0
    }

    fn jacobian(&self) -> JacobianRow {
        JacobianRow::along(&self.tangent, &self.r1, &self.r2)
    }
}

/// Any constraint handled by the solver.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Constraint {
    /// A non-penetration constraint.
    Normal(NormalConstraint),
    /// A friction constraint.
    Friction(FrictionConstraint),
}

impl Constraint {
    /// This constraint as a non-penetration constraint.
    pub fn as_normal_mut(&mut self) -> Option<&mut NormalConstraint> {
        match self {
            Constraint::Normal(c) => Some(c),
            Constraint::Friction(_) => None,
        }
    }

    /// This constraint as a friction constraint.
    pub fn as_friction_mut(&mut self) -> Option<&mut FrictionConstraint> {
        match self {
            Constraint::Friction(c) => Some(c),
            Constraint::Normal(_) => None,
        }
    }
}

impl ConstraintBehavior for Constraint {
    fn bodies(&self) -> [RigidBodyHandle; 2] {
        match self {
            Constraint::Normal(c) => c.bodies(),
            Constraint::Friction(c) => c.bodies(),
        }
    }

    fn bounds(&self) -> (Real, Real) {
        match self {
            Constraint::Normal(c) => c.bounds(),
            Constraint::Friction(c) => c.bounds(),
        }
    }

    fn bias(&self, dt: Real, relative_velocity: Real) -> Real {
        match self {
            Constraint::Normal(c) => c.bias(dt, relative_velocity),
            Constraint::Friction(c) => c.bias(dt, relative_velocity),
        }
    }

    fn jacobian(&self) -> JacobianRow {
        match self {
            Constraint::Normal(c) => c.jacobian(),
            Constraint::Friction(c) => c.jacobian(),
        }
    }
}

impl From<NormalConstraint> for Constraint {
    fn from(c: NormalConstraint) -> Self {
        Constraint::Normal(c)
    }
}

impl From<FrictionConstraint> for Constraint {
    fn from(c: FrictionConstraint) -> Self {
        Constraint::Friction(c)
    }
}

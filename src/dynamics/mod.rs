//! Rigid bodies, forces, constraints, and the constraint solvers.

pub use self::collision_solver::{CollisionSolver, CollisionSolverOptions, ContactConstraints};
pub use self::constraint::{
    Constraint, ConstraintBehavior, ConstraintHandle, FrictionConstraint, JacobianRow,
    NormalConstraint, NormalConstraintParams,
};
pub use self::constraint_solver::{ConstraintSolver, ConstraintSolverOptions};
pub use self::force::{ConstantForce, Force, ForceHandle, ForceSet, Gravity};
pub use self::rigid_body::{
    BodyStatus, RigidBody, RigidBodyKind, RigidBodyProperties, RigidBodyState,
};
pub use self::rigid_body_set::{RigidBodyHandle, RigidBodySet};

mod collision_solver;
mod constraint;
mod constraint_solver;
mod force;
mod rigid_body;
mod rigid_body_set;

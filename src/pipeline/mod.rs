//! The world orchestrating bodies, collision detection, and contact resolution.

pub use self::config::{CollisionConfig, SleepConfig, SolverConfig, WorldConfig, WorldConfigError};
pub use self::world::{RigidBodySnapshot, RigidBodyWorld, WorldError};

mod config;
mod world;

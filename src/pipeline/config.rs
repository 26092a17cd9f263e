use crate::bounding_volume::Aabb;
use crate::dynamics::{CollisionSolverOptions, ConstraintSolverOptions, NormalConstraintParams};
use crate::geometry::CollisionDetectorOptions;
use crate::math::{Point, Real, Vector};
use crate::query::gjk::GjkOptions;
use crate::query::ContactOptions;

/// An invalid [`WorldConfig`] value.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq)]
pub enum WorldConfigError {
    /// The world bounds are empty or not finite.
    #[error("the world bounds must be a non-empty finite box")]
    InvalidWorldBounds,
    /// A world update must run at least one substep.
    #[error("the number of substeps must be at least 1")]
    NoSubstep,
    /// The gravity is not finite.
    #[error("the gravity must be finite")]
    NonFiniteGravity,
    /// A parameter is out of its valid range.
    #[error("`{name}` is {value}, expected a value in [{min}, {max}]")]
    OutOfRange {
        /// The name of the parameter.
        name: &'static str,
        /// The value provided.
        value: Real,
        /// The smallest valid value.
        min: Real,
        /// The largest valid value.
        max: Real,
    },
    /// A count that must be positive is zero.
    #[error("`{name}` must be at least 1")]
    ZeroCount {
        /// The name of the parameter.
        name: &'static str,
    },
}

/// The parameters of collision detection.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// The margin by which AABBs are enlarged in the coarse phase.
    pub aabb_epsilon: Real,
    /// The maximum number of manifolds alive at once.
    pub max_colliders_intersecting: usize,
    /// The maximum number of GJK iterations, also bounding the EPA.
    pub max_iterations: usize,
    /// GJK stops once its bounds on the distance are closer than this.
    pub min_f_difference: Real,
    /// The precision of the penetration depth computed by the EPA.
    pub contact_precision: Real,
    /// Contacts closer than this from a previous contact replace it.
    pub contact_separation: Real,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            aabb_epsilon: 0.01,
            max_colliders_intersecting: 4096,
            max_iterations: 64,
            min_f_difference: 1.0e-4,
            contact_precision: 1.0e-4,
            contact_separation: 0.02,
        }
    }
}

impl CollisionConfig {
    /// The contact generation options derived from this configuration.
    pub fn contact_options(&self) -> ContactOptions {
        ContactOptions {
            gjk: GjkOptions {
                max_iterations: self.max_iterations,
                min_f_difference: self.min_f_difference,
            },
            contact_precision: self.contact_precision,
        }
    }
}

/// The parameters of the constraint solver.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// The maximum number of contacts turned into constraints.
    pub max_contacts: usize,
    /// The number of Gauss-Seidel sweeps per substep.
    pub gauss_seidel_iterations: usize,
    /// The fraction of the penetration corrected per substep.
    pub baumgarte_beta: Real,
    /// The coefficient of restitution of every contact.
    pub restitution: Real,
    /// The approach velocity under which contacts do not bounce.
    pub restitution_slop: Real,
    /// The penetration left uncorrected.
    pub penetration_slop: Real,
    /// The gravity used to turn contact masses into friction bounds.
    pub friction_gravity: Real,
    /// The fraction of the previous multipliers used as initial guess.
    pub warmstart_coefficient: Real,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let normal = NormalConstraintParams::default();
        Self {
            max_contacts: 8192,
            gauss_seidel_iterations: 10,
            baumgarte_beta: normal.baumgarte_beta,
            restitution: normal.restitution,
            restitution_slop: normal.restitution_slop,
            penetration_slop: normal.penetration_slop,
            friction_gravity: 9.81,
            warmstart_coefficient: 0.8,
        }
    }
}

impl SolverConfig {
    /// The options of the collision solver.
    pub fn collision_solver_options(&self) -> CollisionSolverOptions {
        CollisionSolverOptions {
            max_contacts: self.max_contacts,
            normal: NormalConstraintParams {
                baumgarte_beta: self.baumgarte_beta,
                penetration_slop: self.penetration_slop,
                restitution: self.restitution,
                restitution_slop: self.restitution_slop,
            },
            friction_gravity: self.friction_gravity,
        }
    }

    /// The options of the constraint solver.
    pub fn constraint_solver_options(&self) -> ConstraintSolverOptions {
        ConstraintSolverOptions {
            gauss_seidel_iterations: self.gauss_seidel_iterations,
            warmstart_coefficient: self.warmstart_coefficient,
        }
    }
}

/// The parameters of body sleeping.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SleepConfig {
    /// Can bodies fall asleep?
    pub enabled: bool,
    /// The weight of the previous motion estimate.
    pub motion_bias: Real,
    /// The motion estimate is capped at `motion_cap_factor · sleep_motion`.
    pub motion_cap_factor: Real,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            motion_bias: 0.9,
            motion_cap_factor: 10.0,
        }
    }
}

/// The parameters of a [`RigidBodyWorld`](crate::pipeline::RigidBodyWorld).
///
/// # Example
///
/// ```rust
/// use impulse3d::pipeline::{WorldConfig, WorldConfigError};
///
/// let mut config = WorldConfig::default();
/// assert!(config.validate().is_ok());
///
/// config.num_substeps = 0;
/// assert_eq!(config.validate(), Err(WorldConfigError::NoSubstep));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Colliders outside of these bounds do not collide.
    pub world_bounds: Aabb,
    /// The number of substeps per world update.
    pub num_substeps: u32,
    /// The number of worker threads. `1` runs everything on the caller thread, `0` uses one
    /// thread per logical core.
    pub num_threads: usize,
    /// The gravity applied to every dynamic body.
    pub gravity: Vector<Real>,
    /// The collision detection parameters.
    pub collision: CollisionConfig,
    /// The constraint solver parameters.
    pub solver: SolverConfig,
    /// The sleeping parameters.
    pub sleep: SleepConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_bounds: Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0e4)),
            num_substeps: 1,
            num_threads: 1,
            gravity: Vector::new(0.0, -9.81, 0.0),
            collision: CollisionConfig::default(),
            solver: SolverConfig::default(),
            sleep: SleepConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Checks that every parameter is within its valid range.
    pub fn validate(&self) -> Result<(), WorldConfigError> {
        let bounds = &self.world_bounds;
        if !bounds.mins.iter().chain(bounds.maxs.iter()).all(|x| x.is_finite())
            || bounds.mins.iter().zip(bounds.maxs.iter()).any(|(a, b)| a >= b)
        {
            return Err(WorldConfigError::InvalidWorldBounds);
        }

        if self.num_substeps == 0 {
            return Err(WorldConfigError::NoSubstep);
        }

        if !self.gravity.iter().all(|x| x.is_finite()) {
            return Err(WorldConfigError::NonFiniteGravity);
        }

        let c = &self.collision;
        check_count("max_colliders_intersecting", c.max_colliders_intersecting)?;
        check_count("max_iterations", c.max_iterations)?;
        check_range("aabb_epsilon", c.aabb_epsilon, 0.0, Real::MAX)?;
        check_range("min_f_difference", c.min_f_difference, Real::EPSILON, Real::MAX)?;
        check_range("contact_precision", c.contact_precision, Real::EPSILON, Real::MAX)?;
        check_range("contact_separation", c.contact_separation, 0.0, Real::MAX)?;

        let s = &self.solver;
        check_count("max_contacts", s.max_contacts)?;
        check_count("gauss_seidel_iterations", s.gauss_seidel_iterations)?;
        check_range("baumgarte_beta", s.baumgarte_beta, 0.0, 1.0)?;
        check_range("restitution", s.restitution, 0.0, 1.0)?;
        check_range("restitution_slop", s.restitution_slop, 0.0, Real::MAX)?;
        check_range("penetration_slop", s.penetration_slop, 0.0, Real::MAX)?;
        check_range("friction_gravity", s.friction_gravity, 0.0, Real::MAX)?;
        check_range("warmstart_coefficient", s.warmstart_coefficient, 0.0, 1.0)?;

        check_range("motion_bias", self.sleep.motion_bias, 0.0, 1.0)?;
        check_range("motion_cap_factor", self.sleep.motion_cap_factor, 1.0, Real::MAX)?;

        Ok(())
    }

    /// The options of the collision detector.
    pub fn collision_detector_options(&self) -> CollisionDetectorOptions {
        CollisionDetectorOptions {
            world_bounds: self.world_bounds,
            aabb_epsilon: self.collision.aabb_epsilon,
            max_colliders_intersecting: self.collision.max_colliders_intersecting,
            contact_options: self.collision.contact_options(),
            contact_separation: self.collision.contact_separation,
        }
    }
}

fn check_range(name: &'static str, value: Real, min: Real, max: Real) -> Result<(), WorldConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(WorldConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

fn check_count(name: &'static str, value: usize) -> Result<(), WorldConfigError> {
    if value == 0 {
        Err(WorldConfigError::ZeroCount { name })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{WorldConfig, WorldConfigError};
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Real};

    #[test]
    fn default_config_is_valid() {
        assert_eq!(WorldConfig::default().validate(), Ok(()));
    }

    #[test]
    fn nonsensical_values_are_rejected() {
        let mut config = WorldConfig::default();
        config.solver.baumgarte_beta = 1.5;
        assert!(matches!(
            config.validate(),
            Err(WorldConfigError::OutOfRange {
                name: "baumgarte_beta",
                ..
            })
        ));

        let mut config = WorldConfig::default();
        config.world_bounds = Aabb::new(Point::origin(), Point::origin());
        assert_eq!(config.validate(), Err(WorldConfigError::InvalidWorldBounds));

        let mut config = WorldConfig::default();
        config.gravity.y = Real::NAN;
        assert_eq!(config.validate(), Err(WorldConfigError::NonFiniteGravity));

        let mut config = WorldConfig::default();
        config.solver.gauss_seidel_iterations = 0;
        assert_eq!(
            config.validate(),
            Err(WorldConfigError::ZeroCount {
                name: "gauss_seidel_iterations"
            })
        );

        let mut config = WorldConfig::default();
        config.collision.contact_precision = Real::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let mut config = WorldConfig::default();
        config.sleep.motion_bias = 2.0;
        let message = config.validate().map_err(|e| e.to_string());
        assert_eq!(
            message,
            Err("`motion_bias` is 2, expected a value in [0, 1]".to_string())
        );
    }
}

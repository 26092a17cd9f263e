/*!
impulse3d
=========

**impulse3d** is the rigid-body physics core of a 3D engine written with the
rust programming language. It advances dynamic bodies, detects collisions
between convex and concave shapes with a dynamic AABB tree followed by
GJK/EPA, and resolves contacts with a Projected Gauss-Seidel solver.

The entry point is [`pipeline::RigidBodyWorld`].

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)] // Complains about closures that are fairly simple.

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
#[cfg_attr(test, macro_use)]
extern crate approx;
extern crate num_traits as num;

pub extern crate either;
pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod dynamics;
pub mod geometry;
pub mod partitioning;
pub mod pipeline;
pub mod query;
pub mod shape;
pub mod utils;

/// Compilation flags dependent aliases for mathematical types.
pub mod math {
    pub use na::{Isometry3, Matrix3, Point3, Translation3, UnitVector3, Vector3};
    use na::UnitQuaternion;

    /// The scalar type used throughout this crate.
    pub type Real = f32;

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The angular vector type.
    pub type AngVector<N> = Vector3<N>;

    /// The vector type.
    pub use Vector3 as Vector;

    /// The unit vector type.
    pub use UnitVector3 as UnitVector;

    /// The matrix type.
    pub use Matrix3 as Matrix;

    /// The transformation matrix type.
    pub use Isometry3 as Isometry;

    /// The rotation type.
    pub type Rotation<N> = UnitQuaternion<N>;

    /// The translation type.
    pub use Translation3 as Translation;

    /// The angular inertia of a rigid body, expressed as a full 3x3 tensor.
    pub type AngularInertia<N> = Matrix3<N>;
}

/// The most commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::bounding_volume::Aabb;
    pub use crate::dynamics::{
        ConstantForce, Force, ForceHandle, Gravity, RigidBody, RigidBodyHandle, RigidBodyKind,
        RigidBodyProperties,
    };
    pub use crate::geometry::{Collider, CollisionListener, Contact, Manifold};
    pub use crate::math::*;
    pub use crate::pipeline::{RigidBodySnapshot, RigidBodyWorld, WorldConfig};
    pub use crate::query::{Ray, RayIntersection};
    pub use crate::shape::{
        Ball, Compound, ConvexPolyhedron, HeightField, MassProperties, Shape, TriMesh, Triangle,
    };
}

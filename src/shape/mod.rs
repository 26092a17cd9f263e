//! Shapes supported by impulse3d.
//!
//! Convex shapes ([`Ball`], [`ConvexPolyhedron`], [`Triangle`]) implement [`SupportMap`] and
//! [`PolygonalFeatureMap`]. Concave shapes ([`HeightField`], [`TriMesh`], [`Compound`]) implement
//! [`ConcaveShape`] and are decomposed into [`ConvexPart`]s on demand.

pub use self::ball::Ball;
pub use self::compound::Compound;
pub use self::convex_polyhedron::{ConvexPolyhedron, HalfEdge, PolyhedronFace};
pub use self::heightfield::HeightField;
pub use self::mass_properties::MassProperties;
pub use self::polygonal_feature::{PolygonalFeature, PolygonalFeatureMap};
pub use self::shape::{ConcaveShape, ConvexPart, Shape};
pub use self::shape_error::ShapeError;
pub use self::support_map::SupportMap;
pub use self::triangle::{Triangle, TrianglePointLocation};
pub use self::triangular_prism::TriangularPrism;
pub use self::trimesh::TriMesh;

mod ball;
mod compound;
mod convex_polyhedron;
mod heightfield;
mod mass_properties;
mod polygonal_feature;
mod shape;
mod shape_error;
mod support_map;
mod triangle;
mod triangular_prism;
mod trimesh;

use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Point, Real, Vector};
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::{
    Ball, Compound, ConvexPolyhedron, HeightField, MassProperties, PolygonalFeature,
    PolygonalFeatureMap, SupportMap, TriMesh, Triangle, TriangularPrism,
};
use either::Either;
use na::Unit;

/// Trait implemented by shapes made of several convex parts.
///
/// The parts are never stored: they are built on the fly and handed to the visitor together
/// with their position relative to the concave shape and an identifier.
pub trait ConcaveShape {
    /// The AABB of this shape, in its local-space.
    fn local_aabb(&self) -> Aabb;

    /// Calls `f` on every convex part whose AABB intersects `aabb` (expressed in the local-space
    /// of this shape).
    fn map_overlapping_parts(
        &self,
        aabb: &Aabb,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    );

    /// Calls `f` on every convex part whose AABB is hit by `ray` (expressed in the local-space
    /// of this shape) before `max_toi`.
    fn map_intersecting_parts(
        &self,
        ray: &Ray,
        max_toi: Real,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    );
}

/// A convex shape, or a convex part of a concave shape.
#[derive(Copy, Clone, Debug)]
pub enum ConvexPart<'a> {
    /// A ball.
    Ball(Ball),
    /// A convex polyhedron.
    Polyhedron(&'a ConvexPolyhedron),
    /// A triangle of a mesh or of a thin heightfield.
    Triangle(Triangle),
    /// A triangle of a thick heightfield.
    Prism(TriangularPrism),
}

impl ConvexPart<'_> {
    /// The AABB of this part, in its local-space.
    pub fn local_aabb(&self) -> Aabb {
        match self {
            ConvexPart::Ball(s) => s.local_aabb(),
            ConvexPart::Polyhedron(s) => s.local_aabb(),
            ConvexPart::Triangle(s) => s.local_aabb(),
            ConvexPart::Prism(s) => s.local_aabb(),
        }
    }

    /// The AABB of this part transformed by `pos`.
    pub fn compute_aabb(&self, pos: &Isometry<Real>) -> Aabb {
        match self {
            ConvexPart::Ball(s) => s.local_aabb().translated(&pos.translation.vector),
            ConvexPart::Triangle(s) => s.transformed(pos).local_aabb(),
            _ => self.local_aabb().transform_by(pos),
        }
    }

    /// This part as a ball, if it is one.
    pub fn as_ball(&self) -> Option<&Ball> {
        match self {
            ConvexPart::Ball(b) => Some(b),
            _ => None,
        }
    }
}

impl SupportMap for ConvexPart<'_> {
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real> {
        match self {
            ConvexPart::Ball(s) => s.local_support_point(dir),
            ConvexPart::Polyhedron(s) => s.local_support_point(dir),
            ConvexPart::Triangle(s) => s.local_support_point(dir),
            ConvexPart::Prism(s) => s.local_support_point(dir),
        }
    }

    fn local_support_point_toward(&self, dir: &Unit<Vector<Real>>) -> Point<Real> {
        match self {
            ConvexPart::Ball(s) => s.local_support_point_toward(dir),
            ConvexPart::Polyhedron(s) => s.local_support_point_toward(dir),
            ConvexPart::Triangle(s) => s.local_support_point_toward(dir),
            ConvexPart::Prism(s) => s.local_support_point_toward(dir),
        }
    }
}

impl PolygonalFeatureMap for ConvexPart<'_> {
    fn local_support_feature(&self, dir: &Unit<Vector<Real>>, out_feature: &mut PolygonalFeature) {
        match self {
            ConvexPart::Ball(s) => out_feature.set_vertex(s.local_support_point_toward(dir)),
            ConvexPart::Polyhedron(s) => s.local_support_feature(dir, out_feature),
            ConvexPart::Triangle(s) => s.local_support_feature(dir, out_feature),
            ConvexPart::Prism(s) => s.local_support_feature(dir, out_feature),
        }
    }
}

impl RayCast for ConvexPart<'_> {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        match self {
            ConvexPart::Ball(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            ConvexPart::Polyhedron(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            ConvexPart::Triangle(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            ConvexPart::Prism(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
        }
    }
}

/// The geometric shape of a collider.
#[derive(Clone, Debug)]
pub enum Shape {
    /// A ball.
    Ball(Ball),
    /// A convex polyhedron.
    ConvexPolyhedron(ConvexPolyhedron),
    /// A double-sided triangle.
    Triangle(Triangle),
    /// A terrain.
    HeightField(HeightField),
    /// A triangle mesh.
    TriMesh(TriMesh),
    /// A set of shapes rigidly attached together.
    Compound(Compound),
}

impl Shape {
    /// Splits this shape into its convex or concave nature.
    pub fn classify(&self) -> Either<ConvexPart<'_>, &dyn ConcaveShape> {
        match self {
            Shape::Ball(s) => Either::Left(ConvexPart::Ball(*s)),
            Shape::ConvexPolyhedron(s) => Either::Left(ConvexPart::Polyhedron(s)),
            Shape::Triangle(s) => Either::Left(ConvexPart::Triangle(*s)),
            Shape::HeightField(s) => Either::Right(s),
            Shape::TriMesh(s) => Either::Right(s),
            Shape::Compound(s) => Either::Right(s),
        }
    }

    /// This shape as a convex part, if it is convex.
    pub fn as_convex(&self) -> Option<ConvexPart<'_>> {
        self.classify().left()
    }

    /// This shape as a concave shape, if it is concave.
    pub fn as_concave(&self) -> Option<&dyn ConcaveShape> {
        self.classify().right()
    }

    /// Is this shape convex?
    pub fn is_convex(&self) -> bool {
        self.classify().is_left()
    }

    /// The AABB of this shape, in its local-space.
    pub fn local_aabb(&self) -> Aabb {
        match self.classify() {
            Either::Left(part) => part.local_aabb(),
            Either::Right(concave) => concave.local_aabb(),
        }
    }

    /// The AABB of this shape transformed by `pos`.
    pub fn compute_aabb(&self, pos: &Isometry<Real>) -> Aabb {
        match self.classify() {
            Either::Left(part) => part.compute_aabb(pos),
            Either::Right(concave) => concave.local_aabb().transform_by(pos),
        }
    }

    /// The mass properties of this shape with the given density.
    ///
    /// Triangles, heightfields, and triangle meshes are massless.
    pub fn mass_properties(&self, density: Real) -> MassProperties {
        match self {
            Shape::Ball(s) => MassProperties::from_ball(density, s),
            Shape::ConvexPolyhedron(s) => MassProperties::from_convex_polyhedron(density, s),
            Shape::Compound(s) => s.mass_properties(density),
            Shape::Triangle(_) | Shape::HeightField(_) | Shape::TriMesh(_) => {
                MassProperties::zero()
            }
        }
    }
}

impl RayCast for Shape {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        match self {
            Shape::Ball(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            Shape::ConvexPolyhedron(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            Shape::Triangle(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            Shape::HeightField(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            Shape::TriMesh(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
            Shape::Compound(s) => s.cast_local_ray_and_get_normal(ray, max_toi, solid),
        }
    }
}

impl From<Ball> for Shape {
    fn from(s: Ball) -> Self {
        Shape::Ball(s)
    }
}

impl From<ConvexPolyhedron> for Shape {
    fn from(s: ConvexPolyhedron) -> Self {
        Shape::ConvexPolyhedron(s)
    }
}

impl From<Triangle> for Shape {
    fn from(s: Triangle) -> Self {
        Shape::Triangle(s)
    }
}

impl From<HeightField> for Shape {
    fn from(s: HeightField) -> Self {
        Shape::HeightField(s)
    }
}

impl From<TriMesh> for Shape {
    fn from(s: TriMesh) -> Self {
        Shape::TriMesh(s)
    }
}

impl From<Compound> for Shape {
    fn from(s: Compound) -> Self {
        Shape::Compound(s)
    }
}

use crate::math::{Isometry, Point, Real, UnitVector, Vector};
use na::Unit;
use smallvec::SmallVec;

/// A vertex, an edge, or a planar convex polygon of a convex shape.
///
/// Faces list their vertices counter-clockwise when seen from the outside, and carry their
/// outward normal.
#[derive(Debug, Clone, Default)]
pub struct PolygonalFeature {
    /// The vertices of this feature.
    pub vertices: SmallVec<[Point<Real>; 4]>,
    /// The outward normal of this feature, set only if it is a face.
    pub normal: Option<UnitVector<Real>>,
}

impl PolygonalFeature {
    /// Creates an empty feature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets this feature to an empty one, keeping its allocation.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.normal = None;
    }

    /// Is this feature a face (at least three vertices and a normal)?
    pub fn is_face(&self) -> bool {
        self.vertices.len() >= 3 && self.normal.is_some()
    }

    /// Transforms every vertex, and the normal, by `pos`.
    pub fn transform_by(&mut self, pos: &Isometry<Real>) {
        for p in &mut self.vertices {
            *p = pos * *p;
        }

        if let Some(n) = &mut self.normal {
            *n = pos * *n;
        }
    }

    /// Sets this feature to the face made of `vertices` with the given outward normal.
    pub fn set_face(&mut self, vertices: &[Point<Real>], normal: UnitVector<Real>) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        self.normal = Some(normal);
    }

    /// Sets this feature to a single vertex.
    pub fn set_vertex(&mut self, vertex: Point<Real>) {
        self.clear();
        self.vertices.push(vertex);
    }
}

/// Trait implemented by convex shapes with features with polyhedral approximations.
pub trait PolygonalFeatureMap {
    /// Compute the support polygonal face of `self` towards the `dir`.
    fn local_support_feature(&self, dir: &Unit<Vector<Real>>, out_feature: &mut PolygonalFeature);
}

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, UnitVector, Vector};
use crate::shape::{PolygonalFeature, PolygonalFeatureMap, SupportMap, Triangle};
use arrayvec::ArrayVec;
use na::Unit;

/// A triangle extruded along a vector.
///
/// This is the convex part a thickened [`HeightField`](crate::shape::HeightField) is made of:
/// the top face is the terrain triangle and the prism extends below it, so shallow bodies
/// cannot tunnel through the terrain between two frames.
#[derive(PartialEq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct TriangularPrism {
    /// The top face of the prism.
    pub top: Triangle,
    /// The vector the top face is extruded along to form the bottom face.
    pub extrusion: Vector<Real>,
}

impl TriangularPrism {
    /// Creates a prism by sweeping `top` along `extrusion`.
    pub fn new(top: Triangle, extrusion: Vector<Real>) -> Self {
        Self { top, extrusion }
    }

    /// The six vertices of this prism: the top triangle then the bottom triangle.
    pub fn vertices(&self) -> [Point<Real>; 6] {
        let e = self.extrusion;
        [
            self.top.a,
            self.top.b,
            self.top.c,
            self.top.a + e,
            self.top.b + e,
            self.top.c + e,
        ]
    }

    /// The local AABB of this prism.
    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices())
    }

    /// The faces of this prism, with their vertices ordered counter-clockwise from the outside,
    /// and their outward normal.
    ///
    /// Faces with a zero area are skipped.
    pub fn faces(&self) -> ArrayVec<(ArrayVec<Point<Real>, 4>, UnitVector<Real>), 5> {
        let [a, b, c, a2, b2, c2] = self.vertices();
        let center = Point::from(
            (a.coords + b.coords + c.coords + a2.coords + b2.coords + c2.coords) / 6.0,
        );
        let mut result = ArrayVec::new();

        let candidates: [&[Point<Real>]; 5] = [
            &[a, b, c],
            &[a2, b2, c2],
            &[a, b, b2, a2],
            &[b, c, c2, b2],
            &[c, a, a2, c2],
        ];

        for pts in candidates {
            let mut normal = Vector::zeros();

            // Newell's method.
            for i in 0..pts.len() {
                let p = pts[i];
                let q = pts[(i + 1) % pts.len()];
                normal += (p - Point::origin()).cross(&(q - Point::origin()));
            }

            let Some(mut normal) = UnitVector::try_new(normal, crate::math::DEFAULT_EPSILON)
            else {
                continue;
            };

            let mut vertices: ArrayVec<Point<Real>, 4> = pts.iter().copied().collect();

            if normal.dot(&(pts[0] - center)) < 0.0 {
                normal = -normal;
                vertices.reverse();
            }

            result.push((vertices, normal));
        }

        result
    }
}

impl SupportMap for TriangularPrism {
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real> {
        let top = self.top.local_support_point(dir);

        if self.extrusion.dot(dir) > 0.0 {
            top + self.extrusion
        } else {
            top
        }
    }
}

impl PolygonalFeatureMap for TriangularPrism {
    fn local_support_feature(&self, dir: &Unit<Vector<Real>>, out_feature: &mut PolygonalFeature) {
        let faces = self.faces();
        let best = faces
            .iter()
            .max_by(|f1, f2| f1.1.dot(dir).total_cmp(&f2.1.dot(dir)));

        match best {
            Some((vertices, normal)) => out_feature.set_face(vertices, *normal),
            None => out_feature.set_vertex(self.local_support_point_toward(dir)),
        }
    }
}

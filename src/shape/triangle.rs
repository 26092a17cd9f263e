//! Definition of the triangle shape.

use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Point, Real, UnitVector, Vector};
use crate::shape::{PolygonalFeature, PolygonalFeatureMap, SupportMap};
use crate::utils;

use na::Unit;

/// A triangle shape.
///
/// Triangles are double-sided: collisions and ray casts are detected from both sides.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct Triangle {
    /// The triangle first point.
    pub a: Point<Real>,
    /// The triangle second point.
    pub b: Point<Real>,
    /// The triangle third point.
    pub c: Point<Real>,
}

/// Description of the location of a point on a triangle.
#[derive(Copy, Clone, Debug)]
pub enum TrianglePointLocation {
    /// The point lies on a vertex.
    OnVertex(u32),
    /// The point lies on an edge.
    ///
    /// The 0-th edge is the segment AB.
    /// The 1-st edge is the segment BC.
    /// The 2-nd edge is the segment AC.
    OnEdge(u32, [Real; 2]),
    /// The point lies on the triangle interior, with the given barycentric coordinates.
    OnFace([Real; 3]),
}

impl TrianglePointLocation {
    /// The barycentric coordinates corresponding to this point location.
    pub fn barycentric_coordinates(&self) -> [Real; 3] {
        let mut bcoords = [0.0; 3];

        match self {
            TrianglePointLocation::OnVertex(i) => bcoords[*i as usize] = 1.0,
            TrianglePointLocation::OnEdge(i, uv) => {
                let idx = match i {
                    0 => (0, 1),
                    1 => (1, 2),
                    _ => (0, 2),
                };

                bcoords[idx.0] = uv[0];
                bcoords[idx.1] = uv[1];
            }
            TrianglePointLocation::OnFace(uvw) => bcoords = *uvw,
        }

        bcoords
    }

    /// Returns `true` if the point is located on the relative interior of the triangle.
    pub fn is_on_face(&self) -> bool {
        matches!(*self, TrianglePointLocation::OnFace(..))
    }
}

impl From<[Point<Real>; 3]> for Triangle {
    fn from(arr: [Point<Real>; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl Triangle {
    /// Creates a triangle from three points.
    #[inline]
    pub fn new(a: Point<Real>, b: Point<Real>, c: Point<Real>) -> Triangle {
        Triangle { a, b, c }
    }

    /// The vertices of this triangle.
    #[inline]
    pub fn vertices(&self) -> [Point<Real>; 3] {
        [self.a, self.b, self.c]
    }

    /// The normal of this triangle assuming it is oriented ccw.
    ///
    /// Returns `None` if the triangle is degenerate.
    #[inline]
    pub fn normal(&self) -> Option<UnitVector<Real>> {
        utils::ccw_face_normal([&self.a, &self.b, &self.c])
    }

    /// A vector normal of this triangle, with a norm equal to twice its area.
    #[inline]
    pub fn scaled_normal(&self) -> Vector<Real> {
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        ab.cross(&ac)
    }

    /// The area of this triangle.
    #[inline]
    pub fn area(&self) -> Real {
        self.scaled_normal().norm() * 0.5
    }

    /// The geometric center of this triangle.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        Point::from((self.a.coords + self.b.coords + self.c.coords) / 3.0)
    }

    /// Returns a new triangle with vertices transformed by `m`.
    #[inline]
    pub fn transformed(&self, m: &Isometry<Real>) -> Self {
        Triangle::new(m * self.a, m * self.b, m * self.c)
    }

    /// The local AABB of this triangle.
    #[inline]
    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_points(&[self.a, self.b, self.c])
    }

    /// Checks if the vertices of this triangle are collinear, up to a small tolerance.
    pub fn is_affinely_dependent(&self) -> bool {
        const EPS: Real = crate::math::DEFAULT_EPSILON * 100.0;

        let p1p2 = self.b - self.a;
        let p1p3 = self.c - self.a;
        approx::relative_eq!(p1p2.cross(&p1p3).norm_squared(), 0.0, epsilon = EPS * EPS)
    }

    /// Projects `pt` on this triangle, and returns the location of the projection.
    ///
    /// The edge tests are strict: a point projecting exactly on an edge from outside of the
    /// triangle plane is reported `OnFace`, with a zero barycentric coordinate.
    pub fn project_local_point_and_get_location(
        &self,
        pt: &Point<Real>,
    ) -> (Point<Real>, TrianglePointLocation) {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;
        let bc = c - b;
        let ap = pt - a;
        let bp = pt - b;
        let cp = pt - c;

        let ab_ap = ab.dot(&ap);
        let ac_ap = ac.dot(&ap);
        if ab_ap <= 0.0 && ac_ap <= 0.0 {
            return (a, TrianglePointLocation::OnVertex(0));
        }

        let ab_bp = ab.dot(&bp);
        let ac_bp = ac.dot(&bp);
        if ab_bp >= 0.0 && ac_bp <= ab_bp {
            return (b, TrianglePointLocation::OnVertex(1));
        }

        let ab_cp = ab.dot(&cp);
        let ac_cp = ac.dot(&cp);
        if ac_cp >= 0.0 && ab_cp <= ac_cp {
            return (c, TrianglePointLocation::OnVertex(2));
        }

        // Each of these is a barycentric coordinate scaled by |n|².
        let n = ab.cross(&ac);

        let vc = n.dot(&ab.cross(&ap));
        if vc < 0.0 && ab_ap >= 0.0 && ab_bp <= 0.0 {
            let v = ab_ap / ab.norm_squared();
            return (a + ab * v, TrianglePointLocation::OnEdge(0, [1.0 - v, v]));
        }

        let vb = -n.dot(&ac.cross(&cp));
        if vb < 0.0 && ac_ap >= 0.0 && ac_cp <= 0.0 {
            let w = ac_ap / ac.norm_squared();
            return (a + ac * w, TrianglePointLocation::OnEdge(2, [1.0 - w, w]));
        }

        let va = n.dot(&bc.cross(&bp));
        if va < 0.0 && ac_bp - ab_bp >= 0.0 && ab_cp - ac_cp >= 0.0 {
            let w = bc.dot(&bp) / bc.norm_squared();
            return (b + bc * w, TrianglePointLocation::OnEdge(1, [1.0 - w, w]));
        }

        let sum = va + vb + vc;
        if sum <= Real::EPSILON * (ab.norm_squared() * ac.norm_squared()) {
            return self.project_on_closest_edge(pt);
        }

        let v = vb / sum;
        let w = vc / sum;
        (
            a + ab * v + ac * w,
            TrianglePointLocation::OnFace([1.0 - v - w, v, w]),
        )
    }

    /// Projection on the closest of the three edges, for degenerate triangles.
    fn project_on_closest_edge(&self, pt: &Point<Real>) -> (Point<Real>, TrianglePointLocation) {
        let edges = [(0, self.a, self.b), (1, self.b, self.c), (2, self.a, self.c)];
        let mut best = (Real::MAX, self.a, TrianglePointLocation::OnVertex(0));

        for (id, p, q) in edges {
            let pq = q - p;
            let len_sq = pq.norm_squared();
            let t = if len_sq > 0.0 {
                (pq.dot(&(pt - p)) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let proj = p + pq * t;
            let dist_sq = (pt - proj).norm_squared();

            if dist_sq < best.0 {
                best = (dist_sq, proj, TrianglePointLocation::OnEdge(id, [1.0 - t, t]));
            }
        }

        (best.1, best.2)
    }
}

impl SupportMap for Triangle {
    #[inline]
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real> {
        let d1 = self.a.coords.dot(dir);
        let d2 = self.b.coords.dot(dir);
        let d3 = self.c.coords.dot(dir);

        if d1 > d2 {
            if d1 > d3 {
                self.a
            } else {
                self.c
            }
        } else if d2 > d3 {
            self.b
        } else {
            self.c
        }
    }
}

impl PolygonalFeatureMap for Triangle {
    fn local_support_feature(&self, dir: &Unit<Vector<Real>>, out_feature: &mut PolygonalFeature) {
        match self.normal() {
            Some(normal) if normal.dot(dir) >= 0.0 => {
                out_feature.set_face(&[self.a, self.b, self.c], normal)
            }
            Some(normal) => out_feature.set_face(&[self.a, self.c, self.b], -normal),
            None => out_feature.set_vertex(self.local_support_point_toward(dir)),
        }
    }
}

use crate::math::{Point, Real};
use crate::query::gjk::{self, CSOPoint};
use crate::shape::{Triangle, TrianglePointLocation};

/// The faces of a tetrahedron, each with the index of the vertex opposite to it.
const TETRAHEDRON_FACES: [([usize; 3], usize); 4] = [
    ([0, 1, 2], 3),
    ([0, 1, 3], 2),
    ([0, 2, 3], 1),
    ([1, 2, 3], 0),
];

/// A simplex of dimension up to 3 using Voronoï regions for computing point projections.
#[derive(Clone, Debug)]
pub struct VoronoiSimplex {
    prev_vertices: [CSOPoint; 4],
    prev_proj: [Real; 4],
    prev_dim: usize,

    vertices: [CSOPoint; 4],
    proj: [Real; 4],
    dim: usize,
}

impl Default for VoronoiSimplex {
    fn default() -> Self {
        Self::new()
    }
}

impl VoronoiSimplex {
    /// Creates a new empty simplex.
    pub fn new() -> VoronoiSimplex {
        VoronoiSimplex {
            prev_vertices: [CSOPoint::origin(); 4],
            prev_proj: [0.0; 4],
            prev_dim: 0,
            vertices: [CSOPoint::origin(); 4],
            proj: [0.0; 4],
            dim: 0,
        }
    }

    /// Resets this simplex to a single point.
    pub fn reset(&mut self, pt: CSOPoint) {
        self.prev_dim = 0;
        self.dim = 0;
        self.vertices[0] = pt;
        self.proj[0] = 1.0;
        self.prev_vertices[0] = pt;
        self.prev_proj[0] = 1.0;
    }

    /// Add a point to this simplex.
    ///
    /// Returns `false` if the point is too close to a vertex of this simplex, or if this simplex
    /// is already a tetrahedron.
    pub fn add_point(&mut self, pt: CSOPoint) -> bool {
        if self.dim == 3 {
            return false;
        }

        self.prev_dim = self.dim;
        self.prev_proj = self.proj;
        self.prev_vertices = self.vertices;

        for i in 0..self.dim + 1 {
            if (self.vertices[i].point - pt.point).norm_squared() < gjk::eps_tol() {
                return false;
            }
        }

        self.dim += 1;
        self.vertices[self.dim] = pt;
        true
    }

    /// Retrieves the barycentric coordinate associated to the `i`-th vertex by the last call to
    /// `project_origin_and_reduce`.
    pub fn proj_coord(&self, i: usize) -> Real {
        assert!(i <= self.dim, "Index out of bounds.");
        self.proj[i]
    }

    /// The i-th point of this simplex.
    pub fn point(&self, i: usize) -> &CSOPoint {
        assert!(i <= self.dim, "Index out of bounds.");
        &self.vertices[i]
    }

    /// Retrieves the barycentric coordinate associated to the `i`-th vertex before the last call
    /// to `add_point`.
    pub fn prev_proj_coord(&self, i: usize) -> Real {
        assert!(i <= self.prev_dim, "Index out of bounds.");
        self.prev_proj[i]
    }

    /// The i-th point of the simplex before the last call to `add_point`.
    pub fn prev_point(&self, i: usize) -> &CSOPoint {
        assert!(i <= self.prev_dim, "Index out of bounds.");
        &self.prev_vertices[i]
    }

    /// The dimension of the smallest subspace that can contain this simplex.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// The dimension of the simplex before the last call to `add_point`.
    pub fn prev_dimension(&self) -> usize {
        self.prev_dim
    }

    /// The maximum squared length of the vertices of this simplex.
    pub fn max_sq_len(&self) -> Real {
        self.vertices[..self.dim + 1]
            .iter()
            .map(|v| v.point.coords.norm_squared())
            .fold(0.0, Real::max)
    }

    /// Tests if the given point is already a vertex of this simplex.
    pub fn contains_point(&self, pt: &Point<Real>) -> bool {
        self.vertices[..self.dim + 1].iter().any(|v| v.point == *pt)
    }

    /// Projects the origin on the boundary of this simplex and reduces `self` to the smallest
    /// subsimplex containing the projection.
    ///
    /// Returns the projection, or `Point::origin()` if the origin lies inside of the
    /// tetrahedron, in which case `self` is left unreduced.
    pub fn project_origin_and_reduce(&mut self) -> Point<Real> {
        match self.dim {
            0 => {
                self.proj[0] = 1.0;
                self.vertices[0].point
            }
            1 => self.project_on_segment(),
            2 => {
                let tri = [self.vertices[0], self.vertices[1], self.vertices[2]];
                let (proj, location) = Self::project_on_triangle(&tri);
                self.reduce_to(&tri, location);
                proj
            }
            _ => self.project_on_tetrahedron(),
        }
    }

    fn project_on_segment(&mut self) -> Point<Real> {
        let a = self.vertices[0].point;
        let ab = self.vertices[1].point - a;
        let ab_sq = ab.norm_squared();
        let t = if ab_sq > 0.0 {
            -a.coords.dot(&ab) / ab_sq
        } else {
            0.0
        };

        if t <= 0.0 {
            self.proj[0] = 1.0;
            self.dim = 0;
            a
        } else if t >= 1.0 {
            self.vertices[0] = self.vertices[1];
            self.proj[0] = 1.0;
            self.dim = 0;
            self.vertices[0].point
        } else {
            self.proj[0] = 1.0 - t;
            self.proj[1] = t;
            a + ab * t
        }
    }

    fn project_on_triangle(tri: &[CSOPoint; 3]) -> (Point<Real>, TrianglePointLocation) {
        Triangle::new(tri[0].point, tri[1].point, tri[2].point)
            .project_local_point_and_get_location(&Point::origin())
    }

    fn project_on_tetrahedron(&mut self) -> Point<Real> {
        let pts = self.vertices;
        let a = pts[0].point;
        let volume = (pts[1].point - a)
            .cross(&(pts[2].point - a))
            .dot(&(pts[3].point - a));
        let scale = self.max_sq_len().max(1.0);
        let degenerate = volume.abs() <= gjk::eps_tol() * scale * scale.sqrt();

        let mut best: Option<(Real, Point<Real>, [CSOPoint; 3], TrianglePointLocation)> = None;

        for (face, opp) in TETRAHEDRON_FACES {
            let tri = [pts[face[0]], pts[face[1]], pts[face[2]]];
            let p0 = tri[0].point;
            let n = (tri[1].point - p0).cross(&(tri[2].point - p0));

            // Only the faces separating the origin from the opposite vertex can hold the
            // projection.
            if !degenerate && (-n.dot(&p0.coords)) * n.dot(&(pts[opp].point - p0)) >= 0.0 {
                continue;
            }

            let (proj, location) = Self::project_on_triangle(&tri);
            let sq_dist = proj.coords.norm_squared();

            if best.as_ref().map(|b| sq_dist < b.0).unwrap_or(true) {
                best = Some((sq_dist, proj, tri, location));
            }
        }

        if let Some((_, proj, tri, location)) = best {
            self.reduce_to(&tri, location);
            proj
        } else {
            // The origin is inside of the tetrahedron.
            let sub_volume = |i: usize| {
                let mut p = pts.map(|v| v.point);
                p[i] = Point::origin();
                (p[1] - p[0]).cross(&(p[2] - p[0])).dot(&(p[3] - p[0]))
            };

            for i in 0..4 {
                self.proj[i] = sub_volume(i) / volume;
            }

            Point::origin()
        }
    }

    fn reduce_to(&mut self, tri: &[CSOPoint; 3], location: TrianglePointLocation) {
        match location {
            TrianglePointLocation::OnVertex(i) => {
                self.vertices[0] = tri[i as usize];
                self.proj[0] = 1.0;
                self.dim = 0;
            }
            TrianglePointLocation::OnEdge(e, coords) => {
                let (i, j) = match e {
                    0 => (0, 1),
                    1 => (1, 2),
                    _ => (0, 2),
                };
                self.vertices[0] = tri[i];
                self.vertices[1] = tri[j];
                self.proj[0] = coords[0];
                self.proj[1] = coords[1];
                self.dim = 1;
            }
            TrianglePointLocation::OnFace(bcoords) => {
                self.vertices[..3].copy_from_slice(tri);
                self.proj[..3].copy_from_slice(&bcoords);
                self.dim = 2;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::VoronoiSimplex;
    use crate::math::Point;
    use crate::query::gjk::CSOPoint;

    fn pt(x: f32, y: f32, z: f32) -> CSOPoint {
        CSOPoint::new(Point::new(x, y, z), Point::origin())
    }

    #[test]
    fn segment_reduces_to_closest_vertex() {
        let mut simplex = VoronoiSimplex::new();
        simplex.reset(pt(1.0, 1.0, 0.0));
        assert!(simplex.add_point(pt(2.0, 1.0, 0.0)));

        let proj = simplex.project_origin_and_reduce();
        assert_eq!(proj, Point::new(1.0, 1.0, 0.0));
        assert_eq!(simplex.dimension(), 0);
    }

    #[test]
    fn triangle_projection_keeps_face() {
        let mut simplex = VoronoiSimplex::new();
        simplex.reset(pt(-1.0, -1.0, 1.0));
        assert!(simplex.add_point(pt(1.0, -1.0, 1.0)));
        assert!(simplex.add_point(pt(0.0, 1.0, 1.0)));

        let proj = simplex.project_origin_and_reduce();
        assert_relative_eq!(proj, Point::new(0.0, 0.0, 1.0), epsilon = 1.0e-6);
        assert_eq!(simplex.dimension(), 2);
        let sum: f32 = (0..3).map(|i| simplex.proj_coord(i)).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1.0e-6);
    }

    #[test]
    fn tetrahedron_containing_origin() {
        let mut simplex = VoronoiSimplex::new();
        simplex.reset(pt(-1.0, -1.0, -1.0));
        assert!(simplex.add_point(pt(1.0, -1.0, -1.0)));
        assert!(simplex.add_point(pt(0.0, 1.0, -1.0)));
        assert!(simplex.add_point(pt(0.0, 0.0, 1.0)));

        assert_eq!(simplex.project_origin_and_reduce(), Point::origin());
        assert_eq!(simplex.dimension(), 3);
        let sum: f32 = (0..4).map(|i| simplex.proj_coord(i)).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1.0e-5);
    }

    #[test]
    fn tetrahedron_reduces_to_closest_face() {
        let mut simplex = VoronoiSimplex::new();
        simplex.reset(pt(-1.0, -1.0, 1.0));
        assert!(simplex.add_point(pt(1.0, -1.0, 1.0)));
        assert!(simplex.add_point(pt(0.0, 1.0, 1.0)));
        assert!(simplex.add_point(pt(0.0, 0.0, 3.0)));

        let proj = simplex.project_origin_and_reduce();
        assert_relative_eq!(proj, Point::new(0.0, 0.0, 1.0), epsilon = 1.0e-6);
        assert_eq!(simplex.dimension(), 2);
    }
}

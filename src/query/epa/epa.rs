//! The Expanding Polytope Algorithm.
//!
//! Starting from the simplex GJK stopped with, the EPA grows a polytope inside of the CSO until
//! it finds the face of the CSO closest to the origin. This gives the penetration depth and
//! direction of two intersecting convex shapes.

use core::cmp::Ordering;
use std::collections::BinaryHeap;

use na::{self, Unit};

use crate::math::{Isometry, Point, Real, Vector};
use crate::query::gjk::{self, CSOPoint, VoronoiSimplex};
use crate::shape::{SupportMap, Triangle};
use crate::utils;

#[derive(Copy, Clone, PartialEq)]
struct FaceId {
    id: usize,
    neg_dist: Real,
}

impl FaceId {
    fn new(id: usize, dist: Real) -> Self {
        FaceId {
            id,
            neg_dist: -dist,
        }
    }
}

impl Eq for FaceId {}

impl PartialOrd for FaceId {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FaceId {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.neg_dist
            .partial_cmp(&other.neg_dist)
            .unwrap_or(Ordering::Equal)
    }
}

#[derive(Clone, Debug)]
struct Face {
    pts: [usize; 3],
    adj: [usize; 3],
    normal: Unit<Vector<Real>>,
    bcoords: [Real; 3],
    deleted: bool,
}

impl Face {
    fn new_with_proj(
        vertices: &[CSOPoint],
        bcoords: [Real; 3],
        pts: [usize; 3],
        adj: [usize; 3],
    ) -> Self {
        // Degenerate faces get a zero normal: they can be seen from any point and are
        // removed by the first silhouette computation reaching them.
        let normal = utils::ccw_face_normal([
            &vertices[pts[0]].point,
            &vertices[pts[1]].point,
            &vertices[pts[2]].point,
        ])
        .unwrap_or_else(|| Unit::new_unchecked(Vector::zeros()));

        Face {
            pts,
            bcoords,
            adj,
            normal,
            deleted: false,
        }
    }

    /// Creates a face, and tells if the projection of the origin on its plane lies inside of it.
    fn new(vertices: &[CSOPoint], pts: [usize; 3], adj: [usize; 3]) -> (Self, bool) {
        let tri = Triangle::new(
            vertices[pts[0]].point,
            vertices[pts[1]].point,
            vertices[pts[2]].point,
        );
        let (proj, loc) = tri.project_local_point_and_get_location(&Point::origin());
        let face = Self::new_with_proj(vertices, loc.barycentric_coordinates(), pts, adj);

        // The projection on the triangle matches the one on its plane when the latter lies in
        // the closed triangle, even if it is reported on an edge or a vertex.
        let foot = *face.normal * face.normal.dot(&tri.a.coords);
        let scale = tri.a.coords.norm().max(1.0);
        let tol = crate::math::DEFAULT_EPSILON * 100.0 * scale;
        let inside = loc.is_on_face() || (proj.coords - foot).norm_squared() <= tol * tol;

        (face, inside)
    }

    fn dist(&self, vertices: &[CSOPoint]) -> Real {
        self.normal.dot(&vertices[self.pts[0]].point.coords)
    }

    fn closest_points(&self, vertices: &[CSOPoint]) -> (Point<Real>, Point<Real>) {
        let mut p1 = Point::origin();
        let mut p2 = Point::origin();

        for k in 0..3 {
            p1 += vertices[self.pts[k]].orig1.coords * self.bcoords[k];
            p2 += vertices[self.pts[k]].orig2.coords * self.bcoords[k];
        }

        (p1, p2)
    }

    fn next_ccw_pt_id(&self, id: usize) -> usize {
        if self.pts[0] == id {
            1
        } else if self.pts[1] == id {
            2
        } else {
            if self.pts[2] != id {
                log::debug!(
                    "Hit unexpected state in EPA: found index {}, expected: {}.",
                    self.pts[2],
                    id
                );
            }

            0
        }
    }

    fn can_be_seen_by(&self, vertices: &[CSOPoint], point: usize, opp_pt_id: usize) -> bool {
        let p0 = &vertices[self.pts[opp_pt_id]].point;
        let p1 = &vertices[self.pts[(opp_pt_id + 1) % 3]].point;
        let p2 = &vertices[self.pts[(opp_pt_id + 2) % 3]].point;
        let pt = &vertices[point].point;

        // A zero dot product must count as visible so degenerate faces get removed.
        (*pt - *p0).dot(&self.normal) >= -gjk::eps_tol()
            || Triangle::new(*p1, *p2, *pt).is_affinely_dependent()
    }
}

struct SilhouetteEdge {
    face_id: usize,
    opp_pt_id: usize,
}

/// The Expanding Polytope Algorithm in 3D.
///
/// The structure keeps its buffers between calls to avoid allocations.
#[derive(Default)]
pub struct EPA {
    vertices: Vec<CSOPoint>,
    faces: Vec<Face>,
    silhouette: Vec<SilhouetteEdge>,
    heap: BinaryHeap<FaceId>,
}

impl EPA {
    /// Creates a new instance of the 3D Expanding Polytope Algorithm.
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.heap.clear();
        self.silhouette.clear();
    }

    /// Computes the penetration of two intersecting shapes.
    ///
    /// The `simplex` is the one GJK returned `GJKResult::Intersection` with. The expansion stops
    /// once the distance of the best face is known within `tolerance`, or after
    /// `max_iterations` expansions.
    ///
    /// Returns the deepest points of each shape and the unit normal pointing from the first
    /// shape to the second, all expressed in the local-space of the first shape. The
    /// penetration depth is `(p1 - p2).dot(&n)`. Returns `None` if the polytope degenerated.
    pub fn closest_points<G1, G2>(
        &mut self,
        pos12: &Isometry<Real>,
        g1: &G1,
        g2: &G2,
        simplex: &VoronoiSimplex,
        tolerance: Real,
        max_iterations: usize,
    ) -> Option<(Point<Real>, Point<Real>, Unit<Vector<Real>>)>
    where
        G1: ?Sized + SupportMap,
        G2: ?Sized + SupportMap,
    {
        let _eps = crate::math::DEFAULT_EPSILON;

        self.reset();

        for i in 0..simplex.dimension() + 1 {
            self.vertices.push(*simplex.point(i));
        }

        if self.vertices.len() == 4 {
            self.init_tetrahedron();
        } else {
            self.grow_to_triangle(pos12, g1, g2)?;

            let (face1, _) = Face::new(&self.vertices, [0, 1, 2], [1, 1, 1]);
            let (face2, _) = Face::new(&self.vertices, [0, 2, 1], [0, 0, 0]);
            self.faces.push(face1);
            self.faces.push(face2);

            for i in 0..2 {
                let dist = self.faces[i].dist(&self.vertices);
                self.heap.push(FaceId::new(i, dist));
            }
        }

        let mut niter = 0;
        let mut max_dist = Real::MAX;
        let mut best_face_id = *self.heap.peek()?;
        let mut old_dist = 0.0;

        while let Some(face_id) = self.heap.pop() {
            let face = self.faces[face_id.id].clone();

            if face.deleted {
                continue;
            }

            let cso_point = CSOPoint::from_shapes(pos12, g1, g2, &face.normal);
            let support_point_id = self.vertices.len();
            self.vertices.push(cso_point);

            let candidate_max_dist = cso_point.point.coords.dot(&face.normal);

            if candidate_max_dist < max_dist {
                best_face_id = face_id;
                max_dist = candidate_max_dist;
            }

            let curr_dist = -face_id.neg_dist;

            if max_dist - curr_dist < tolerance
                // The algorithm is stuck because of numerical errors: accept this face.
                || ((curr_dist - old_dist).abs() < _eps && candidate_max_dist < max_dist)
            {
                let best_face = &self.faces[best_face_id.id];
                let points = best_face.closest_points(&self.vertices);
                return Some((points.0, points.1, best_face.normal));
            }

            old_dist = curr_dist;

            self.faces[face_id.id].deleted = true;

            for k in 0..3 {
                let adj_opp_pt_id = self.faces[face.adj[k]].next_ccw_pt_id(face.pts[k]);
                self.compute_silhouette(support_point_id, face.adj[k], adj_opp_pt_id);
            }

            let first_new_face_id = self.faces.len();

            if self.silhouette.is_empty() {
                log::debug!("EPA failed to extract a silhouette.");
                return None;
            }

            for edge in &self.silhouette {
                if !self.faces[edge.face_id].deleted {
                    let new_face_id = self.faces.len();

                    let face_adj = &mut self.faces[edge.face_id];
                    let pt_id1 = face_adj.pts[(edge.opp_pt_id + 2) % 3];
                    let pt_id2 = face_adj.pts[(edge.opp_pt_id + 1) % 3];

                    let pts = [pt_id1, pt_id2, support_point_id];
                    let adj = [edge.face_id, new_face_id + 1, new_face_id - 1];
                    let (new_face, proj_inside) = Face::new(&self.vertices, pts, adj);

                    face_adj.adj[(edge.opp_pt_id + 1) % 3] = new_face_id;

                    self.faces.push(new_face);

                    if proj_inside {
                        let dist = self.faces[new_face_id].dist(&self.vertices);

                        if dist < curr_dist {
                            // Numerical errors made the polytope non-convex.
                            let points = face.closest_points(&self.vertices);
                            return Some((points.0, points.1, face.normal));
                        }

                        self.heap.push(FaceId::new(new_face_id, dist));
                    }
                }
            }

            if first_new_face_id == self.faces.len() {
                log::debug!("EPA silhouette only contained deleted faces.");
                return None;
            }

            let last_face_id = self.faces.len() - 1;
            self.faces[first_new_face_id].adj[2] = last_face_id;
            self.faces[last_face_id].adj[1] = first_new_face_id;

            self.silhouette.clear();

            niter += 1;
            if niter >= max_iterations {
                log::debug!(
                    "EPA did not converge after {} iterations (distance bounds: [{}, {}]).",
                    niter,
                    curr_dist,
                    max_dist
                );
                break;
            }
        }

        let best_face = &self.faces[best_face_id.id];
        let points = best_face.closest_points(&self.vertices);
        Some((points.0, points.1, best_face.normal))
    }

    /// Builds the four faces of a tetrahedral GJK simplex.
    ///
    /// Only the faces containing the projection of the origin on their plane can be the closest
    /// one. If none does, the origin is barely outside of the tetrahedron and every face is kept.
    fn init_tetrahedron(&mut self) {
        let dp1 = self.vertices[1] - self.vertices[0];
        let dp2 = self.vertices[2] - self.vertices[0];
        let dp3 = self.vertices[3] - self.vertices[0];

        if dp1.cross(&dp2).dot(&dp3) > 0.0 {
            self.vertices.swap(1, 2)
        }

        let faces = [
            ([0, 1, 2], [3, 1, 2]),
            ([1, 3, 2], [3, 2, 0]),
            ([0, 2, 3], [0, 1, 3]),
            ([0, 3, 1], [2, 1, 0]),
        ];
        let mut inside = [false; 4];

        for (i, (pts, adj)) in faces.into_iter().enumerate() {
            let (face, proj_inside) = Face::new(&self.vertices, pts, adj);
            self.faces.push(face);
            inside[i] = proj_inside;
        }

        let keep_all = !inside.contains(&true);
        if keep_all {
            log::debug!("EPA: the origin does not project inside of any initial face.");
        }

        for (i, proj_inside) in inside.into_iter().enumerate() {
            if proj_inside || keep_all {
                let dist = self.faces[i].dist(&self.vertices);
                self.heap.push(FaceId::new(i, dist));
            }
        }
    }

    /// Completes a GJK simplex of one or two points into a non-degenerate triangle.
    fn grow_to_triangle<G1, G2>(&mut self, pos12: &Isometry<Real>, g1: &G1, g2: &G2) -> Option<()>
    where
        G1: ?Sized + SupportMap,
        G2: ?Sized + SupportMap,
    {
        let min_sq_dist = gjk::eps_tol();

        if self.vertices.len() == 1 {
            let origin = self.vertices[0].point;
            let second = [
                Vector::x(),
                Vector::y(),
                Vector::z(),
                -Vector::x(),
                -Vector::y(),
                -Vector::z(),
            ]
            .iter()
            .map(|dir| CSOPoint::from_shapes(pos12, g1, g2, dir))
            .find(|pt| (pt.point - origin).norm_squared() > min_sq_dist)?;
            self.vertices.push(second);
        }

        if self.vertices.len() == 2 {
            let a = self.vertices[0].point;
            let ab = self.vertices[1].point - a;
            let mut third = None;
            let mut best_area = 0.0;

            // The support points on both sides of the segment, along two orthogonal axes.
            Vector::orthonormal_subspace_basis(&[ab], |dir| {
                for dir in [*dir, -*dir] {
                    let pt = CSOPoint::from_shapes(pos12, g1, g2, &dir);
                    let area = ab.cross(&(pt.point - a)).norm_squared();

                    if area > best_area {
                        best_area = area;
                        third = Some(pt);
                    }
                }
                true
            });

            if best_area <= min_sq_dist * ab.norm_squared() {
                log::debug!("EPA: the CSO is flat along the GJK simplex.");
                return None;
            }

            self.vertices.push(third?);
        }

        Some(())
    }

    fn compute_silhouette(&mut self, point: usize, id: usize, opp_pt_id: usize) {
        if !self.faces[id].deleted {
            if !self.faces[id].can_be_seen_by(&self.vertices, point, opp_pt_id) {
                self.silhouette.push(SilhouetteEdge {
                    face_id: id,
                    opp_pt_id,
                });
            } else {
                self.faces[id].deleted = true;

                let adj_pt_id1 = (opp_pt_id + 2) % 3;
                let adj_pt_id2 = opp_pt_id;

                let adj1 = self.faces[id].adj[adj_pt_id1];
                let adj2 = self.faces[id].adj[adj_pt_id2];

                let adj_opp_pt_id1 =
                    self.faces[adj1].next_ccw_pt_id(self.faces[id].pts[adj_pt_id1]);
                let adj_opp_pt_id2 =
                    self.faces[adj2].next_ccw_pt_id(self.faces[id].pts[adj_pt_id2]);

                self.compute_silhouette(point, adj1, adj_opp_pt_id1);
                self.compute_silhouette(point, adj2, adj_opp_pt_id2);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::EPA;
    use crate::math::{Isometry, Point, Vector};
    use crate::query::gjk::{self, ConstantPoint, GJKResult, GjkOptions, VoronoiSimplex};
    use crate::shape::{Ball, ConvexPolyhedron};

    #[test]
    fn penetrating_cuboids() {
        let cuboid = ConvexPolyhedron::cuboid(Vector::repeat(1.0));
        let pos12 = Isometry::translation(1.8, 0.0, 0.0);
        let mut simplex = VoronoiSimplex::new();

        let res = gjk::closest_points_with_init(
            &pos12,
            &cuboid,
            &cuboid,
            0.0,
            &GjkOptions::default(),
            &mut simplex,
        );
        assert_eq!(res, GJKResult::Intersection);

        let (p1, p2, n) = EPA::new()
            .closest_points(&pos12, &cuboid, &cuboid, &simplex, 1.0e-4, 64)
            .unwrap();
        assert_relative_eq!(*n, Vector::x(), epsilon = 1.0e-3);
        assert_relative_eq!((p1 - p2).dot(&n), 0.2, epsilon = 1.0e-3);
    }

    #[test]
    fn penetrating_balls() {
        let ball = Ball::new(1.0);
        let pos12 = Isometry::translation(0.0, 1.5, 0.0);
        let mut simplex = VoronoiSimplex::new();

        let res = gjk::closest_points_with_init(
            &pos12,
            &ball,
            &ball,
            0.0,
            &GjkOptions::default(),
            &mut simplex,
        );
        assert_eq!(res, GJKResult::Intersection);

        let (p1, p2, n) = EPA::new()
            .closest_points(&pos12, &ball, &ball, &simplex, 1.0e-4, 64)
            .unwrap();
        assert_relative_eq!(*n, Vector::y(), epsilon = 1.0e-2);
        assert_relative_eq!((p1 - p2).dot(&n), 0.5, epsilon = 1.0e-2);
    }

    #[test]
    fn point_inside_cuboid_exits_through_the_nearest_face() {
        let cuboid = ConvexPolyhedron::cuboid(Vector::repeat(0.5));
        let point = ConstantPoint(Point::origin());
        let pos12 = Isometry::translation(0.0, 0.3, 0.0);
        let mut simplex = VoronoiSimplex::new();

        let res = gjk::closest_points_with_init(
            &pos12,
            &cuboid,
            &point,
            0.0,
            &GjkOptions::default(),
            &mut simplex,
        );
        assert_eq!(res, GJKResult::Intersection);

        let (p1, p2, n) = EPA::new()
            .closest_points(&pos12, &cuboid, &point, &simplex, 1.0e-4, 64)
            .unwrap();
        assert_relative_eq!(*n, Vector::y(), epsilon = 1.0e-3);
        assert_relative_eq!((p1 - p2).dot(&n), 0.2, epsilon = 1.0e-3);
    }
}

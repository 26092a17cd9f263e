use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, UnitVector, Vector};
use crate::shape::{PolygonalFeature, PolygonalFeatureMap, ShapeError, SupportMap};
use hashbrown::hash_map::{Entry, HashMap};
use na::Unit;

/// Below this number of points, support points are computed by brute force.
const BRUTE_FORCE_SUPPORT_THRESHOLD: usize = 16;

/// An oriented edge of a [`ConvexPolyhedron`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct HalfEdge {
    /// The vertex this half-edge starts from.
    pub origin: u32,
    /// The half-edge with opposite orientation, belonging to the adjacent face.
    pub twin: u32,
    /// The next half-edge along the boundary of `face`.
    pub next: u32,
    /// The face this half-edge bounds.
    pub face: u32,
}

/// A face of a [`ConvexPolyhedron`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct PolyhedronFace {
    /// One of the half-edges bounding this face.
    pub first_half_edge: u32,
    /// The number of vertices of this face.
    pub num_vertices: u32,
    /// The outward normal of this face.
    pub normal: UnitVector<Real>,
}

/// A convex polyhedron stored as a half-edge mesh.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(PartialEq, Debug, Clone)]
pub struct ConvexPolyhedron {
    points: Vec<Point<Real>>,
    faces: Vec<PolyhedronFace>,
    half_edges: Vec<HalfEdge>,
    // One half-edge starting at each vertex.
    vertex_half_edges: Vec<u32>,
    local_aabb: Aabb,
}

impl ConvexPolyhedron {
    /// Builds a convex polyhedron from its vertices and its polygonal faces.
    ///
    /// Each face lists vertex indices counter-clockwise when seen from the outside. Every edge
    /// must be shared by exactly two faces with opposite orientations, and every vertex must lie
    /// below the plane of every face.
    pub fn new(points: Vec<Point<Real>>, faces: &[Vec<u32>]) -> Result<Self, ShapeError> {
        if points.len() < 4 || faces.len() < 4 {
            return Err(ShapeError::DegeneratePolyhedron);
        }

        let mut half_edges: Vec<HalfEdge> = Vec::new();
        let mut out_faces = Vec::with_capacity(faces.len());
        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();
        let mut vertex_half_edges = vec![u32::MAX; points.len()];

        for (fid, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(ShapeError::DegeneratePolyhedron);
            }

            let first = half_edges.len() as u32;
            let mut normal = Vector::zeros();

            for (k, &vid) in face.iter().enumerate() {
                let next_vid = face[(k + 1) % face.len()];

                for id in [vid, next_vid] {
                    if id as usize >= points.len() {
                        return Err(ShapeError::IndexOutOfRange {
                            index: id,
                            len: points.len(),
                        });
                    }
                }

                let he_id = first + k as u32;
                match edge_map.entry((vid, next_vid)) {
                    Entry::Occupied(_) => return Err(ShapeError::DegeneratePolyhedron),
                    Entry::Vacant(e) => {
                        let _ = e.insert(he_id);
                    }
                }

                if vertex_half_edges[vid as usize] == u32::MAX {
                    vertex_half_edges[vid as usize] = he_id;
                }

                // Newell's method.
                normal += points[vid as usize]
                    .coords
                    .cross(&points[next_vid as usize].coords);

                half_edges.push(HalfEdge {
                    origin: vid,
                    twin: u32::MAX,
                    next: first + ((k + 1) % face.len()) as u32,
                    face: fid as u32,
                });
            }

            let normal = UnitVector::try_new(normal, crate::math::DEFAULT_EPSILON)
                .ok_or(ShapeError::DegeneratePolyhedron)?;

            out_faces.push(PolyhedronFace {
                first_half_edge: first,
                num_vertices: face.len() as u32,
                normal,
            });
        }

        if vertex_half_edges.contains(&u32::MAX) {
            return Err(ShapeError::DegeneratePolyhedron);
        }

        for he_id in 0..half_edges.len() {
            let origin = half_edges[he_id].origin;
            let dest = half_edges[half_edges[he_id].next as usize].origin;
            let twin = edge_map
                .get(&(dest, origin))
                .copied()
                .ok_or(ShapeError::OpenPolyhedron(origin, dest))?;
            half_edges[he_id].twin = twin;
        }

        let local_aabb = Aabb::from_points(&points);
        let tolerance = local_aabb.extents().norm() * 1.0e-4;

        for (fid, face) in out_faces.iter().enumerate() {
            let on_face = points[half_edges[face.first_half_edge as usize].origin as usize];

            for (vid, pt) in points.iter().enumerate() {
                if (pt - on_face).dot(&face.normal) > tolerance {
                    return Err(ShapeError::NonConvexPolyhedron {
                        face: fid as u32,
                        vertex: vid as u32,
                    });
                }
            }
        }

        Ok(Self {
            points,
            faces: out_faces,
            half_edges,
            vertex_half_edges,
            local_aabb,
        })
    }

    /// Builds the polyhedron of a box centered at the origin.
    pub fn cuboid(half_extents: Vector<Real>) -> Self {
        let he = half_extents;
        let points = vec![
            Point::new(-he.x, -he.y, -he.z),
            Point::new(he.x, -he.y, -he.z),
            Point::new(he.x, he.y, -he.z),
            Point::new(-he.x, he.y, -he.z),
            Point::new(-he.x, -he.y, he.z),
            Point::new(he.x, -he.y, he.z),
            Point::new(he.x, he.y, he.z),
            Point::new(-he.x, he.y, he.z),
        ];
        let faces = [
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
            vec![0, 1, 5, 4], // -y
            vec![3, 7, 6, 2], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];

        Self::new(points, &faces).unwrap_or_else(|e| {
            panic!("invalid cuboid half-extents {:?}: {}", half_extents, e)
        })
    }

    /// The vertices of this polyhedron.
    #[inline]
    pub fn points(&self) -> &[Point<Real>] {
        &self.points[..]
    }

    /// The faces of this polyhedron.
    #[inline]
    pub fn faces(&self) -> &[PolyhedronFace] {
        &self.faces[..]
    }

    /// The half-edges of this polyhedron.
    #[inline]
    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges[..]
    }

    /// The local AABB of this polyhedron.
    #[inline]
    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    /// Iterates through the vertex indices of the given face, counter-clockwise.
    pub fn face_vertices(&self, face: u32) -> impl Iterator<Item = u32> + '_ {
        let face = &self.faces[face as usize];
        let mut he = face.first_half_edge;
        (0..face.num_vertices).map(move |_| {
            let curr = self.half_edges[he as usize];
            he = curr.next;
            curr.origin
        })
    }

    /// Iterates through the vertices adjacent to `vertex`.
    pub fn vertex_neighbors(&self, vertex: u32) -> impl Iterator<Item = u32> + '_ {
        let first = self.vertex_half_edges[vertex as usize];
        let mut he = Some(first);

        core::iter::from_fn(move || {
            let curr = self.half_edges[he? as usize];
            let neighbor = self.half_edges[curr.next as usize].origin;
            // The next half-edge starting at `vertex`, turning around it.
            let next = self.half_edges[curr.twin as usize].next;
            he = if next == first { None } else { Some(next) };
            Some(neighbor)
        })
    }

    /// The plane offsets `normal · point_on_face` of every face.
    pub(crate) fn face_plane(&self, face: u32) -> (UnitVector<Real>, Real) {
        let f = &self.faces[face as usize];
        let pt = self.points[self.half_edges[f.first_half_edge as usize].origin as usize];
        (f.normal, f.normal.dot(&pt.coords))
    }

    fn support_vertex_by_hill_climbing(&self, dir: &Vector<Real>) -> u32 {
        let mut best = 0;
        let mut best_dot = self.points[0].coords.dot(dir);

        loop {
            let mut improved = false;

            for neighbor in self.vertex_neighbors(best) {
                let dot = self.points[neighbor as usize].coords.dot(dir);
                if dot > best_dot {
                    best_dot = dot;
                    best = neighbor;
                    improved = true;
                }
            }

            if !improved {
                return best;
            }
        }
    }
}

impl SupportMap for ConvexPolyhedron {
    #[inline]
    fn local_support_point(&self, dir: &Vector<Real>) -> Point<Real> {
        if self.points.len() <= BRUTE_FORCE_SUPPORT_THRESHOLD {
            let mut best = 0;
            let mut best_dot = Real::MIN;

            for (i, pt) in self.points.iter().enumerate() {
                let dot = pt.coords.dot(dir);
                if dot > best_dot {
                    best_dot = dot;
                    best = i;
                }
            }

            self.points[best]
        } else {
            self.points[self.support_vertex_by_hill_climbing(dir) as usize]
        }
    }
}

impl PolygonalFeatureMap for ConvexPolyhedron {
    fn local_support_feature(&self, dir: &Unit<Vector<Real>>, out_feature: &mut PolygonalFeature) {
        let mut best_face = 0;
        let mut best_dot = Real::MIN;

        for (i, face) in self.faces.iter().enumerate() {
            let dot = face.normal.dot(dir);
            if dot > best_dot {
                best_dot = dot;
                best_face = i as u32;
            }
        }

        out_feature.clear();
        out_feature.normal = Some(self.faces[best_face as usize].normal);
        for vid in self.face_vertices(best_face) {
            out_feature.vertices.push(self.points[vid as usize]);
        }
    }
}

use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Point, Real};
use crate::partitioning::AabbTree;
use crate::query::Ray;
use crate::shape::{ConcaveShape, ConvexPart, ShapeError, Triangle};

/// A triangle mesh.
///
/// The triangles are double-sided and the mesh does not need to be closed nor manifold. An AABB
/// tree over the triangles accelerates the part queries.
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Point<Real>>,
    indices: Vec<[u32; 3]>,
    tree: AabbTree<u32>,
    aabb: Aabb,
}

impl TriMesh {
    /// Creates a triangle mesh from its vertex buffer and its index buffer.
    pub fn new(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>) -> Result<Self, ShapeError> {
        if indices.is_empty() {
            return Err(ShapeError::EmptyTriMesh);
        }

        if let Some(index) = indices
            .iter()
            .flatten()
            .find(|i| **i as usize >= vertices.len())
        {
            return Err(ShapeError::IndexOutOfRange {
                index: *index,
                len: vertices.len(),
            });
        }

        let mut tree = AabbTree::new();
        let mut aabb = Aabb::new_invalid();

        for (i, idx) in indices.iter().enumerate() {
            let tri_aabb = Aabb::from_points(idx.iter().map(|k| &vertices[*k as usize]));
            aabb.take_point(tri_aabb.mins);
            aabb.take_point(tri_aabb.maxs);
            let _ = tree.insert(tri_aabb, i as u32);
        }

        Ok(TriMesh {
            vertices,
            indices,
            tree,
            aabb,
        })
    }

    /// The vertex buffer of this mesh.
    pub fn vertices(&self) -> &[Point<Real>] {
        &self.vertices
    }

    /// The index buffer of this mesh.
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// The number of triangles of this mesh.
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Gets the i-th triangle of this mesh.
    pub fn triangle(&self, i: u32) -> Triangle {
        let idx = self.indices[i as usize];
        Triangle::new(
            self.vertices[idx[0] as usize],
            self.vertices[idx[1] as usize],
            self.vertices[idx[2] as usize],
        )
    }
}

impl ConcaveShape for TriMesh {
    fn local_aabb(&self) -> Aabb {
        self.aabb
    }

    fn map_overlapping_parts(
        &self,
        aabb: &Aabb,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        let identity = Isometry::identity();
        self.tree.overlaps_with(aabb, 0.0, |_, i| {
            f(*i, &identity, ConvexPart::Triangle(self.triangle(*i)))
        });
    }

    fn map_intersecting_parts(
        &self,
        ray: &Ray,
        max_toi: Real,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        let identity = Isometry::identity();
        self.tree.intersects_with(ray, max_toi, 0.0, |_, i| {
            f(*i, &identity, ConvexPart::Triangle(self.triangle(*i)))
        });
    }
}

#[cfg(test)]
mod test {
    use super::TriMesh;
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Vector};
    use crate::query::{Ray, RayCast};
    use crate::shape::{ConcaveShape, ShapeError};

    /// A 2x2 grid of unit quads on the `y = 0` plane.
    fn grid() -> TriMesh {
        let mut vertices = vec![];
        for i in 0..3 {
            for j in 0..3 {
                vertices.push(Point::new(j as f32, 0.0, i as f32));
            }
        }

        let mut indices = vec![];
        for i in 0..2u32 {
            for j in 0..2u32 {
                let a = i * 3 + j;
                indices.push([a, a + 3, a + 1]);
                indices.push([a + 1, a + 3, a + 4]);
            }
        }

        TriMesh::new(vertices, indices).unwrap()
    }

    #[test]
    fn trimesh_validation() {
        assert_eq!(
            TriMesh::new(vec![Point::origin()], vec![]).unwrap_err(),
            ShapeError::EmptyTriMesh
        );
        assert_eq!(
            TriMesh::new(vec![Point::origin(); 3], vec![[0, 1, 3]]).unwrap_err(),
            ShapeError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn overlapping_parts_of_trimesh() {
        let mesh = grid();
        assert_eq!(mesh.num_triangles(), 8);

        let aabb = Aabb::new(Point::new(1.2, -0.1, 1.2), Point::new(1.4, 0.1, 1.4));
        let mut ids = vec![];
        mesh.map_overlapping_parts(&aabb, &mut |id, _, _| ids.push(id));
        ids.sort_unstable();
        // Only the two triangles of the last quad reach this box.
        assert_eq!(ids, vec![6, 7]);

        let everything = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(3.0, 1.0, 3.0));
        let mut count = 0;
        mesh.map_overlapping_parts(&everything, &mut |_, _, _| count += 1);
        assert_eq!(count, 8);
    }

    #[test]
    fn ray_cast_on_trimesh() {
        let mesh = grid();
        let ray = Ray::new(Point::new(1.6, 2.0, 0.3), -Vector::y());
        let hit = mesh.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 2.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, Vector::y(), epsilon = 1.0e-5);

        let miss = Ray::new(Point::new(2.5, 2.0, 0.3), -Vector::y());
        assert!(mesh.cast_local_ray(&miss, 10.0, true).is_none());
    }
}

//!
//! Shape composed from the union of primitives.
//!

use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Isometry, Real};
use crate::partitioning::AabbTree;
use crate::query::Ray;
use crate::shape::{ConcaveShape, ConvexPart, MassProperties, Shape, ShapeError};
use either::Either;

/// A compound shape with an aabb bounding volume.
///
/// A compound shape is a shape composed of the union of several simpler shapes. This is the
/// main way of creating a concave shape from convex parts. Each part has its own position
/// relative to the compound.
///
/// The part ids reported by the [`ConcaveShape`] methods are the indices of the children.
/// Heightfields and triangle meshes may be children; compounds may not.
///
/// # Example
///
/// ```
/// use impulse3d::shape::{Ball, Compound, ConvexPolyhedron, Shape};
/// use nalgebra::{Isometry3, Vector3};
///
/// // A dumbbell.
/// let shapes = vec![
///     (Isometry3::translation(-2.0, 0.0, 0.0), Shape::Ball(Ball::new(0.5))),
///     (Isometry3::identity(), ConvexPolyhedron::cuboid(Vector3::new(2.0, 0.2, 0.2)).into()),
///     (Isometry3::translation(2.0, 0.0, 0.0), Shape::Ball(Ball::new(0.5))),
/// ];
///
/// let compound = Compound::new(shapes).unwrap();
/// assert_eq!(compound.shapes().len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct Compound {
    shapes: Vec<(Isometry<Real>, Shape)>,
    tree: AabbTree<u32>,
    aabbs: Vec<Aabb>,
    aabb: Aabb,
}

impl Compound {
    /// Builds a new compound shape from a collection of sub-shapes.
    pub fn new(shapes: Vec<(Isometry<Real>, Shape)>) -> Result<Compound, ShapeError> {
        if shapes.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }

        if shapes.iter().any(|(_, s)| matches!(s, Shape::Compound(_))) {
            return Err(ShapeError::NestedCompound);
        }

        let mut tree = AabbTree::new();
        let mut aabbs = Vec::with_capacity(shapes.len());
        let mut aabb = Aabb::new_invalid();

        for (i, (delta, shape)) in shapes.iter().enumerate() {
            let bv = shape.compute_aabb(delta);
            aabb.merge(&bv);
            aabbs.push(bv);
            let _ = tree.insert(bv, i as u32);
        }

        Ok(Compound {
            shapes,
            tree,
            aabbs,
            aabb,
        })
    }

    /// The shapes of this compound shape.
    #[inline]
    pub fn shapes(&self) -> &[(Isometry<Real>, Shape)] {
        &self.shapes[..]
    }

    /// The AABBs of the shapes of this compound shape, in the local-space of the compound.
    #[inline]
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs[..]
    }

    /// The mass properties of this compound, summing those of its children.
    pub fn mass_properties(&self, density: Real) -> MassProperties {
        self.shapes
            .iter()
            .map(|(pos, shape)| shape.mass_properties(density).transform_by(pos))
            .sum()
    }
}

impl ConcaveShape for Compound {
    fn local_aabb(&self) -> Aabb {
        self.aabb
    }

    fn map_overlapping_parts(
        &self,
        aabb: &Aabb,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        self.tree.overlaps_with(aabb, 0.0, |_, i| {
            let (pos, shape) = &self.shapes[*i as usize];

            match shape.classify() {
                Either::Left(part) => f(*i, pos, part),
                Either::Right(concave) => {
                    let local_aabb = aabb.transform_by(&pos.inverse());
                    concave.map_overlapping_parts(&local_aabb, &mut |_, sub_pos, part| {
                        f(*i, &(pos * sub_pos), part)
                    });
                }
            }
        });
    }

    fn map_intersecting_parts(
        &self,
        ray: &Ray,
        max_toi: Real,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        self.tree.intersects_with(ray, max_toi, 0.0, |_, i| {
            let (pos, shape) = &self.shapes[*i as usize];

            match shape.classify() {
                Either::Left(part) => f(*i, pos, part),
                Either::Right(concave) => {
                    let local_ray = ray.inverse_transform_by(pos);
                    concave.map_intersecting_parts(&local_ray, max_toi, &mut |_, sub_pos, part| {
                        f(*i, &(pos * sub_pos), part)
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::Compound;
    use crate::bounding_volume::Aabb;
    use crate::math::{Isometry, Point, Vector};
    use crate::query::{Ray, RayCast};
    use crate::shape::{Ball, ConcaveShape, ConvexPolyhedron, MassProperties, Shape, ShapeError};

    fn dumbbell() -> Compound {
        Compound::new(vec![
            (Isometry::translation(-2.0, 0.0, 0.0), Ball::new(0.5).into()),
            (
                Isometry::identity(),
                ConvexPolyhedron::cuboid(Vector::new(2.0, 0.2, 0.2)).into(),
            ),
            (Isometry::translation(2.0, 0.0, 0.0), Ball::new(0.5).into()),
        ])
        .unwrap()
    }

    #[test]
    fn compound_validation() {
        assert_eq!(Compound::new(vec![]).unwrap_err(), ShapeError::EmptyCompound);
        let nested = Shape::Compound(dumbbell());
        assert_eq!(
            Compound::new(vec![(Isometry::identity(), nested)]).unwrap_err(),
            ShapeError::NestedCompound
        );
    }

    #[test]
    fn overlapping_children() {
        let compound = dumbbell();
        let aabb = Aabb::new(Point::new(2.2, -0.1, -0.1), Point::new(2.3, 0.1, 0.1));
        let mut ids = vec![];
        compound.map_overlapping_parts(&aabb, &mut |id, pos, part| {
            assert!(part.as_ball().is_some());
            assert_eq!(pos.translation.vector, Vector::new(2.0, 0.0, 0.0));
            ids.push(id);
        });
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn ray_cast_on_compound() {
        let compound = dumbbell();
        let ray = Ray::new(Point::new(-10.0, 0.0, 0.0), Vector::x());
        let hit = compound.cast_local_ray_and_get_normal(&ray, 100.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 7.5, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, -Vector::x(), epsilon = 1.0e-5);
    }

    #[test]
    fn compound_mass_properties() {
        let ball = Ball::new(0.5);
        let compound = Compound::new(vec![
            (Isometry::translation(0.0, 1.0, 0.0), ball.into()),
            (Isometry::translation(0.0, -1.0, 0.0), ball.into()),
        ])
        .unwrap();

        let single = MassProperties::from_ball(1.0, &ball);
        let mp = compound.mass_properties(1.0);
        assert_relative_eq!(mp.mass, 2.0 * single.mass, epsilon = 1.0e-5);
        assert_relative_eq!(mp.local_com, Point::origin(), epsilon = 1.0e-5);
        assert_relative_eq!(
            mp.local_inertia[(0, 0)],
            2.0 * (single.local_inertia[(0, 0)] + single.mass),
            epsilon = 1.0e-4
        );
    }
}

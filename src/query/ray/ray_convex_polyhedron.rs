use crate::math::{Real, UnitVector, Vector};
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::{ConvexPolyhedron, TriangularPrism};

/// Casts a ray on the convex set bounded by the given planes.
///
/// Each plane is given by its outward normal `n` and its offset `d`: the inside of the set is
/// the intersection of the half-spaces `n · x <= d`.
pub fn local_ray_intersection_with_planes(
    planes: impl IntoIterator<Item = (UnitVector<Real>, Real)>,
    ray: &Ray,
    max_toi: Real,
    solid: bool,
) -> Option<RayIntersection> {
    let mut tmin = -Real::MAX;
    let mut tmax = Real::MAX;
    let mut enter_normal = Vector::zeros();
    let mut exit_normal = Vector::zeros();

    for (normal, offset) in planes {
        let denom = normal.dot(&ray.dir);
        let dist = normal.dot(&ray.origin.coords) - offset;

        if denom == 0.0 {
            if dist > 0.0 {
                // Parallel to the plane and outside of it.
                return None;
            }
            continue;
        }

        let t = -dist / denom;

        if denom < 0.0 {
            if t > tmin {
                tmin = t;
                enter_normal = *normal;
            }
        } else if t < tmax {
            tmax = t;
            exit_normal = *normal;
        }

        if tmin > tmax {
            return None;
        }
    }

    if tmax < 0.0 {
        return None;
    }

    if tmin >= 0.0 {
        (tmin <= max_toi).then(|| RayIntersection::new(tmin, enter_normal))
    } else if solid {
        Some(RayIntersection::new(0.0, Vector::zeros()))
    } else {
        (tmax <= max_toi).then(|| RayIntersection::new(tmax, -exit_normal))
    }
}

impl RayCast for ConvexPolyhedron {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        let planes = (0..self.faces().len() as u32).map(|i| self.face_plane(i));
        local_ray_intersection_with_planes(planes, ray, max_toi, solid)
    }
}

impl RayCast for TriangularPrism {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        let planes = self
            .faces()
            .into_iter()
            .map(|(pts, n)| (n, n.dot(&pts[0].coords)));
        local_ray_intersection_with_planes(planes, ray, max_toi, solid)
    }
}

#[cfg(test)]
mod test {
    use crate::math::{Point, Vector};
    use crate::query::{Ray, RayCast};
    use crate::shape::{ConvexPolyhedron, Triangle, TriangularPrism};

    #[test]
    fn ray_cast_on_cuboid() {
        let cuboid = ConvexPolyhedron::cuboid(Vector::new(1.0, 2.0, 3.0));

        let ray = Ray::new(Point::new(5.0, 0.5, 0.5), -Vector::x());
        let hit = cuboid.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 4.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, Vector::x(), epsilon = 1.0e-5);

        assert!(cuboid.cast_local_ray(&ray, 3.0, true).is_none());
        assert!(cuboid
            .cast_local_ray(&Ray::new(Point::new(5.0, 3.0, 0.0), -Vector::x()), 10.0, true)
            .is_none());
    }

    #[test]
    fn ray_cast_from_inside_cuboid() {
        let cuboid = ConvexPolyhedron::cuboid(Vector::repeat(1.0));
        let ray = Ray::new(Point::origin(), Vector::z());

        assert_eq!(cuboid.cast_local_ray(&ray, 10.0, true), Some(0.0));
        let hit = cuboid.cast_local_ray_and_get_normal(&ray, 10.0, false).unwrap();
        assert_relative_eq!(hit.time_of_impact, 1.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, -Vector::z(), epsilon = 1.0e-5);
    }

    #[test]
    fn ray_cast_on_prism() {
        let top = Triangle::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
        );
        let prism = TriangularPrism::new(top, Vector::new(0.0, -1.0, 0.0));

        let ray = Ray::new(Point::new(0.2, 3.0, 0.2), -Vector::y());
        let hit = prism.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 3.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, Vector::y(), epsilon = 1.0e-5);

        let ray = Ray::new(Point::new(-3.0, -0.5, 0.2), Vector::x());
        let hit = prism.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 3.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, -Vector::x(), epsilon = 1.0e-5);
    }
}

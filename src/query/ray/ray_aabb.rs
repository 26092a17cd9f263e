use core::mem;

use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector, DIM};
use crate::query::{Ray, RayCast, RayIntersection};
use num::Zero;

impl Aabb {
    /// Computes the parameters `[tmin, tmax]` of the part of `ray` inside of this AABB, with
    /// `tmin` clamped to zero and `tmax` to `max_toi`.
    ///
    /// Also returns the (signed, one-based) axis of the face the ray enters through, or zero if
    /// the origin of the ray is inside.
    pub fn clip_ray_parameters(&self, ray: &Ray, max_toi: Real) -> Option<(Real, Real, isize)> {
        let mut tmin: Real = 0.0;
        let mut tmax: Real = max_toi;
        let mut near_side = 0;

        for i in 0usize..DIM {
            if ray.dir[i].is_zero() {
                if ray.origin[i] < self.mins[i] || ray.origin[i] > self.maxs[i] {
                    return None;
                }
            } else {
                let denom = 1.0 / ray.dir[i];
                let mut near = (self.mins[i] - ray.origin[i]) * denom;
                let mut far = (self.maxs[i] - ray.origin[i]) * denom;
                let mut side = -(i as isize + 1);

                if near > far {
                    mem::swap(&mut near, &mut far);
                    side = -side;
                }

                if near > tmin {
                    tmin = near;
                    near_side = side;
                }

                tmax = tmax.min(far);

                if tmin > tmax {
                    // This covers the case where tmax is negative because tmin is
                    // initialized at zero.
                    return None;
                }
            }
        }

        Some((tmin, tmax, near_side))
    }
}

impl RayCast for Aabb {
    fn cast_local_ray(&self, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        let (tmin, tmax, _) = self.clip_ray_parameters(ray, max_toi)?;

        if tmin.is_zero() && !solid {
            Some(tmax)
        } else {
            Some(tmin)
        }
    }

    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        let (tmin, tmax, side) = self.clip_ray_parameters(ray, max_toi)?;

        if side == 0 {
            // The origin is inside of the box.
            if solid {
                return Some(RayIntersection::new(0.0, Vector::zeros()));
            }

            let exit = ray.point_at(tmax);
            let mut normal = Vector::zeros();
            let mut best = Real::MAX;

            for i in 0..DIM {
                let to_min = (exit[i] - self.mins[i]).abs();
                let to_max = (self.maxs[i] - exit[i]).abs();

                if to_min < best {
                    best = to_min;
                    normal = -Vector::ith(i, 1.0);
                }
                if to_max < best {
                    best = to_max;
                    normal = Vector::ith(i, 1.0);
                }
            }

            Some(RayIntersection::new(tmax, normal))
        } else {
            let axis = side.unsigned_abs() - 1;
            let sign = if side < 0 { -1.0 } else { 1.0 };
            Some(RayIntersection::new(tmin, Vector::ith(axis, sign)))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Vector};
    use crate::query::{Ray, RayCast};

    #[test]
    fn ray_hits_near_face_with_outward_normal() {
        let aabb = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::x());
        let hit = aabb.cast_local_ray_and_get_normal(&ray, 100.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 4.0);
        assert_eq!(hit.normal, -Vector::x());

        let ray = Ray::new(Point::new(0.0, 5.0, 0.0), -Vector::y());
        let hit = aabb.cast_local_ray_and_get_normal(&ray, 100.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 4.0);
        assert_eq!(hit.normal, Vector::y());
    }

    #[test]
    fn ray_from_inside() {
        let aabb = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point::origin(), Vector::z());
        assert_eq!(aabb.cast_local_ray(&ray, 10.0, true), Some(0.0));
        assert_eq!(aabb.cast_local_ray(&ray, 10.0, false), Some(1.0));
        assert!(aabb.cast_local_ray(&ray.translate_by(Vector::new(3.0, 0.0, 0.0)), 10.0, true).is_none());
    }
}

use crate::math::{Point, Real, Vector};
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::Ball;

impl RayCast for Ball {
    #[inline]
    fn cast_local_ray(&self, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        ray_toi_with_ball(&Point::origin(), self.radius, ray, solid)
            .map(|(toi, _)| toi)
            .filter(|toi| *toi <= max_toi)
    }

    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        let (toi, inside) = ray_toi_with_ball(&Point::origin(), self.radius, ray, solid)?;
        if toi > max_toi {
            return None;
        }

        if toi == 0.0 {
            return Some(RayIntersection::new(0.0, Vector::zeros()));
        }

        let normal = ray.point_at(toi).coords.normalize();
        Some(RayIntersection::new(toi, if inside { -normal } else { normal }))
    }
}

/// The time of impact of a ray with a ball, and whether the ray starts inside the ball.
///
/// Solves `|origin + t·dir - center|² = radius²` for the smallest relevant `t`.
pub fn ray_toi_with_ball(
    center: &Point<Real>,
    radius: Real,
    ray: &Ray,
    solid: bool,
) -> Option<(Real, bool)> {
    let oc = ray.origin - center;
    let a = ray.dir.norm_squared();
    let half_b = oc.dot(&ray.dir);
    let c = oc.norm_squared() - radius * radius;

    if c > 0.0 && (half_b > 0.0 || a == 0.0) {
        // Outside and moving away, or not moving at all.
        return None;
    }

    if a == 0.0 {
        return Some((0.0, true));
    }

    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t_in = (-half_b - sqrt_d) / a;
    if t_in > 0.0 {
        Some((t_in, false))
    } else if solid {
        Some((0.0, true))
    } else {
        Some(((-half_b + sqrt_d) / a, true))
    }
}

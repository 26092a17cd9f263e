use crate::math::Real;
use crate::query::{Ray, RayCast, RayIntersection};
use crate::shape::{Compound, ConcaveShape, HeightField, TriMesh};

/// Casts a ray on every part of a concave shape and keeps the earliest hit.
pub fn local_ray_intersection_with_concave_shape(
    shape: &dyn ConcaveShape,
    ray: &Ray,
    max_toi: Real,
    solid: bool,
) -> Option<RayIntersection> {
    let mut best: Option<RayIntersection> = None;
    let mut best_toi = max_toi;

    shape.map_intersecting_parts(ray, max_toi, &mut |_, pos, part| {
        if let Some(hit) = part.cast_ray_and_get_normal(pos, ray, best_toi, solid) {
            if best.is_none() || hit.time_of_impact < best_toi {
                best_toi = hit.time_of_impact;
                best = Some(hit);
            }
        }
    });

    best
}

impl RayCast for HeightField {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        local_ray_intersection_with_concave_shape(self, ray, max_toi, solid)
    }
}

impl RayCast for TriMesh {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        local_ray_intersection_with_concave_shape(self, ray, max_toi, solid)
    }
}

impl RayCast for Compound {
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        local_ray_intersection_with_concave_shape(self, ray, max_toi, solid)
    }
}

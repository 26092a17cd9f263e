use crate::math::{Isometry, Point, Real, Vector};

/// A half-line starting at `origin` and going along `dir`.
///
/// `dir` is not required to be normalized: times of impact are multiples of `dir`, so
/// `origin + dir * toi` is always the hit point.
///
/// # Example
///
/// ```rust
/// use impulse3d::math::{Isometry, Point, Vector};
/// use impulse3d::query::{Ray, RayCast};
/// use impulse3d::shape::Ball;
///
/// let ray = Ray::new(Point::origin(), Vector::x());
/// let ball = Ball::new(1.0);
///
/// let toi = ball.cast_ray(&Isometry::translation(5.0, 0.0, 0.0), &ray, 100.0, true);
/// assert_eq!(toi, Some(4.0));
/// assert_eq!(ray.point_at(4.0), Point::new(4.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Where the ray starts.
    pub origin: Point<Real>,
    /// The direction of the ray.
    pub dir: Vector<Real>,
}

impl Ray {
    /// A ray starting at `origin` along `dir`.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Self {
        Self { origin, dir }
    }

    /// This ray expressed in the local-space of a frame placed at `pos`.
    #[inline]
    pub fn inverse_transform_by(&self, pos: &Isometry<Real>) -> Self {
        Self::new(
            pos.inverse_transform_point(&self.origin),
            pos.inverse_transform_vector(&self.dir),
        )
    }

    /// This ray with its origin moved by `shift`.
    #[inline]
    pub fn translate_by(&self, shift: Vector<Real>) -> Self {
        Self::new(self.origin + shift, self.dir)
    }

    /// The point `origin + dir * t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }
}

/// A ray hit.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RayIntersection {
    /// The hit point is `ray.point_at(time_of_impact)`.
    pub time_of_impact: Real,
    /// The surface normal at the hit point.
    ///
    /// Points inward when a non-solid cast starts inside the shape. Zero when the ray starts
    /// inside a solid shape.
    pub normal: Vector<Real>,
}

impl RayIntersection {
    /// A hit at `time_of_impact` with the given normal.
    #[inline]
    pub fn new(time_of_impact: Real, normal: Vector<Real>) -> Self {
        Self {
            time_of_impact,
            normal,
        }
    }

    /// This hit with its normal rotated from the local-space of a frame placed at `pos`.
    #[inline]
    pub fn transform_by(&self, pos: &Isometry<Real>) -> Self {
        Self::new(self.time_of_impact, pos * self.normal)
    }
}

/// Shapes that can be hit by rays.
///
/// With `solid` set, a ray starting inside the shape hits it at time zero. Otherwise it hits
/// the boundary on its way out.
pub trait RayCast {
    /// The first hit of a local-space ray, ignoring hits after `max_toi`.
    fn cast_local_ray_and_get_normal(
        &self,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection>;

    /// The time of impact of a local-space ray.
    fn cast_local_ray(&self, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        self.cast_local_ray_and_get_normal(ray, max_toi, solid)
            .map(|hit| hit.time_of_impact)
    }

    /// Does a local-space ray hit the solid shape before `max_toi`?
    #[inline]
    fn intersects_local_ray(&self, ray: &Ray, max_toi: Real) -> bool {
        self.cast_local_ray(ray, max_toi, true).is_some()
    }

    /// The time of impact of a world-space ray with this shape placed at `pos`.
    fn cast_ray(&self, pos: &Isometry<Real>, ray: &Ray, max_toi: Real, solid: bool) -> Option<Real> {
        self.cast_local_ray(&ray.inverse_transform_by(pos), max_toi, solid)
    }

    /// The first hit of a world-space ray with this shape placed at `pos`. The normal is in
    /// world-space.
    fn cast_ray_and_get_normal(
        &self,
        pos: &Isometry<Real>,
        ray: &Ray,
        max_toi: Real,
        solid: bool,
    ) -> Option<RayIntersection> {
        self.cast_local_ray_and_get_normal(&ray.inverse_transform_by(pos), max_toi, solid)
            .map(|hit| hit.transform_by(pos))
    }
}

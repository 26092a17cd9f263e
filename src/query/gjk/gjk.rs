//! The Gilbert-Johnson-Keerthi distance algorithm.
//!
//! GJK operates on the Minkowski difference (the CSO) of two convex shapes given only by their
//! support maps. It iteratively builds a simplex inside of the CSO approaching the point closest
//! to the origin. If the origin ends up inside of the CSO, the shapes intersect and the EPA must
//! be used to recover a penetration depth.

use na::{self, ComplexField, Unit};

use crate::math::{Isometry, Point, Real, Vector, DIM};
use crate::query::gjk::{CSOPoint, VoronoiSimplex};
use crate::shape::SupportMap;

use num::Bounded;

/// Results of the GJK algorithm.
///
/// All points and vectors are expressed in the local-space of the first shape.
#[derive(Clone, Debug, PartialEq)]
pub enum GJKResult {
    /// The shapes are intersecting: the origin is inside of the CSO.
    Intersection,
    /// The closest points on each shape (in this order), and the unit direction from the
    /// first shape to the second.
    ClosestPoints(Point<Real>, Point<Real>, Unit<Vector<Real>>),
    /// The shapes are farther than the requested maximum distance, with a separating axis.
    NoIntersection(Unit<Vector<Real>>),
}

/// Convergence parameters of the GJK algorithm.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GjkOptions {
    /// The maximum number of support point evaluations before giving up.
    pub max_iterations: usize,
    /// The algorithm stops once the lower and upper bounds of the distance are closer than
    /// this value.
    pub min_f_difference: Real,
}

impl Default for GjkOptions {
    fn default() -> Self {
        GjkOptions {
            max_iterations: 64,
            min_f_difference: 1.0e-4,
        }
    }
}

/// The absolute tolerance used by the GJK algorithm.
pub fn eps_tol() -> Real {
    let _eps = crate::math::DEFAULT_EPSILON;
    _eps * 10.0
}

/// Computes the closest points between two convex shapes.
///
/// The `simplex` must have been initialized with at least one point of the CSO, e.g., with
/// `simplex.reset(CSOPoint::from_shapes(pos12, g1, g2, &dir))`. `pos12` is the position of
/// `g2` relative to `g1`.
///
/// Separation is only reported once a support plane strictly separates the origin from the
/// CSO. When the iterations stall before that, because of rounding errors on nearly flat
/// simplices, the shapes are reported as intersecting and `simplex` holds the last simplex,
/// which lies within the rounding error of the origin.
///
/// Returns `GJKResult::NoIntersection` if the shapes are farther than `max_dist`, or if the
/// algorithm did not converge within `options.max_iterations`.
pub fn closest_points<G1, G2>(
    pos12: &Isometry<Real>,
    g1: &G1,
    g2: &G2,
    max_dist: Real,
    options: &GjkOptions,
    simplex: &mut VoronoiSimplex,
) -> GJKResult
where
    G1: ?Sized + SupportMap,
    G2: ?Sized + SupportMap,
{
    let _eps_tol: Real = eps_tol();
    let _eps_rel: Real = ComplexField::sqrt(_eps_tol);

    let mut proj = simplex.project_origin_and_reduce();

    let mut old_dir;

    if let Some(proj_dir) = Unit::try_new(proj.coords, 0.0) {
        old_dir = -proj_dir;
    } else {
        return GJKResult::Intersection;
    }

    // The distance lies in [lower_bound, max_bound]. A positive lower bound certifies that
    // the shapes are disjoint.
    let mut lower_bound = -Real::max_value();
    let mut max_bound = Real::max_value();
    let mut dir;
    let mut niter = 0;

    loop {
        let old_max_bound = max_bound;
        // Rounding errors on the simplex grow with the size of its vertices.
        let touch_tol = _eps_tol * simplex.max_sq_len().sqrt().max(1.0);

        if let Some((new_dir, dist)) = Unit::try_new_and_get(-proj.coords, touch_tol) {
            dir = new_dir;
            max_bound = dist;
        } else {
            // The origin is on the simplex.
            return GJKResult::Intersection;
        }

        if max_bound >= old_max_bound {
            // Upper bound inconsistencies: keep the previous simplex.
            return stalled(simplex, true, old_dir, lower_bound);
        }

        let cso_point = CSOPoint::from_shapes(pos12, g1, g2, &dir);
        let min_bound = -dir.dot(&cso_point.point.coords);

        if !min_bound.is_finite() {
            log::debug!("Non-finite support point found by GJK: {:?}.", cso_point);
            return GJKResult::NoIntersection(dir);
        }

        lower_bound = lower_bound.max(min_bound);

        if min_bound > max_dist {
            return GJKResult::NoIntersection(dir);
        } else if max_bound - lower_bound <= (_eps_rel * max_bound).max(options.min_f_difference) {
            // The distance found has a good enough precision.
            return stalled(simplex, false, dir, lower_bound);
        }

        if !simplex.add_point(cso_point) {
            return stalled(simplex, false, dir, lower_bound);
        }

        old_dir = dir;
        proj = simplex.project_origin_and_reduce();

        if simplex.dimension() == DIM {
            // The origin is inside of the tetrahedron, unless rounding errors disagree with
            // a separating plane found earlier.
            return stalled(simplex, true, old_dir, lower_bound);
        }

        niter += 1;

        if niter >= options.max_iterations {
            log::debug!(
                "GJK did not converge after {} iterations (distance bounds: [{}, {}]).",
                niter,
                lower_bound,
                max_bound
            );
            return GJKResult::NoIntersection(dir);
        }
    }
}

/// The result of an iteration that cannot improve the simplex anymore.
fn stalled(
    simplex: &VoronoiSimplex,
    prev: bool,
    dir: Unit<Vector<Real>>,
    lower_bound: Real,
) -> GJKResult {
    if lower_bound >= eps_tol() {
        let (p1, p2) = result(simplex, prev);
        GJKResult::ClosestPoints(p1, p2, dir)
    } else {
        GJKResult::Intersection
    }
}

/// Computes the closest points between two shapes, initializing the simplex along the
/// direction between their origins.
pub fn closest_points_with_init<G1, G2>(
    pos12: &Isometry<Real>,
    g1: &G1,
    g2: &G2,
    max_dist: Real,
    options: &GjkOptions,
    simplex: &mut VoronoiSimplex,
) -> GJKResult
where
    G1: ?Sized + SupportMap,
    G2: ?Sized + SupportMap,
{
    let dir = Unit::try_new(pos12.translation.vector, crate::math::DEFAULT_EPSILON)
        .unwrap_or_else(Vector::x_axis);
    simplex.reset(CSOPoint::from_shapes_toward(pos12, g1, g2, &dir));
    closest_points(pos12, g1, g2, max_dist, options, simplex)
}

fn result(simplex: &VoronoiSimplex, prev: bool) -> (Point<Real>, Point<Real>) {
    let mut res = (Point::origin(), Point::origin());

    if prev {
        for i in 0..simplex.prev_dimension() + 1 {
            let coord = simplex.prev_proj_coord(i);
            let point = simplex.prev_point(i);
            res.0 += point.orig1.coords * coord;
            res.1 += point.orig2.coords * coord;
        }
    } else {
        for i in 0..simplex.dimension() + 1 {
            let coord = simplex.proj_coord(i);
            let point = simplex.point(i);
            res.0 += point.orig1.coords * coord;
            res.1 += point.orig2.coords * coord;
        }
    }

    res
}

#[cfg(test)]
mod test {
    use super::{closest_points_with_init, GJKResult, GjkOptions};
    use crate::math::{Isometry, Vector};
    use crate::query::gjk::VoronoiSimplex;
    use crate::shape::{Ball, ConvexPolyhedron};

    #[test]
    fn separated_cuboids() {
        let cuboid = ConvexPolyhedron::cuboid(Vector::repeat(1.0));
        let pos12 = Isometry::translation(3.0, 0.5, 0.0);
        let mut simplex = VoronoiSimplex::new();

        match closest_points_with_init(
            &pos12,
            &cuboid,
            &cuboid,
            10.0,
            &GjkOptions::default(),
            &mut simplex,
        ) {
            GJKResult::ClosestPoints(p1, p2, n) => {
                assert_relative_eq!(p1.x, 1.0, epsilon = 1.0e-4);
                assert_relative_eq!(p2.x, 2.0, epsilon = 1.0e-4);
                assert_relative_eq!(*n, Vector::x(), epsilon = 1.0e-2);
            }
            res => panic!("Unexpected GJK result: {:?}", res),
        }
    }

    #[test]
    fn intersecting_balls() {
        let ball = Ball::new(1.0);
        let pos12 = Isometry::translation(1.5, 0.0, 0.0);
        let mut simplex = VoronoiSimplex::new();

        assert_eq!(
            closest_points_with_init(
                &pos12,
                &ball,
                &ball,
                10.0,
                &GjkOptions::default(),
                &mut simplex
            ),
            GJKResult::Intersection
        );
    }

    #[test]
    fn too_far_balls() {
        let ball = Ball::new(1.0);
        let pos12 = Isometry::translation(0.0, 10.0, 0.0);
        let mut simplex = VoronoiSimplex::new();

        assert!(matches!(
            closest_points_with_init(
                &pos12,
                &ball,
                &ball,
                1.0,
                &GjkOptions::default(),
                &mut simplex
            ),
            GJKResult::NoIntersection(_)
        ));
    }

    #[test]
    fn slightly_tilted_sunk_cuboid_intersects_ground() {
        let ground = ConvexPolyhedron::cuboid(Vector::new(10.0, 0.5, 10.0));
        let cuboid = ConvexPolyhedron::cuboid(Vector::repeat(0.5));
        let pos1 = Isometry::translation(0.0, -0.5, 0.0);
        let pos2 = Isometry::new(
            Vector::new(2.0e-4, 0.31, -2.0e-4),
            Vector::new(2.0e-5, -1.0e-5, 2.0e-5),
        );
        let pos12 = pos1.inv_mul(&pos2);
        let mut simplex = VoronoiSimplex::new();

        assert_eq!(
            closest_points_with_init(
                &pos12,
                &ground,
                &cuboid,
                0.0,
                &GjkOptions::default(),
                &mut simplex
            ),
            GJKResult::Intersection
        );
    }
}

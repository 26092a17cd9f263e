//! Contact generation between convex parts.

use crate::math::{Isometry, Point, Real, UnitVector, Vector};
use crate::query::clip::clip_halfspace_polygon;
use crate::query::epa::EPA;
use crate::query::gjk::{self, ConstantPoint, GJKResult, GjkOptions, VoronoiSimplex};
use crate::shape::{Ball, ConvexPart, PolygonalFeature, PolygonalFeatureMap, SupportMap};
use crate::utils;

/// Geometric description of a contact between two shapes.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Contact {
    /// The contact point on the first shape.
    pub point1: Point<Real>,
    /// The contact point on the second shape.
    pub point2: Point<Real>,
    /// The contact normal, pointing from the first shape toward the second.
    pub normal: UnitVector<Real>,
    /// The penetration depth, `(point1 - point2) · normal`.
    pub depth: Real,
}

impl Contact {
    /// Creates a new contact.
    #[inline]
    pub fn new(point1: Point<Real>, point2: Point<Real>, normal: UnitVector<Real>, depth: Real) -> Self {
        Contact {
            point1,
            point2,
            normal,
            depth,
        }
    }

    /// Swaps the roles of the two shapes of this contact.
    #[inline]
    #[must_use]
    pub fn flipped(self) -> Self {
        Contact::new(self.point2, self.point1, -self.normal, self.depth)
    }

    /// Transforms the points and the normal of this contact by `pos`.
    #[inline]
    #[must_use]
    pub fn transform_by(self, pos: &Isometry<Real>) -> Self {
        Contact::new(pos * self.point1, pos * self.point2, pos * self.normal, self.depth)
    }

    /// The middle of the two contact points.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.point1, &self.point2)
    }
}

/// Parameters of the contact generation between convex parts.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ContactOptions {
    /// Convergence parameters of GJK, also bounding the number of EPA expansions.
    pub gjk: GjkOptions,
    /// The EPA stops once the penetration depth is known within this precision.
    pub contact_precision: Real,
}

impl Default for ContactOptions {
    fn default() -> Self {
        ContactOptions {
            gjk: GjkOptions::default(),
            contact_precision: 1.0e-4,
        }
    }
}

/// Computes the contact between two balls, in the local-space of the first ball.
///
/// `pos12` is the position of the second ball relative to the first one.
pub fn contact_ball_ball(pos12: &Isometry<Real>, b1: &Ball, b2: &Ball) -> Option<Contact> {
    let center2 = Point::from(pos12.translation.vector);
    let dist = center2.coords.norm();
    let depth = b1.radius + b2.radius - dist;

    if depth < 0.0 {
        return None;
    }

    let normal = if dist > crate::math::DEFAULT_EPSILON {
        UnitVector::new_unchecked(center2.coords / dist)
    } else {
        // Concentric balls.
        Vector::y_axis()
    };

    Some(Contact::new(
        Point::from(*normal * b1.radius),
        center2 - *normal * b2.radius,
        normal,
        depth,
    ))
}

/// Computes the contact between a convex shape and a ball, in the local-space of the shape.
///
/// The ball is handled as its center dilated by its radius: GJK gives the distance from the
/// center to the shape, or EPA the penetration of the center if it lies inside.
pub fn contact_support_map_ball<G>(
    pos12: &Isometry<Real>,
    g1: &G,
    ball2: &Ball,
    options: &ContactOptions,
) -> Option<Contact>
where
    G: ?Sized + SupportMap,
{
    let center2 = Point::from(pos12.translation.vector);
    let core2 = ConstantPoint(Point::origin());
    let mut simplex = VoronoiSimplex::new();

    match gjk::closest_points_with_init(
        pos12,
        g1,
        &core2,
        ball2.radius,
        &options.gjk,
        &mut simplex,
    ) {
        GJKResult::ClosestPoints(p1, _, normal) => {
            let dist = (center2 - p1).dot(&normal);

            if dist > ball2.radius {
                return None;
            }

            Some(Contact::new(
                p1,
                center2 - *normal * ball2.radius,
                normal,
                ball2.radius - dist,
            ))
        }
        GJKResult::Intersection => {
            let (p1, p2, normal) = EPA::new().closest_points(
                pos12,
                g1,
                &core2,
                &simplex,
                options.contact_precision,
                options.gjk.max_iterations,
            )?;
            let core_depth = (p1 - p2).dot(&normal);

            Some(Contact::new(
                p1,
                p2 - *normal * ball2.radius,
                normal,
                core_depth + ball2.radius,
            ))
        }
        GJKResult::NoIntersection(_) => None,
    }
}

/// Computes the contacts between two convex parts, in world-space.
///
/// Ball pairs are handled analytically and balls against other shapes with their center.
/// Polyhedral pairs run GJK then EPA; when the EPA normal is nearly orthogonal to a face of
/// either shape, that face is used as a reference face against which the support feature of the
/// other shape is clipped, yielding up to eight points. Otherwise, the single EPA point is used.
///
/// New contacts are appended to `out`. Returns `true` if the parts are intersecting.
pub fn contacts_convex_convex(
    pos1: &Isometry<Real>,
    g1: &ConvexPart,
    pos2: &Isometry<Real>,
    g2: &ConvexPart,
    options: &ContactOptions,
    out: &mut Vec<Contact>,
) -> bool {
    let pos12 = pos1.inv_mul(pos2);
    let first_new = out.len();

    match (g1.as_ball(), g2.as_ball()) {
        (Some(b1), Some(b2)) => out.extend(contact_ball_ball(&pos12, b1, b2)),
        (None, Some(b2)) => out.extend(contact_support_map_ball(&pos12, g1, b2, options)),
        (Some(b1), None) => out.extend(
            contact_support_map_ball(&pos12.inverse(), g2, b1, options)
                .map(|c| c.transform_by(&pos12).flipped()),
        ),
        (None, None) => polyhedral_contacts(&pos12, g1, g2, options, out),
    }

    for contact in &mut out[first_new..] {
        *contact = contact.transform_by(pos1);
    }

    out.len() > first_new
}

fn polyhedral_contacts<G1, G2>(
    pos12: &Isometry<Real>,
    g1: &G1,
    g2: &G2,
    options: &ContactOptions,
    out: &mut Vec<Contact>,
) where
    G1: ?Sized + SupportMap + PolygonalFeatureMap,
    G2: ?Sized + SupportMap + PolygonalFeatureMap,
{
    let mut simplex = VoronoiSimplex::new();

    if gjk::closest_points_with_init(pos12, g1, g2, 0.0, &options.gjk, &mut simplex)
        != GJKResult::Intersection
    {
        return;
    }

    let Some((p1, p2, normal)) = EPA::new().closest_points(
        pos12,
        g1,
        g2,
        &simplex,
        options.contact_precision,
        options.gjk.max_iterations,
    ) else {
        return;
    };

    // GJK only reports touching shapes as intersecting within its rounding error.
    let margin = options.contact_precision;
    let depth = (p1 - p2).dot(&normal);
    if depth < -margin {
        return;
    }

    let mut feature1 = PolygonalFeature::new();
    let mut feature2 = PolygonalFeature::new();
    g1.local_support_feature(&normal, &mut feature1);
    g2.local_support_feature(&pos12.inverse_transform_unit_vector(&-normal), &mut feature2);
    feature2.transform_by(pos12);

    if !clip_features(&feature1, &feature2, &normal, margin, out) {
        out.push(Contact::new(p1, p2, normal, depth.max(0.0)));
    }
}

/// Clips the incident feature against the side planes of the reference face.
///
/// Incident points farther than `margin` above the reference face are dropped.
///
/// Returns `false` if neither feature is a face aligned with `normal`, or if no point survived.
fn clip_features(
    feature1: &PolygonalFeature,
    feature2: &PolygonalFeature,
    normal: &UnitVector<Real>,
    margin: Real,
    out: &mut Vec<Contact>,
) -> bool {
    let alignment = |feature: &PolygonalFeature, dir: &Vector<Real>| {
        feature
            .normal
            .filter(|_| feature.is_face())
            .map(|n| n.dot(dir))
            .unwrap_or(-1.0)
    };
    let align1 = alignment(feature1, &**normal);
    let align2 = alignment(feature2, &-**normal);

    if align1.max(align2) < utils::COS_10_DEGREES {
        return false;
    }

    let reference_is_first = align1 >= align2;
    let (reference, incident) = if reference_is_first {
        (feature1, feature2)
    } else {
        (feature2, feature1)
    };
    let Some(ref_normal) = reference.normal else {
        return false;
    };

    let ref_pts = &reference.vertices;
    let ref_center = Point::from(
        ref_pts.iter().map(|p| p.coords).sum::<Vector<Real>>() / ref_pts.len() as Real,
    );
    let mut polygon: Vec<Point<Real>> = incident.vertices.to_vec();
    let mut clipped = Vec::with_capacity(polygon.len() + ref_pts.len());

    for i in 0..ref_pts.len() {
        let a = ref_pts[i];
        let b = ref_pts[(i + 1) % ref_pts.len()];
        let mut side_normal = (b - a).cross(&ref_normal);

        if side_normal.dot(&(ref_center - a)) > 0.0 {
            side_normal = -side_normal;
        }

        clip_halfspace_polygon(&a, &side_normal, &polygon, &mut clipped);
        core::mem::swap(&mut polygon, &mut clipped);

        if polygon.is_empty() {
            return false;
        }
    }

    let first_new = out.len();

    for pt in polygon {
        let dist = ref_normal.dot(&(pt - ref_pts[0]));

        if dist > margin {
            continue;
        }

        let on_reference = pt - *ref_normal * dist;
        let depth = (-dist).max(0.0);

        if reference_is_first {
            out.push(Contact::new(on_reference, pt, ref_normal, depth));
        } else {
            out.push(Contact::new(pt, on_reference, -ref_normal, depth));
        }
    }

    out.len() > first_new
}

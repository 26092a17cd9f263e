//! Clipping of polygons and segments by half-spaces.

use crate::math::{Point, Real, Vector};

/// Clips a polygon, a segment, or a point by the half-space `(x - center) · normal <= 0`.
///
/// Polygons with at least three vertices are closed; two vertices are treated as a segment.
/// The result is written to `result`, which is cleared first.
pub fn clip_halfspace_polygon(
    center: &Point<Real>,
    normal: &Vector<Real>,
    polygon: &[Point<Real>],
    result: &mut Vec<Point<Real>>,
) {
    result.clear();

    let signed_dist = |pt: &Point<Real>| (pt - center).dot(normal);

    match polygon {
        [] => {}
        [pt] => {
            if signed_dist(pt) <= 0.0 {
                result.push(*pt);
            }
        }
        [a, b] => {
            let (da, db) = (signed_dist(a), signed_dist(b));

            if da <= 0.0 {
                result.push(*a);
            }
            if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
                result.push(a + (b - a) * (da / (da - db)));
            }
            if db <= 0.0 {
                result.push(*b);
            }
        }
        _ => {
            // Sutherland-Hodgman, one plane.
            let mut prev = polygon[polygon.len() - 1];
            let mut prev_dist = signed_dist(&prev);

            for pt in polygon {
                let dist = signed_dist(pt);

                if (prev_dist < 0.0 && dist > 0.0) || (prev_dist > 0.0 && dist < 0.0) {
                    // We crossed the plane, so we need to cut the edge.
                    result.push(prev + (pt - prev) * (prev_dist / (prev_dist - dist)));
                }

                if dist <= 0.0 {
                    result.push(*pt);
                }

                prev = *pt;
                prev_dist = dist;
            }
        }
    }
}

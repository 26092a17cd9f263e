use crate::math::{Point, Real, UnitVector, DEFAULT_EPSILON};

/// The unit normal of the triangle `pts`, oriented by the right-hand rule.
///
/// `None` for degenerate triangles.
#[inline]
pub fn ccw_face_normal(pts: [&Point<Real>; 3]) -> Option<UnitVector<Real>> {
    let [a, b, c] = pts;
    UnitVector::try_new((b - a).cross(&(c - a)), DEFAULT_EPSILON)
}

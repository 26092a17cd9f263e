use crate::math::Real;

/// `1 / val`, with zero mapping to zero.
///
/// Turns masses and inertias into their inverses, zero standing for an infinite mass.
#[inline]
pub fn inv(val: Real) -> Real {
    if val == 0.0 {
        0.0
    } else {
        1.0 / val
    }
}

use crate::math::{Real, Vector};

/// Computes two unit tangents orthogonal to `normal` and to each other.
///
/// The first tangent is the cross product of `normal` with the world axis least aligned with it,
/// the second one completes the basis. `normal` is expected to be a unit vector; a zero vector
/// yields the world `x` and `z` axes.
pub fn tangent_basis(normal: &Vector<Real>) -> [Vector<Real>; 2] {
    let abs = normal.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vector::x()
    } else if abs.y <= abs.z {
        Vector::y()
    } else {
        Vector::z()
    };

    let Some(t1) = normal.cross(&axis).try_normalize(1.0e-12) else {
        return [Vector::x(), Vector::z()];
    };
    let t2 = normal.cross(&t1);
    let t2 = t2.try_normalize(1.0e-12).unwrap_or_else(|| t1.cross(&axis));

    [t1, t2]
}

use crate::math::Real;

pub(crate) const COS_10_DEGREES: Real = 0.984_807_75;

//! The EPA algorithm for penetration depth computation.

pub use self::epa::EPA;

mod epa;

//! Non-persistent geometric queries.
//!
//! Ray casting on every shape, GJK and EPA on support maps, and the contact generation between
//! convex parts used by the fine collision detector.

pub use self::contact::{
    contact_ball_ball, contact_support_map_ball, contacts_convex_convex, Contact, ContactOptions,
};
pub use self::ray::{Ray, RayCast, RayIntersection};

pub mod clip;
mod contact;
pub mod epa;
pub mod gjk;
pub mod ray;

//! Small helpers shared by the geometry and the dynamics.

pub use self::ccw_face_normal::ccw_face_normal;
pub(crate) use self::consts::*;
pub use self::handle_arena::{Arena, Index};
pub(crate) use self::inv::inv;
pub use self::sorted_pair::SortedPair;
pub use self::tangent_basis::tangent_basis;

mod ccw_face_normal;
mod consts;
mod handle_arena;
mod inv;
mod sorted_pair;
mod tangent_basis;

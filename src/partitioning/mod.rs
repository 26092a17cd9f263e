//! Spatial partitioning tools.

pub use self::aabb_tree::{AabbTree, TreeNodeId};

mod aabb_tree;

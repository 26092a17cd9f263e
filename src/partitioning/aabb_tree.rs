use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::Real;
use crate::query::Ray;
use ordered_float::OrderedFloat;
use slab::Slab;
use smallvec::SmallVec;
use core::cmp::Reverse;
use std::collections::BinaryHeap;

/// The identifier of a leaf of an [`AabbTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct TreeNodeId(usize);

#[derive(Clone, Debug)]
enum NodeKind<T> {
    Leaf(T),
    Internal { children: [usize; 2], height: u32 },
}

#[derive(Clone, Debug)]
struct Node<T> {
    aabb: Aabb,
    parent: Option<usize>,
    kind: NodeKind<T>,
}

enum PendingPair {
    Subtree(usize),
    Pair(usize, usize),
}

/// A dynamic AABB tree.
///
/// Every internal node has exactly two children and its AABB is the union of theirs. The tree is
/// kept height-balanced: for every internal node, the heights of its two children differ by at
/// most one. Leaves are positioned with the surface area heuristic.
///
/// # Example
///
/// ```rust
/// use impulse3d::bounding_volume::Aabb;
/// use impulse3d::partitioning::AabbTree;
/// use nalgebra::{Point3, Vector3};
///
/// let mut tree = AabbTree::new();
/// let a = tree.insert(Aabb::from_half_extents(Point3::origin(), Vector3::repeat(1.0)), "a");
/// let _ = tree.insert(Aabb::from_half_extents(Point3::new(10.0, 0.0, 0.0), Vector3::repeat(1.0)), "b");
///
/// let mut hits = vec![];
/// tree.overlaps_with(&Aabb::from_half_extents(Point3::new(1.5, 0.0, 0.0), Vector3::repeat(1.0)), 0.0, |_, data| hits.push(*data));
/// assert_eq!(hits, vec!["a"]);
///
/// assert_eq!(tree.remove(a), "a");
/// assert_eq!(tree.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct AabbTree<T> {
    nodes: Slab<Node<T>>,
    root: Option<usize>,
    num_leaves: usize,
}

impl<T> Default for AabbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AabbTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
            num_leaves: 0,
        }
    }

    /// The number of leaves of this tree.
    pub fn len(&self) -> usize {
        self.num_leaves
    }

    /// Is this tree empty?
    pub fn is_empty(&self) -> bool {
        self.num_leaves == 0
    }

    /// The height of this tree. A tree with a single leaf (or no leaf at all) has a height of 0.
    pub fn height(&self) -> u32 {
        self.root.map(|root| self.node_height(root)).unwrap_or(0)
    }

    /// Removes every leaf from this tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.num_leaves = 0;
    }

    /// The AABB of the whole tree, if it is not empty.
    pub fn root_aabb(&self) -> Option<&Aabb> {
        self.root.map(|root| &self.nodes[root].aabb)
    }

    /// The AABB of the given leaf.
    ///
    /// Panics if `id` is not a leaf of this tree.
    pub fn leaf_aabb(&self, id: TreeNodeId) -> &Aabb {
        &self.leaf(id).aabb
    }

    /// The data attached to the given leaf.
    ///
    /// Panics if `id` is not a leaf of this tree.
    pub fn leaf_data(&self, id: TreeNodeId) -> &T {
        match &self.leaf(id).kind {
            NodeKind::Leaf(data) => data,
            NodeKind::Internal { .. } => unreachable!(),
        }
    }

    /// Iterates through every leaf of this tree.
    pub fn leaves(&self) -> impl Iterator<Item = (TreeNodeId, &Aabb, &T)> {
        self.nodes.iter().filter_map(|(id, node)| match &node.kind {
            NodeKind::Leaf(data) => Some((TreeNodeId(id), &node.aabb, data)),
            NodeKind::Internal { .. } => None,
        })
    }

    fn leaf(&self, id: TreeNodeId) -> &Node<T> {
        match self.nodes.get(id.0) {
            Some(node) if matches!(node.kind, NodeKind::Leaf(_)) => node,
            _ => panic!("The node {:?} is not a leaf of this AABB tree.", id),
        }
    }

    fn node_height(&self, id: usize) -> u32 {
        match self.nodes[id].kind {
            NodeKind::Leaf(_) => 0,
            NodeKind::Internal { height, .. } => height,
        }
    }

    fn children(&self, id: usize) -> Option<[usize; 2]> {
        match self.nodes[id].kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal { children, .. } => Some(children),
        }
    }

    /// Inserts a new leaf with the given AABB and data.
    pub fn insert(&mut self, aabb: Aabb, data: T) -> TreeNodeId {
        let leaf = self.nodes.insert(Node {
            aabb,
            parent: None,
            kind: NodeKind::Leaf(data),
        });
        self.num_leaves += 1;

        if self.root.is_none() {
            self.root = Some(leaf);
            return TreeNodeId(leaf);
        }

        let sibling = self.find_best_sibling(&aabb);
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.nodes.insert(Node {
            aabb: self.nodes[sibling].aabb.merged(&aabb),
            parent: old_parent,
            kind: NodeKind::Internal {
                children: [sibling, leaf],
                height: 1,
            },
        });

        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);
        self.replace_child(old_parent, sibling, new_parent);
        self.fix_upward(old_parent);

        TreeNodeId(leaf)
    }

    /// Removes a leaf from this tree and returns its data.
    ///
    /// Panics if `id` is not a leaf of this tree.
    pub fn remove(&mut self, id: TreeNodeId) -> T {
        let _ = self.leaf(id);
        let node = self.nodes.remove(id.0);
        self.num_leaves -= 1;

        if let Some(parent) = node.parent {
            let children = self.children(parent).unwrap_or([id.0; 2]);
            let sibling = if children[0] == id.0 {
                children[1]
            } else {
                children[0]
            };
            let grand_parent = self.nodes.remove(parent).parent;

            self.nodes[sibling].parent = grand_parent;
            self.replace_child(grand_parent, parent, sibling);
            self.fix_upward(grand_parent);
        } else {
            self.root = None;
        }

        match node.kind {
            NodeKind::Leaf(data) => data,
            NodeKind::Internal { .. } => unreachable!(),
        }
    }

    /// Finds the leaf that minimizes the surface area heuristic once merged with `aabb`.
    ///
    /// The cost of a leaf is the area of its union with `aabb` plus the area growth of all its
    /// ancestors. Subtrees are visited best-first and pruned once their lower bound exceeds the
    /// best cost found so far.
    fn find_best_sibling(&self, aabb: &Aabb) -> usize {
        let Some(root) = self.root else {
            unreachable!()
        };
        let leaf_area = aabb.area();
        let mut best = root;
        let mut best_cost = Real::MAX;
        let mut queue = BinaryHeap::new();
        queue.push((Reverse(OrderedFloat(leaf_area)), root, OrderedFloat(0.0)));

        while let Some((Reverse(lower_bound), id, inherited)) = queue.pop() {
            if lower_bound.0 >= best_cost {
                break;
            }

            let node = &self.nodes[id];
            let merged_area = node.aabb.merged(aabb).area();

            match node.kind {
                NodeKind::Leaf(_) => {
                    let cost = merged_area + inherited.0;
                    if cost < best_cost {
                        best_cost = cost;
                        best = id;
                    }
                }
                NodeKind::Internal { children, .. } => {
                    let child_inherited = inherited.0 + merged_area - node.aabb.area();
                    let child_bound = leaf_area + child_inherited;

                    if child_bound < best_cost {
                        for child in children {
                            queue.push((
                                Reverse(OrderedFloat(child_bound)),
                                child,
                                OrderedFloat(child_inherited),
                            ));
                        }
                    }
                }
            }
        }

        best
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(parent) => {
                if let NodeKind::Internal { children, .. } = &mut self.nodes[parent].kind {
                    for child in children.iter_mut() {
                        if *child == old {
                            *child = new;
                        }
                    }
                }
            }
            None => self.root = Some(new),
        }
    }

    fn refit(&mut self, id: usize) {
        if let Some([a, b]) = self.children(id) {
            let aabb = self.nodes[a].aabb.merged(&self.nodes[b].aabb);
            let new_height = 1 + self.node_height(a).max(self.node_height(b));
            let node = &mut self.nodes[id];
            node.aabb = aabb;
            if let NodeKind::Internal { height, .. } = &mut node.kind {
                *height = new_height;
            }
        }
    }

    /// Walks from `id` to the root, rebalancing and refitting every ancestor.
    fn fix_upward(&mut self, mut id: Option<usize>) {
        while let Some(curr) = id {
            let curr = self.rebalance(curr);
            self.refit(curr);
            id = self.nodes[curr].parent;
        }
    }

    /// Applies a rotation at `a` if its children heights differ by more than one. Returns the
    /// root of the rebalanced subtree.
    fn rebalance(&mut self, a: usize) -> usize {
        let Some([b, c]) = self.children(a) else {
            return a;
        };

        let balance = self.node_height(c) as i64 - self.node_height(b) as i64;

        if balance > 1 {
            self.rotate_up(a, 1)
        } else if balance < -1 {
            self.rotate_up(a, 0)
        } else {
            a
        }
    }

    /// Moves the child of `a` at `slot` up, in place of `a`.
    ///
    /// The promoted child keeps its tallest child, and `a` adopts the other one. This acts as a
    /// single rotation when the outer grandchild is the tallest, and as a double rotation
    /// otherwise.
    fn rotate_up(&mut self, a: usize, slot: usize) -> usize {
        let Some(a_children) = self.children(a) else {
            return a;
        };
        let c = a_children[slot];
        let Some([f, g]) = self.children(c) else {
            return a;
        };
        let (tall, short) = if self.node_height(f) > self.node_height(g) {
            (f, g)
        } else {
            (g, f)
        };

        let parent = self.nodes[a].parent;
        self.nodes[c].parent = parent;
        self.replace_child(parent, a, c);

        if let NodeKind::Internal { children, .. } = &mut self.nodes[c].kind {
            *children = [a, tall];
        }
        self.nodes[a].parent = Some(c);

        if let NodeKind::Internal { children, .. } = &mut self.nodes[a].kind {
            children[slot] = short;
        }
        self.nodes[short].parent = Some(a);

        self.refit(a);
        self.refit(c);
        c
    }

    /// Calls `visit` on every leaf with an AABB intersecting `aabb`, both being enlarged by
    /// `epsilon`.
    pub fn overlaps_with(&self, aabb: &Aabb, epsilon: Real, mut visit: impl FnMut(TreeNodeId, &T)) {
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.extend(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];

            if !node.aabb.intersects_with_margin(aabb, epsilon) {
                continue;
            }

            match &node.kind {
                NodeKind::Leaf(data) => visit(TreeNodeId(id), data),
                NodeKind::Internal { children, .. } => stack.extend_from_slice(children),
            }
        }
    }

    /// Calls `visit` on every leaf with an AABB, enlarged by `epsilon`, hit by `ray` before
    /// `max_toi`.
    pub fn intersects_with(
        &self,
        ray: &Ray,
        max_toi: Real,
        epsilon: Real,
        mut visit: impl FnMut(TreeNodeId, &T),
    ) {
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.extend(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];

            if node
                .aabb
                .loosened(epsilon)
                .clip_ray_parameters(ray, max_toi)
                .is_none()
            {
                continue;
            }

            match &node.kind {
                NodeKind::Leaf(data) => visit(TreeNodeId(id), data),
                NodeKind::Internal { children, .. } => stack.extend_from_slice(children),
            }
        }
    }

    /// Calls `visit` once on every pair of distinct leaves with intersecting AABBs, both being
    /// enlarged by `epsilon`.
    pub fn all_overlaps(&self, epsilon: Real, mut visit: impl FnMut(&T, &T)) {
        let mut stack: SmallVec<[PendingPair; 32]> = SmallVec::new();
        stack.extend(self.root.map(PendingPair::Subtree));

        while let Some(pending) = stack.pop() {
            match pending {
                PendingPair::Subtree(id) => {
                    if let Some([a, b]) = self.children(id) {
                        stack.push(PendingPair::Subtree(a));
                        stack.push(PendingPair::Subtree(b));
                        stack.push(PendingPair::Pair(a, b));
                    }
                }
                PendingPair::Pair(a, b) => {
                    let (node_a, node_b) = (&self.nodes[a], &self.nodes[b]);

                    if !node_a.aabb.intersects_with_margin(&node_b.aabb, epsilon) {
                        continue;
                    }

                    match (&node_a.kind, &node_b.kind) {
                        (NodeKind::Leaf(data_a), NodeKind::Leaf(data_b)) => visit(data_a, data_b),
                        (NodeKind::Leaf(_), NodeKind::Internal { children, .. }) => {
                            stack.push(PendingPair::Pair(a, children[0]));
                            stack.push(PendingPair::Pair(a, children[1]));
                        }
                        (NodeKind::Internal { children, .. }, NodeKind::Leaf(_)) => {
                            stack.push(PendingPair::Pair(children[0], b));
                            stack.push(PendingPair::Pair(children[1], b));
                        }
                        (
                            NodeKind::Internal { children: ca, .. },
                            NodeKind::Internal { children: cb, .. },
                        ) => {
                            // Descend into the largest node first.
                            if node_a.aabb.area() >= node_b.aabb.area() {
                                stack.push(PendingPair::Pair(ca[0], b));
                                stack.push(PendingPair::Pair(ca[1], b));
                            } else {
                                stack.push(PendingPair::Pair(a, cb[0]));
                                stack.push(PendingPair::Pair(a, cb[1]));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Panics if this tree is malformed: broken parent links, internal AABBs not equal to the
    /// union of their children, wrong cached heights, unbalanced nodes, or a wrong leaf count.
    pub fn assert_well_formed(&self) {
        match self.root {
            None => {
                assert_eq!(self.num_leaves, 0);
                assert!(self.nodes.is_empty());
            }
            Some(root) => {
                assert!(self.nodes[root].parent.is_none());
                let (leaves, _) = self.assert_well_formed_recurse(root);
                assert_eq!(leaves, self.num_leaves);
                assert_eq!(self.nodes.len(), 2 * self.num_leaves - 1);
            }
        }
    }

    // Returns the number of leaves and the height of the subtree.
    fn assert_well_formed_recurse(&self, id: usize) -> (usize, u32) {
        let node = &self.nodes[id];

        match node.kind {
            NodeKind::Leaf(_) => (1, 0),
            NodeKind::Internal { children, height } => {
                for child in children {
                    assert_eq!(self.nodes[child].parent, Some(id), "Broken parent link.");
                }

                let (leaves_a, height_a) = self.assert_well_formed_recurse(children[0]);
                let (leaves_b, height_b) = self.assert_well_formed_recurse(children[1]);

                assert_eq!(height, 1 + height_a.max(height_b), "Wrong cached height.");
                assert!(
                    (height_a as i64 - height_b as i64).abs() <= 1,
                    "Unbalanced node: {} vs. {}",
                    height_a,
                    height_b
                );
                assert_eq!(
                    node.aabb,
                    self.nodes[children[0]]
                        .aabb
                        .merged(&self.nodes[children[1]].aabb),
                    "Internal AABB is not the union of its children."
                );

                (leaves_a + leaves_b, height)
            }
        }
    }
}

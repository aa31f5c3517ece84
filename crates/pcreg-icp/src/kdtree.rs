//! Arena-backed k-d trees over 3D points.
//!
//! Nodes live in a flat `Vec` and link to each other by index, so dropping
//! or clearing a tree never walks the structure and a degenerate
//! (list-like) tree cannot overflow the stack on teardown.

use pcreg_3d::linalg::squared_distance;

/// One stored point with its child links. `None` marks an absent subtree.
#[derive(Debug, Clone)]
struct KdNode {
    point: [f64; 3],
    left: Option<u32>,
    right: Option<u32>,
}

/// A k-d tree over 3D points, built by incremental insertion.
///
/// At depth `d` children partition on axis `d % 3`: strictly smaller
/// coordinates go left, equal or greater go right. The tree never
/// rebalances and does not support deletion; sorted or duplicate insertion
/// orders degrade lookups toward linear scans but stay correct.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
}

impl KdTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Build a tree by inserting `points` in order.
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        let mut tree = Self::new();
        for point in points {
            tree.insert(*point);
        }
        tree
    }

    /// Get the number of stored points.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert one point, descending to the first absent slot.
    pub fn insert(&mut self, point: [f64; 3]) {
        insert_into(&mut self.nodes, point);
    }

    /// Release all nodes. A no-op on an empty tree and safe to call
    /// repeatedly; dropping the tree has the same effect.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub(crate) fn nearest(&self, query: &[f64; 3]) -> Option<(usize, f64)> {
        nearest_in(&self.nodes, query)
    }

    pub(crate) fn point_of(&self, node: usize) -> [f64; 3] {
        self.nodes[node].point
    }
}

/// A k-d tree whose nodes also carry each point's position in the cloud
/// the tree was built from, so per-point data such as surface normals can
/// be looked up after a search.
///
/// The cloud those indices refer into must stay unchanged for the tree's
/// lifetime.
#[derive(Debug, Clone, Default)]
pub struct KdNormalTree {
    nodes: Vec<KdNode>,
    // Original-cloud index per node, parallel to `nodes`.
    indices: Vec<usize>,
}

impl KdNormalTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Build a tree by inserting `points` in order, tagging each with its
    /// position in the slice.
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        let mut tree = Self::new();
        for (index, point) in points.iter().enumerate() {
            tree.insert(*point, index);
        }
        tree
    }

    /// Get the number of stored points.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert one point tagged with its index in the original cloud.
    pub fn insert(&mut self, point: [f64; 3], index: usize) {
        insert_into(&mut self.nodes, point);
        self.indices.push(index);
    }

    /// Release all nodes. A no-op on an empty tree and safe to call
    /// repeatedly; dropping the tree has the same effect.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.indices.clear();
    }

    pub(crate) fn nearest(&self, query: &[f64; 3]) -> Option<(usize, f64)> {
        nearest_in(&self.nodes, query)
    }

    pub(crate) fn point_of(&self, node: usize) -> [f64; 3] {
        self.nodes[node].point
    }

    pub(crate) fn source_index(&self, node: usize) -> usize {
        self.indices[node]
    }

    pub(crate) fn max_source_index(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }
}

fn insert_into(nodes: &mut Vec<KdNode>, point: [f64; 3]) {
    let new_index = nodes.len() as u32;
    let leaf = KdNode {
        point,
        left: None,
        right: None,
    };

    if nodes.is_empty() {
        nodes.push(leaf);
        return;
    }

    let mut index = 0usize;
    let mut depth = 0usize;
    loop {
        let axis = depth % 3;
        let goes_left = point[axis] < nodes[index].point[axis];
        let child = if goes_left {
            nodes[index].left
        } else {
            nodes[index].right
        };
        match child {
            Some(next) => {
                index = next as usize;
                depth += 1;
            }
            None => {
                if goes_left {
                    nodes[index].left = Some(new_index);
                } else {
                    nodes[index].right = Some(new_index);
                }
                nodes.push(leaf);
                return;
            }
        }
    }
}

/// Nearest stored point to `query`, as (arena index, Euclidean distance).
///
/// Explicit-stack descent: the near child is followed immediately, the far
/// child is revisited only if its splitting plane lies strictly closer
/// than the best match found so far. The best match updates on strictly
/// smaller distance, so among equidistant points the one reached first
/// along the search path wins, deterministically.
fn nearest_in(nodes: &[KdNode], query: &[f64; 3]) -> Option<(usize, f64)> {
    if nodes.is_empty() {
        return None;
    }

    let mut best_node = 0usize;
    let mut best_sq = f64::INFINITY;

    // Deferred far subtrees as (node, depth, signed offset to the plane).
    let mut pending: Vec<(u32, usize, f64)> = Vec::new();
    let mut cursor: Option<(u32, usize)> = Some((0, 0));

    loop {
        let (index, depth) = match cursor.take() {
            Some(position) => position,
            None => match pending.pop() {
                Some((index, depth, plane)) => {
                    if plane * plane >= best_sq {
                        continue;
                    }
                    (index, depth)
                }
                None => break,
            },
        };

        let node = &nodes[index as usize];
        let distance_sq = squared_distance(&node.point, query);
        if distance_sq < best_sq {
            best_sq = distance_sq;
            best_node = index as usize;
        }

        let axis = depth % 3;
        let plane = query[axis] - node.point[axis];
        let (near, far) = if plane < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(far) = far {
            pending.push((far, depth + 1, plane));
        }
        cursor = near.map(|near| (near, depth + 1));
    }

    Some((best_node, best_sq.sqrt()))
}

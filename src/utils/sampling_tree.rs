//! Arena tree for sampling planners
//!
//! Nodes are stored in insertion order; the root is index 0. Parent links are
//! indices and children are index lists, so rewiring only touches integers.

use crate::common::Point2D;

/// One vertex of a sampling tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub position: Point2D,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Accumulated path cost from the root
    pub cost: f64,
}

/// Tree rooted at a fixed point
#[derive(Debug, Clone)]
pub struct SamplingTree {
    nodes: Vec<TreeNode>,
}

impl SamplingTree {
    pub const ROOT: usize = 0;

    pub fn new(root: Point2D) -> Self {
        SamplingTree {
            nodes: vec![TreeNode { position: root, parent: None, children: Vec::new(), cost: 0.0 }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Attach a new leaf under `parent`, costed by straight-line distance.
    pub fn add(&mut self, position: Point2D, parent: usize) -> usize {
        let cost = self.nodes[parent].cost + self.nodes[parent].position.distance(&position);
        let index = self.nodes.len();
        self.nodes.push(TreeNode { position, parent: Some(parent), children: Vec::new(), cost });
        self.nodes[parent].children.push(index);
        index
    }

    /// Index of the closest node; the earliest inserted wins ties.
    pub fn nearest(&self, point: Point2D) -> usize {
        let mut best = Self::ROOT;
        let mut best_dist = f64::INFINITY;
        for (i, node) in self.nodes.iter().enumerate() {
            let d = node.position.distance(&point);
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }

    /// Indices of every node within `radius` of `point`.
    pub fn near(&self, point: Point2D, radius: f64) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.position.distance(&point) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    /// True when `ancestor` lies on the root path of `node` (or is `node`).
    pub fn is_ancestor(&self, ancestor: usize, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    /// Move `node` under `new_parent` and refresh the cost of its whole
    /// subtree. Refuses (returns `false`) when that would create a cycle.
    pub fn reparent(&mut self, node: usize, new_parent: usize) -> bool {
        if node == Self::ROOT || self.is_ancestor(node, new_parent) {
            return false;
        }
        if let Some(old) = self.nodes[node].parent {
            self.nodes[old].children.retain(|&c| c != node);
        }
        self.nodes[node].parent = Some(new_parent);
        self.nodes[new_parent].children.push(node);
        self.refresh_costs(node);
        true
    }

    /// Path from the root to `node`, root first.
    pub fn path_to_root(&self, node: usize) -> Vec<Point2D> {
        let mut points = Vec::new();
        let mut current = Some(node);
        while let Some(i) = current {
            points.push(self.nodes[i].position);
            current = self.nodes[i].parent;
        }
        points.reverse();
        points
    }

    fn refresh_costs(&mut self, from: usize) {
        let mut stack = vec![from];
        while let Some(i) = stack.pop() {
            if let Some(p) = self.nodes[i].parent {
                self.nodes[i].cost =
                    self.nodes[p].cost + self.nodes[p].position.distance(&self.nodes[i].position);
            }
            stack.extend(self.nodes[i].children.iter().copied());
        }
    }
}

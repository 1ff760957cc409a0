//! Contour nesting as an index-linked forest.
//!
//! Every traced curve has one [`HierarchyNode`] at the same index. Links
//! are plain indices into the flat curve list (parent, first child, next
//! sibling), so the forest needs no reference-counted graph.

use serde::{Deserialize, Serialize};

use crate::types::GeoContourError;

/// Nesting links for a single curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub parent: Option<usize>,
    pub first_child: Option<usize>,
    pub next_sibling: Option<usize>,
}

/// Forest relation over curve indices.
///
/// Top-level curves are chained through `next_sibling` starting at the
/// lowest-indexed node without a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy(Vec<HierarchyNode>);

impl Hierarchy {
    /// Wrap an explicit node list. Call [`walk`](Self::walk) to validate it.
    #[must_use]
    pub const fn new(nodes: Vec<HierarchyNode>) -> Self {
        Self(nodes)
    }

    /// Build child and sibling links from per-node parent indices.
    ///
    /// Children of a node (and the top-level nodes) are linked in
    /// ascending index order.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::MalformedHierarchy`] if a parent index
    /// is out of range or refers to the node itself.
    pub fn from_parents(parents: &[Option<usize>]) -> Result<Self, GeoContourError> {
        let mut nodes = vec![HierarchyNode::default(); parents.len()];
        let mut last_root: Option<usize> = None;
        let mut last_child: Vec<Option<usize>> = vec![None; parents.len()];

        for (index, &parent) in parents.iter().enumerate() {
            nodes[index].parent = parent;
            let previous = match parent {
                None => last_root.replace(index),
                Some(p) if p >= parents.len() => {
                    return Err(GeoContourError::MalformedHierarchy(format!(
                        "node {index} has parent {p}, but only {} nodes exist",
                        parents.len()
                    )));
                }
                Some(p) if p == index => {
                    return Err(GeoContourError::MalformedHierarchy(format!(
                        "node {index} is its own parent"
                    )));
                }
                Some(p) => {
                    let previous = last_child[p].replace(index);
                    if previous.is_none() {
                        nodes[p].first_child = Some(index);
                    }
                    previous
                }
            };
            if let Some(prev) = previous {
                nodes[prev].next_sibling = Some(index);
            }
        }

        Ok(Self(nodes))
    }

    /// Number of nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the hierarchy has no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All nodes, indexed like the curve list.
    #[must_use]
    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.0
    }

    /// Direct children of `index`, following `first_child` then
    /// `next_sibling`.
    ///
    /// Only safe to exhaust on a hierarchy that passed [`walk`](Self::walk);
    /// a sibling cycle would never terminate.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.0.get(index).and_then(|n| n.first_child);
        std::iter::successors(first, |&c| self.0.get(c).and_then(|n| n.next_sibling))
    }

    /// Validate the forest and return its nodes in pre-order with depths.
    ///
    /// The walk starts at the first parentless node, visits each node's
    /// children before its next sibling, and must reach every node exactly
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`GeoContourError::MalformedHierarchy`] if any link is out
    /// of range, a child's `parent` disagrees with the link that reached
    /// it, a node is reached twice (cycle), or a node is unreachable.
    pub fn walk(&self) -> Result<Vec<(usize, usize)>, GeoContourError> {
        let n = self.0.len();
        for (index, node) in self.0.iter().enumerate() {
            for (field, link) in [
                ("parent", node.parent),
                ("first_child", node.first_child),
                ("next_sibling", node.next_sibling),
            ] {
                if let Some(target) = link
                    && target >= n
                {
                    return Err(GeoContourError::MalformedHierarchy(format!(
                        "node {index} {field} {target} is out of range ({n} nodes)"
                    )));
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];
        let first_root = self.0.iter().position(|node| node.parent.is_none());
        let mut stack: Vec<(usize, usize, Option<usize>)> = Vec::new();
        if let Some(root) = first_root {
            stack.push((root, 0, None));
        }

        while let Some((index, depth, expected_parent)) = stack.pop() {
            if visited[index] {
                return Err(GeoContourError::MalformedHierarchy(format!(
                    "node {index} is reachable more than once (cycle)"
                )));
            }
            visited[index] = true;

            let node = self.0[index];
            if node.parent != expected_parent {
                return Err(GeoContourError::MalformedHierarchy(format!(
                    "node {index} records parent {:?} but is linked under {expected_parent:?}",
                    node.parent
                )));
            }
            order.push((index, depth));

            if let Some(sibling) = node.next_sibling {
                stack.push((sibling, depth, expected_parent));
            }
            if let Some(child) = node.first_child {
                stack.push((child, depth + 1, Some(index)));
            }
        }

        if let Some(orphan) = visited.iter().position(|&seen| !seen) {
            return Err(GeoContourError::MalformedHierarchy(format!(
                "node {orphan} is not reachable from the top level"
            )));
        }

        Ok(order)
    }
}

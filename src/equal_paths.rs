//! Leaf-depth checks for arbitrary binary trees.
//!
//! Unlike [`AvlTree`](crate::AvlTree), the trees here carry no balance information and may have
//! any shape. [`equal_paths`] reports whether every root-to-leaf path has the same length.
//!
//! # Examples
//!
//! ```
//! use cordyceps_avl::equal_paths::{equal_paths, BinaryNode};
//!
//! let full = BinaryNode::with_children(2, Some(BinaryNode::leaf(1)), Some(BinaryNode::leaf(3)));
//! assert!(equal_paths(Some(&full)));
//!
//! let lopsided = BinaryNode::with_children(
//!     2,
//!     Some(BinaryNode::with_children(1, Some(BinaryNode::leaf(0)), None)),
//!     Some(BinaryNode::leaf(3)),
//! );
//! assert!(!equal_paths(Some(&lopsided)));
//! ```

use alloc::boxed::Box;

/// A node of a plain, owned binary tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryNode<T> {
    pub value: T,
    pub left: Option<Box<BinaryNode<T>>>,
    pub right: Option<Box<BinaryNode<T>>>,
}

impl<T> BinaryNode<T> {
    /// Returns a node with no children.
    pub fn leaf(value: T) -> Self {
        BinaryNode {
            value,
            left: None,
            right: None,
        }
    }

    /// Returns a node with the given children.
    pub fn with_children(value: T, left: Option<Self>, right: Option<Self>) -> Self {
        BinaryNode {
            value,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    /// Returns `true` if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Returns `true` if every leaf of the tree rooted at `root` lies at the same depth.
///
/// An empty tree trivially satisfies this, as does a single node. A missing child is not a leaf,
/// so a chain of single-child nodes has exactly one leaf and also returns `true`.
pub fn equal_paths<T>(root: Option<&BinaryNode<T>>) -> bool {
    match root {
        None => true,
        Some(root) => height(Some(root)) == min_leaf_depth(root),
    }
}

// Length of the longest root-to-leaf path, counted in nodes.
fn height<T>(node: Option<&BinaryNode<T>>) -> usize {
    match node {
        None => 0,
        Some(node) => 1 + height(node.left.as_deref()).max(height(node.right.as_deref())),
    }
}

// Length of the shortest root-to-leaf path, counted in nodes.
//
// A missing child is not a leaf, so unary nodes only follow their present child.
fn min_leaf_depth<T>(node: &BinaryNode<T>) -> usize {
    let left = node.left.as_deref().map(min_leaf_depth);
    let right = node.right.as_deref().map(min_leaf_depth);

    1 + match (left, right) {
        (None, None) => 0,
        (Some(depth), None) | (None, Some(depth)) => depth,
        (Some(left), Some(right)) => left.min(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds a perfect tree of the given height with in-order values starting at `first`.
    fn perfect(height: u32, first: u32) -> Option<BinaryNode<u32>> {
        if height == 0 {
            return None;
        }

        let half = (1 << (height - 1)) - 1;
        Some(BinaryNode::with_children(
            first + half,
            perfect(height - 1, first),
            perfect(height - 1, first + half + 1),
        ))
    }

    #[test]
    fn empty() {
        assert!(equal_paths::<u32>(None));
    }

    #[test]
    fn single_node() {
        assert!(equal_paths(Some(&BinaryNode::leaf(1))));
    }

    #[test]
    fn unary_chain_has_one_leaf() {
        let left = BinaryNode::with_children(2, Some(BinaryNode::leaf(1)), None);
        assert!(equal_paths(Some(&left)));

        let right = BinaryNode::with_children(2, None, Some(BinaryNode::leaf(3)));
        assert!(equal_paths(Some(&right)));

        // A zig-zag chain of any length still ends in a single leaf.
        let zigzag = BinaryNode::with_children(
            4,
            Some(BinaryNode::with_children(
                1,
                None,
                Some(BinaryNode::with_children(3, Some(BinaryNode::leaf(2)), None)),
            )),
            None,
        );
        assert!(equal_paths(Some(&zigzag)));
    }

    #[test]
    fn leaf_beside_deeper_subtree() {
        let root = BinaryNode::with_children(
            2,
            Some(BinaryNode::leaf(1)),
            Some(BinaryNode::with_children(4, Some(BinaryNode::leaf(3)), None)),
        );

        assert!(!equal_paths(Some(&root)));
    }

    #[test]
    fn unary_node_above_full_subtrees() {
        let root = BinaryNode::with_children(8, perfect(3, 0), None);
        assert!(equal_paths(Some(&root)));
    }

    #[test]
    fn perfect_trees() {
        for height in 1..=8 {
            let root = perfect(height, 0).unwrap();
            assert!(equal_paths(Some(&root)), "perfect tree of height {height}");
        }
    }

    #[test]
    fn one_short_leaf_in_perfect_tree() {
        let mut root = perfect(4, 0).unwrap();

        // Cut off the right-most leaf's parent's children.
        let mut cur = &mut root;
        while cur.right.as_ref().is_some_and(|r| !r.is_leaf()) {
            cur = cur.right.as_deref_mut().unwrap();
        }
        cur.right = None;
        cur.left = None;

        assert!(!equal_paths(Some(&root)));
    }
}

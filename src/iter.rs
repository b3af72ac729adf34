use core::iter::FusedIterator;

use crate::{AvlTree, Dir, Link, Links, TreeNode};

/// An in-order iterator over the elements of an [`AvlTree`].
///
/// Elements are yielded in ascending key order from the front and in descending key order from
/// the back. The two ends never cross.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    front: Link<T>,
    back: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        let (front, back) = match tree.root {
            Some(root) => unsafe {
                (
                    Some(tree.min_in_subtree(root)),
                    Some(tree.max_in_subtree(root)),
                )
            },
            None => (None, None),
        };

        Iter {
            tree,
            front,
            back,
            len: tree.len(),
        }
    }

    // Yields the node at one end and steps that end inward.
    fn step(&mut self, toward: Dir) -> Option<&'tree T> {
        if self.len == 0 {
            return None;
        }

        let end = match toward {
            Dir::Right => &mut self.front,
            Dir::Left => &mut self.back,
        };

        let cur = (*end)?;
        *end = unsafe { self.tree.neighbor(cur, toward) };
        self.len -= 1;

        Some(unsafe { cur.as_ref() })
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        self.step(Dir::Right)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.step(Dir::Left)
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Clone for Iter<'tree, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> IntoIterator for &'tree AvlTree<T> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

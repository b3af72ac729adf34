//! An intrusive AVL tree.
#![no_std]

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A missing child has height 0.
// - The balance of a node `x` is `b(x) = h(right(x)) - h(left(x))`.
// - A node is *left-heavy* if `b(x) = -1`, *right-heavy* if `b(x) = 1`.
// - The *tall* side of a node is the side of its taller child.
//
// The fundamental invariants of an AVL tree are:
// 1. Every node satisfies `b(x) ∈ {-1, 0, 1}`.
// 2. Every stored balance equals the measured difference of its subtree heights.
//
// Balances are maintained incrementally; heights are never stored. Between a mutation and the end
// of its fix-up pass a single node may transiently hold a balance of -2 or 2.
//
// Corollaries:
// 3. A tree with `n` elements has height below `1.44 * log2(n + 2)`.
// 4. After an insertion, at most one single or double rotation restores (1).
// 5. After a removal, one rotation may occur per ancestor of the removed node.

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;
#[cfg(any(test, feature = "model"))]
extern crate std;

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

#[cfg(any(test, feature = "alloc"))]
mod debug;
#[cfg(any(test, feature = "alloc"))]
pub mod equal_paths;
pub mod iter;
#[cfg(any(test, feature = "alloc"))]
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;


pub use iter::Iter;
#[cfg(any(test, feature = "alloc"))]
pub use map::AvlMap;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Items are linked into the tree through an embedded [`Links`] record and owned by the tree
/// through their [`Linked::Handle`] until they are removed or the tree is dropped.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    /// The change in a parent's balance when the subtree on this side grows by one.
    #[inline]
    fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree, or 0 if the tree is empty.
    ///
    /// This follows the stored balances down the taller side of each node and completes in
    /// _O(log(n))_ time.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            height += 1;

            unsafe {
                let links = T::links(cur).as_ref();
                opt_cur = if links.balance() < 0 {
                    links.left()
                } else {
                    links.right()
                };
            }
        }

        height
    }

    /// Returns `true` if the tree contains an element with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the element corresponding to `key`.
    ///
    /// The caller must not change the element's key through the returned reference in a way that
    /// changes its ordering relative to other keys in the tree.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let root = self.root?;

        unsafe {
            let first = self.min_in_subtree(root);
            Some(Pin::new_unchecked(first.as_ref()))
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let root = self.root?;

        unsafe {
            let last = self.max_in_subtree(root);
            Some(Pin::new_unchecked(last.as_ref()))
        }
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let root = self.root?;

        unsafe {
            let first = self.min_in_subtree(root);
            Some(self.remove_at(first))
        }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let root = self.root?;

        unsafe {
            let last = self.max_in_subtree(root);
            Some(self.remove_at(last))
        }
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => self.replace_child(parent, old_child, new_child),
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that `old_child` is a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);
            debug_assert_eq!(
                T::links(parent).as_ref().child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );

            T::links(parent).as_mut().set_child(dir, new_child);
        }
    }

    // Rotates `down` in direction `dir`: its child on the `!dir` side moves up to take its place,
    // and `down` becomes that child's `dir` child.
    //
    // `rotate(y, Dir::Right)` is a right rotation about `y`; `rotate(x, Dir::Left)` is a left
    // rotation about `x`. Returns the node that moved up.
    //
    // The balances of affected nodes are not updated.
    unsafe fn rotate(&mut self, down: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let up = T::links(down)
                .as_ref()
                .child(!dir)
                .expect("cannot rotate toward a missing child");

            // `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let across = T::links(up).as_ref().child(dir);
            T::links(down).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            T::links(up).as_mut().set_child(dir, Some(down));
            let parent = T::links(down).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            up
        }
    }

    // Performs a double rotation at `top`, whose `tall` child `mid` is heavy on the `!tall` side.
    // The inner grandchild `inner = mid.child(!tall)` becomes the subtree root with `mid` and
    // `top` as its children.
    //
    // The three balances are assigned from the inner node's balance before the rotation. Returns
    // the new subtree root.
    unsafe fn rotate_twice(&mut self, top: NonNull<T>, tall: Dir) -> NonNull<T> {
        unsafe {
            let mid = T::links(top)
                .as_ref()
                .child(tall)
                .expect("double rotation requires a tall child");
            let inner = T::links(mid)
                .as_ref()
                .child(!tall)
                .expect("double rotation requires an inner grandchild");

            let s = tall.sign();
            let inner_balance = T::links(inner).as_ref().balance();

            self.rotate(mid, tall);
            self.rotate(top, !tall);

            // `inner`'s outer subtree goes to `top` and its inner subtree goes to `mid`. Whichever
            // of them was the shorter one leaves its new parent heavy on the other side.
            let (top_balance, mid_balance) = match inner_balance {
                b if b == s => (-s, 0),
                0 => (0, 0),
                b if b == -s => (0, s),
                b => unreachable!("inner balance {b} out of range"),
            };

            T::links(top).as_mut().set_balance(top_balance);
            T::links(mid).as_mut().set_balance(mid_balance);
            T::links(inner).as_mut().set_balance(0);

            inner
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an item with an equal key, `item` takes over its position in
    /// the tree and the previous item is returned. The shape of the tree is unchanged in that
    /// case.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe { T::links(ptr).as_mut().clear() };

        let Some(root) = self.root else {
            // Tree is empty. Set `item` as the root and return.
            self.root = Some(ptr);
            self.len += 1;
            return None;
        };

        let mut parent = root;

        // Descend the tree, looking for an empty child slot.
        let dir = loop {
            let ordering = unsafe { ptr.as_ref().key().cmp(parent.as_ref().key()) };

            let dir = match ordering {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Some(unsafe { self.replace_node(parent, ptr) }),
                Ordering::Greater => Dir::Right,
            };

            unsafe {
                match T::links(parent).as_ref().child(dir) {
                    // Descend.
                    Some(child) => parent = child,

                    // Set `item` as child.
                    None => {
                        T::links(parent).as_mut().set_child(dir, Some(ptr));
                        T::links(ptr).as_mut().set_parent(Some(parent));
                        break dir;
                    }
                }
            }
        };

        self.len += 1;

        unsafe {
            if T::links(parent).as_ref().balance() == 0 {
                // The parent was a leaf and has grown by one.
                T::links(parent).as_mut().set_balance(dir.sign());
                self.insert_fix(parent, ptr);
            } else {
                // The parent already had a child on the other side; its height is unchanged.
                T::links(parent).as_mut().set_balance(0);
            }
        }

        None
    }

    // Puts `new` in the exact structural position of `old`, which is then unlinked and returned.
    //
    // # Safety
    //
    // `old` must be an element of `self`, `new` must not be, and their keys must be equal.
    unsafe fn replace_node(&mut self, old: NonNull<T>, new: NonNull<T>) -> T::Handle {
        unsafe {
            let old_links = T::links(old).as_ref();
            let balance = old_links.balance();
            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();

            self.replace_child_or_set_root(parent, old, Some(new));
            self.maybe_set_parent(left, Some(new));
            self.maybe_set_parent(right, Some(new));

            let new_links = T::links(new).as_mut();
            new_links.set_parent(parent);
            new_links.set_left(left);
            new_links.set_right(right);
            new_links.set_balance(balance);

            T::links(old).as_mut().clear();

            T::from_ptr(old)
        }
    }

    // Propagates a height increase of `node` upward after an insertion.
    //
    // Invariants:
    // - `node` is a child of `parent`.
    // - The subtree rooted at `parent` has grown by one, and `parent`'s balance is already updated
    //   to 1 or -1.
    // - If `parent`'s balance points toward `node`, so does `node`'s unless `node` is a new leaf.
    unsafe fn insert_fix(&mut self, mut parent: NonNull<T>, mut node: NonNull<T>) {
        unsafe {
            loop {
                let Some(grandparent) = T::links(parent).as_ref().parent() else {
                    // Reached the root; its balance is already correct.
                    return;
                };

                let dir = self.which_child(grandparent, parent);
                let balance = T::links(grandparent).as_ref().balance() + dir.sign();
                T::links(grandparent).as_mut().set_balance(balance);

                match balance {
                    // The shorter side caught up. The height of `grandparent` is unchanged.
                    0 => return,

                    // `grandparent` grew but is still balanced. Ascend.
                    -1 | 1 => {
                        node = parent;
                        parent = grandparent;
                    }

                    // `grandparent` is doubly heavy toward `parent`. A single or double rotation
                    // restores the subtree to its height before the insertion.
                    _ => {
                        let s = dir.sign();
                        let parent_balance = T::links(parent).as_ref().balance();

                        if parent_balance == s {
                            self.rotate(grandparent, !dir);
                            T::links(grandparent).as_mut().set_balance(0);
                            T::links(parent).as_mut().set_balance(0);
                        } else {
                            debug_assert_eq!(parent_balance, -s);
                            debug_assert_eq!(T::links(parent).as_ref().child(!dir), Some(node));
                            self.rotate_twice(grandparent, dir);
                        }

                        return;
                    }
                }
            }
        }
    }

    // Returns the minimum node in the subtree.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            cur = left;
        }

        cur
    }

    // Returns the maximum node in the subtree.
    #[inline]
    unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(right) = unsafe { T::links(cur).as_ref().right() } {
            cur = right;
        }

        cur
    }

    /// Removes the element with the given key from the tree and returns it.
    ///
    /// Returns `None` and leaves the tree untouched if no element has the key.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            // A node with two children trades places with its predecessor[^1], which has no right
            // child. Either way `node` then has at most one child.
            //
            // [^1]: The predecessor of a node `a` is the greatest node in `a`'s left subtree.
            if let (Some(left), Some(_)) = (
                T::links(node).as_ref().left(),
                T::links(node).as_ref().right(),
            ) {
                let predecessor = self.max_in_subtree(left);
                self.node_swap(node, predecessor);
            }

            let parent = T::links(node).as_ref().parent();
            let child = T::links(node)
                .as_ref()
                .left()
                .or_else(|| T::links(node).as_ref().right());
            let shrunk = parent.map(|p| self.which_child(p, node));

            // Elevate the child (which may be None) into `node`'s place.
            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);

            T::links(node).as_mut().clear();
            self.len -= 1;

            if let (Some(parent), Some(shrunk)) = (parent, shrunk) {
                self.remove_fix(parent, shrunk);
            }

            T::from_ptr(node)
        }
    }

    // Propagates a height decrease upward after a removal.
    //
    // Invariants:
    // - The subtree on the `shrunk` side of `node` has lost one level of height.
    // - `node`'s balance does not yet reflect this.
    unsafe fn remove_fix(&mut self, node: NonNull<T>, shrunk: Dir) {
        let mut node = node;
        let mut shrunk = shrunk;

        unsafe {
            loop {
                // Determine where the next level hangs before any rotation moves `node`.
                let parent = T::links(node).as_ref().parent();
                let next_shrunk = parent.map(|p| self.which_child(p, node));

                let tall = !shrunk;
                let s = tall.sign();
                let balance = T::links(node).as_ref().balance() + s;

                if balance == 2 * s {
                    let child = T::links(node)
                        .as_ref()
                        .child(tall)
                        .expect("doubly heavy node must have a tall child");
                    let child_balance = T::links(child).as_ref().balance();

                    if child_balance == s {
                        // Single rotation. The subtree is one shorter than before the removal.
                        self.rotate(node, shrunk);
                        T::links(node).as_mut().set_balance(0);
                        T::links(child).as_mut().set_balance(0);
                    } else if child_balance == 0 {
                        // Single rotation. The subtree keeps its height.
                        self.rotate(node, shrunk);
                        T::links(node).as_mut().set_balance(s);
                        T::links(child).as_mut().set_balance(-s);
                        return;
                    } else {
                        // Double rotation. The subtree is one shorter than before the removal.
                        self.rotate_twice(node, tall);
                    }
                } else if balance == s {
                    // The balanced node leans away from the removal. Its height is unchanged.
                    T::links(node).as_mut().set_balance(balance);
                    return;
                } else {
                    // The tall side was removed from; the node is now balanced and one shorter.
                    debug_assert_eq!(balance, 0);
                    T::links(node).as_mut().set_balance(0);
                }

                match (parent, next_shrunk) {
                    (Some(parent), Some(dir)) => {
                        node = parent;
                        shrunk = dir;
                    }
                    _ => return,
                }
            }
        }
    }

    // Swaps the structural positions of `a` and `b`.
    //
    // Each position keeps its balance: after the call `a` holds `b`'s former balance and vice
    // versa. `a` and `b` may be adjacent.
    unsafe fn node_swap(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if a == b {
            return;
        }

        unsafe {
            let a_links = T::links(a).as_ref();
            let (a_parent, a_left, a_right, a_balance) = (
                a_links.parent(),
                a_links.left(),
                a_links.right(),
                a_links.balance(),
            );

            let b_links = T::links(b).as_ref();
            let (b_parent, b_left, b_right, b_balance) = (
                b_links.parent(),
                b_links.left(),
                b_links.right(),
                b_links.balance(),
            );

            let a_dir = a_parent.map(|p| self.which_child(p, a));
            let b_dir = b_parent.map(|p| self.which_child(p, b));

            // Links between `a` and `b` must point the other way after the swap.
            let swapped = |link: Link<T>| match link {
                Some(n) if n == a => Some(b),
                Some(n) if n == b => Some(a),
                other => other,
            };

            let a_links = T::links(a).as_mut();
            a_links.set_parent(swapped(b_parent));
            a_links.set_left(swapped(b_left));
            a_links.set_right(swapped(b_right));
            a_links.set_balance(b_balance);

            let b_links = T::links(b).as_mut();
            b_links.set_parent(swapped(a_parent));
            b_links.set_left(swapped(a_left));
            b_links.set_right(swapped(a_right));
            b_links.set_balance(a_balance);

            // Point the surrounding nodes at their new neighbors.
            for (node, parent, dir) in [(b, a_parent, a_dir), (a, b_parent, b_dir)] {
                match (parent, dir) {
                    (Some(parent), Some(dir)) if parent != a && parent != b => {
                        T::links(parent).as_mut().set_child(dir, Some(node));
                    }
                    (Some(_), _) => {}
                    (None, _) => self.root = Some(node),
                }
            }

            for node in [a, b] {
                let left = T::links(node).as_ref().left();
                let right = T::links(node).as_ref().right();
                self.maybe_set_parent(left, Some(node));
                self.maybe_set_parent(right, Some(node));
            }
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = self.min_in_subtree(cur);
                let parent = T::links(cur).as_ref().parent();

                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                T::links(cur).as_mut().clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    // Returns the in-order neighbor of `node` on the `dir` side: the successor for `Dir::Right`,
    // the predecessor for `Dir::Left`.
    unsafe fn neighbor(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(mut cur) = T::links(node).as_ref().child(dir) {
                // The nearest node on that side is the extreme of the child subtree.
                while let Some(next) = T::links(cur).as_ref().child(!dir) {
                    cur = next;
                }

                return Some(cur);
            }

            // Climb until arriving from the `!dir` side.
            let mut cur = node;
            loop {
                let parent = T::links(cur).as_ref().parent()?;

                if self.which_child(parent, cur) != dir {
                    return Some(parent);
                }

                cur = parent;
            }
        }
    }

    #[inline]
    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if T::links(parent).as_ref().left() == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Debug,
{
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;

        if let Some(root) = self.root {
            assert_eq!(
                unsafe { T::links(root).as_ref().parent() },
                None,
                "root must not have a parent"
            );
            unsafe { self.assert_invariants_at(root, None, None, &mut count) };
        }

        assert_eq!(count, self.len, "element count does not match `len`");
    }

    // Checks the subtree rooted at `node` and returns its measured height.
    //
    // Every key in the subtree must lie strictly between `lower` and `upper`.
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        lower: Option<&T::Key>,
        upper: Option<&T::Key>,
        count: &mut usize,
    ) -> i32 {
        unsafe {
            let key = node.as_ref().key();
            *count += 1;

            if let Some(lower) = lower {
                assert!(lower < key, "{lower:?} must be ordered before {key:?}");
            }

            if let Some(upper) = upper {
                assert!(key < upper, "{key:?} must be ordered before {upper:?}");
            }

            let mut heights = [0; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };

                    heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
                }
            }

            let measured = heights[Dir::Right as usize] - heights[Dir::Left as usize];
            let balance = T::links(node).as_ref().balance();

            // Ensure the stored balance is exact and within bounds.
            assert_eq!(
                i32::from(balance),
                measured,
                "stored balance of {key:?} does not match its subtree heights"
            );
            assert!((-1..=1).contains(&balance), "{key:?} is out of balance");

            1 + heights[0].max(heights[1])
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|item| item.key())).finish()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        self.inner.get_mut().balance = balance;
    }

    // Resets the links to the unlinked state.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.balance = 0;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}

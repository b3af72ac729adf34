extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlMap, AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub(crate) fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// One slot of a pre-order walk of a tree: a node's key and balance, or a missing child.
pub type ShapeSlot<K> = Option<(K, i8)>;

/// Returns the pre-order shape of `tree`, including missing children and stored balances.
///
/// Two trees with equal shapes have identical structure, keys and balances.
pub fn shape<T>(tree: &AvlTree<T>) -> Vec<ShapeSlot<T::Key>>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Clone,
{
    let mut out = Vec::new();
    let mut stack = Vec::new();
    stack.push(tree.root);

    while let Some(link) = stack.pop() {
        match link {
            None => out.push(None),
            Some(node) => unsafe {
                let links = T::links(node).as_ref();
                out.push(Some((node.as_ref().key().clone(), links.balance())));
                stack.push(links.right());
                stack.push(links.left());
            },
        }
    }

    out
}

// Removes leaf `key` from a shape, ignoring balances. Returns `None` if `key` is not a leaf.
fn prune_leaf(shape: &[ShapeSlot<u32>], key: u32) -> Option<Vec<Option<u32>>> {
    let mut out = Vec::with_capacity(shape.len());
    let mut slots = shape.iter().map(|slot| slot.map(|(k, _)| k));

    while let Some(slot) = slots.next() {
        if slot == Some(key) {
            // A leaf is followed by its two missing children.
            if slots.next() != Some(None) || slots.next() != Some(None) {
                return None;
            }
            out.push(None);
        } else {
            out.push(slot);
        }
    }

    Some(out)
}

fn strip_balances(shape: &[ShapeSlot<u32>]) -> Vec<Option<u32>> {
    shape.iter().map(|slot| slot.map(|(k, _)| k)).collect()
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue, u32),
    Get(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item, value) => FinalOp::Insert(get_value(sorted, item), value),
            Op::Get(item) => FinalOp::Get(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32, u32),
    Get(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        (value_strategy(), proptest::num::u32::ANY).prop_map(|(k, v)| Op::Insert(k, v)),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut avl: AvlMap<u32, u32> = AvlMap::new();

    let mut final_ops = Vec::with_capacity(ops.len());
    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_keys: Vec<u32> = btree.keys().copied().collect();
        let final_op = op.finalize(&sorted_keys);
        final_ops.push(final_op);

        match final_op {
            FinalOp::Insert(key, value) => {
                let height = avl.height();
                let shape_before = shape(&avl.tree);

                let from_btree = btree.insert(key, value);
                let from_avl = avl.insert(key, value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");

                // Overwriting a value never touches the structure.
                if from_avl.is_some() {
                    assert_eq!(height, avl.height(), "FinalOp #{op_id}: {final_op:?}");
                    assert_eq!(
                        shape_before,
                        shape(&avl.tree),
                        "FinalOp #{op_id}: {final_op:?}"
                    );
                }
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key);
                let from_avl = avl.get(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                let shape_before = shape(&avl.tree);

                let from_btree = btree.remove(&key);
                let from_avl = avl.remove(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");

                // Removing an absent key is a no-op.
                if from_avl.is_none() {
                    assert_eq!(
                        shape_before,
                        shape(&avl.tree),
                        "FinalOp #{op_id}: {final_op:?}"
                    );
                }
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value();
                let from_avl = avl.first_key_value();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value();
                let from_avl = avl.last_key_value();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().eq(avl.iter()), "history: {final_ops:?}");
    }
}

/// Inserts `probe` into a tree built from `values` and removes it again.
///
/// If the insertion did not rotate, the tree must return to exactly its prior shape, balances
/// included. If it did rotate, the removal must still leave a valid tree with the same keys.
pub fn run_shape_restore(values: Vec<u32>, probe: u32) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for value in values {
        if value != probe {
            tree.insert(TestNode::new(value));
        }
    }

    let before = shape(&tree);
    let keys_before: Vec<u32> = tree.iter().map(|node| node.key).collect();

    assert!(tree.insert(TestNode::new(probe)).is_none());
    tree.assert_invariants();

    let rotated = prune_leaf(&shape(&tree), probe) != Some(strip_balances(&before));

    let removed = tree.remove(&probe).expect("probe must be present");
    assert_eq!(removed.key, probe);
    tree.assert_invariants();

    if !rotated {
        assert_eq!(before, shape(&tree));
    }

    let keys_after: Vec<u32> = tree.iter().map(|node| node.key).collect();
    assert_eq!(keys_before, keys_after);
}

#[derive(Clone, Debug)]
pub struct ShapeRestoreInput {
    pub values: Vec<u32>,
    pub probe: u32,
}

impl<'a> arbitrary::Arbitrary<'a> for ShapeRestoreInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            u16::arbitrary(u).map(u32::from).unwrap_or(0)
        }

        let num_values = u8::arbitrary(u)? % 100;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        Ok(ShapeRestoreInput {
            values,
            probe: value(u),
        })
    }
}

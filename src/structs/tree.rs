//! Binary tree over arena-allocated nodes with pluggable ordering.
//!
//! A [`Tree`] owns its nodes in a slab. Child links own, the `parent` link is
//! a plain [`NodeId`] handle and never owns. The placement strategy is chosen
//! at construction through the [`TreeOrder`] type parameter:
//!
//! | Variant | Order | Placement |
//! |---------|-------|-----------|
//! | [`GenericTree`] | [`Unordered`] | first free slot in level order |
//! | [`SearchTree`] | [`SearchOrder`] | descend by key, `<` left, `>=` right |
//! | [`Heap`] | [`HeapOrder`] | first free slot in level order, then sift up |
//!
//! # Freeing Nodes
//!
//! [`Tree::free`] only releases a node that is already detached: no parent,
//! no children, not the root. Use [`Tree::detach`] first to cut a node out of
//! the tree. Freeing never touches parents or siblings.

use crate::core::error::{ContainerError, ContainerResult};
use crate::structs::key::{Key, KeyKind};
use slab::Slab;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

/// Handle to a node in a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which child slot of a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left child slot.
    Left,
    /// Right child slot.
    Right,
}

/// A tree entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<V> {
    /// Key of the entry.
    pub key: Key,
    /// Payload.
    pub value: V,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

impl<V> TreeNode<V> {
    fn new(key: Key, value: V) -> Self {
        Self {
            key,
            value,
            left: None,
            right: None,
            parent: None,
        }
    }

    /// Left child.
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// Right child.
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Parent (non-owning).
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn child_mut(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

// ============================================================================
// Orderings
// ============================================================================

/// Ordering and insertion strategy installed into a [`Tree`].
///
/// `compare(a, b) == Less` means `a` belongs before `b`: to the left in a
/// search tree, closer to the root in a heap.
pub trait TreeOrder: Copy + fmt::Debug {
    /// Human readable variant name.
    fn name(&self) -> &'static str;

    /// Compare two keys of the same kind.
    fn compare(&self, a: &Key, b: &Key) -> Ordering;

    /// Link the detached node `node` into `tree`.
    fn link<V>(&self, tree: &mut Tree<V, Self>, node: NodeId);

    /// Find a node holding `key`.
    fn search<V>(&self, tree: &Tree<V, Self>, key: &Key) -> Option<NodeId> {
        tree.scan(key)
    }
}

/// No ordering: nodes fill the tree level by level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unordered;

impl TreeOrder for Unordered {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn compare(&self, a: &Key, b: &Key) -> Ordering {
        a.compare(b).unwrap_or(Ordering::Equal)
    }

    fn link<V>(&self, tree: &mut Tree<V, Self>, node: NodeId) {
        tree.place_level_order(node);
    }
}

/// Binary search tree ordering by key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOrder;

impl TreeOrder for SearchOrder {
    fn name(&self) -> &'static str {
        "binary search tree"
    }

    fn compare(&self, a: &Key, b: &Key) -> Ordering {
        a.compare(b).unwrap_or(Ordering::Equal)
    }

    fn link<V>(&self, tree: &mut Tree<V, Self>, node: NodeId) {
        tree.place_ordered(node);
    }

    fn search<V>(&self, tree: &Tree<V, Self>, key: &Key) -> Option<NodeId> {
        let mut cursor = tree.root;
        while let Some(id) = cursor {
            let current = &tree.nodes[id.0];
            cursor = match self.compare(key, &current.key) {
                Ordering::Equal => return Some(id),
                Ordering::Less => current.left,
                Ordering::Greater => current.right,
            };
        }
        None
    }
}

/// Heap ordering: the root holds the largest (`Max`) or smallest (`Min`) key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeapOrder {
    /// Largest key at the root.
    #[default]
    Max,
    /// Smallest key at the root.
    Min,
}

impl TreeOrder for HeapOrder {
    fn name(&self) -> &'static str {
        match self {
            HeapOrder::Max => "max heap",
            HeapOrder::Min => "min heap",
        }
    }

    fn compare(&self, a: &Key, b: &Key) -> Ordering {
        let natural = a.compare(b).unwrap_or(Ordering::Equal);
        match self {
            HeapOrder::Max => natural.reverse(),
            HeapOrder::Min => natural,
        }
    }

    fn link<V>(&self, tree: &mut Tree<V, Self>, node: NodeId) {
        tree.place_level_order(node);
        tree.sift_up(node);
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Unordered tree filled level by level.
pub type GenericTree<V> = Tree<V, Unordered>;

/// Binary search tree.
pub type SearchTree<V> = Tree<V, SearchOrder>;

/// Binary heap over linked nodes.
pub type Heap<V> = Tree<V, HeapOrder>;

/// Binary tree of [`TreeNode`]s.
#[derive(Debug, Clone)]
pub struct Tree<V, O: TreeOrder = Unordered> {
    nodes: Slab<TreeNode<V>>,
    root: Option<NodeId>,
    order: O,
    key_kind: Option<KeyKind>,
    /// Nodes reachable from the root.
    linked: usize,
    /// Whether the linked nodes form a complete tree filled in level order.
    complete: bool,
}

impl<V> Tree<V, Unordered> {
    /// Create an empty unordered tree.
    pub fn new() -> Self {
        Self::with_order(Unordered)
    }
}

impl<V> Default for Tree<V, Unordered> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Tree<V, SearchOrder> {
    /// Create an empty binary search tree.
    pub fn binary_search() -> Self {
        Self::with_order(SearchOrder)
    }
}

impl<V> Tree<V, HeapOrder> {
    /// Create an empty heap.
    pub fn heap(order: HeapOrder) -> Self {
        Self::with_order(order)
    }

    /// Create an empty max-heap.
    pub fn max_heap() -> Self {
        Self::with_order(HeapOrder::Max)
    }

    /// Create an empty min-heap.
    pub fn min_heap() -> Self {
        Self::with_order(HeapOrder::Min)
    }

    /// The top of the heap.
    pub fn peek(&self) -> Option<&TreeNode<V>> {
        self.root.map(|id| &self.nodes[id.0])
    }

    /// Remove the top of the heap and return its key and value.
    pub fn pop_root(&mut self) -> Option<(Key, V)> {
        let root = self.root?;
        let last = self.last_linked()?;
        self.swap_payloads(root, last);
        self.detach(last).ok()?;
        let node = self.nodes.remove(last.0);
        if let Some(root) = self.root {
            self.sift_down(root);
        }
        Some((node.key, node.value))
    }
}

impl<V, O: TreeOrder> Tree<V, O> {
    /// Create an empty tree with the given ordering.
    pub fn with_order(order: O) -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
            order,
            key_kind: None,
            linked: 0,
            complete: true,
        }
    }

    /// The installed ordering.
    pub fn order(&self) -> O {
        self.order
    }

    /// Root node handle.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes reachable from the root.
    pub fn linked_len(&self) -> usize {
        self.linked
    }

    /// Node by handle.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode<V>> {
        self.nodes.get(id.0)
    }

    /// Mutable access to a node's value. Keys are not exposed mutably.
    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut V> {
        self.nodes.get_mut(id.0).map(|node| &mut node.value)
    }

    /// Allocate a detached node.
    ///
    /// Fails when `key` is of a different kind than the keys already stored.
    pub fn create(&mut self, key: impl Into<Key>, value: V) -> ContainerResult<NodeId> {
        let key = key.into();
        match self.key_kind {
            Some(expected) if expected != key.kind() => {
                return Err(ContainerError::KeyKindMismatch {
                    expected,
                    got: key.kind(),
                });
            }
            Some(_) => {}
            None => self.key_kind = Some(key.kind()),
        }
        Ok(NodeId(self.nodes.insert(TreeNode::new(key, value))))
    }

    /// Link a detached leaf using the installed ordering.
    pub fn add(&mut self, id: NodeId) -> ContainerResult<()> {
        self.require_detached(id)?;
        if !self.is_leaf(id) {
            return Err(ContainerError::NodeAttached(id));
        }
        let order = self.order;
        order.link(self, id);
        Ok(())
    }

    /// Create a node and link it.
    pub fn insert(&mut self, key: impl Into<Key>, value: V) -> ContainerResult<NodeId> {
        let id = self.create(key, value)?;
        self.add(id)?;
        Ok(id)
    }

    /// Find a node holding `key`.
    pub fn search(&self, key: &Key) -> Option<NodeId> {
        self.order.search(self, key)
    }

    /// Attach detached `child` as the left child of `parent`.
    pub fn add_left_child(&mut self, parent: NodeId, child: NodeId) -> ContainerResult<()> {
        self.attach(parent, child, Side::Left)
    }

    /// Attach detached `child` as the right child of `parent`.
    pub fn add_right_child(&mut self, parent: NodeId, child: NodeId) -> ContainerResult<()> {
        self.attach(parent, child, Side::Right)
    }

    /// Exchange the keys and values of two nodes; links stay in place.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> ContainerResult<()> {
        self.node(a)?;
        self.node(b)?;
        self.swap_payloads(a, b);
        Ok(())
    }

    /// Cut `id` and its subtree away from its parent.
    ///
    /// Detaching the root empties the tree. Detaching an already detached
    /// node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> ContainerResult<()> {
        let parent = self.node(id)?.parent;
        let in_tree = self.root.is_some() && self.root_of(id) == self.root;
        if self.root == Some(id) {
            self.root = None;
            self.linked = 0;
            self.complete = true;
            return Ok(());
        }
        let Some(parent) = parent else {
            return Ok(());
        };
        let size = self.size(id);
        let was_last = in_tree && self.last_linked() == Some(id);
        let parent_node = &mut self.nodes[parent.0];
        if parent_node.left == Some(id) {
            parent_node.left = None;
        } else {
            parent_node.right = None;
        }
        self.nodes[id.0].parent = None;
        if in_tree {
            self.linked -= size;
            // Removing the last level-order node keeps the tree complete.
            self.complete = self.complete && size == 1 && was_last;
        }
        Ok(())
    }

    /// Release a detached node, returning it.
    pub fn free(&mut self, id: NodeId) -> ContainerResult<TreeNode<V>> {
        self.require_detached(id)?;
        let node = self.node(id)?;
        if node.left.is_some() || node.right.is_some() {
            return Err(ContainerError::NodeAttached(id));
        }
        Ok(self.nodes.remove(id.0))
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.linked = 0;
        self.complete = true;
        self.key_kind = None;
    }

    // ========================================================================
    // Node queries
    // ========================================================================

    /// Number of nodes in the subtree rooted at `id` (0 for a stale handle).
    pub fn size(&self, id: NodeId) -> usize {
        if !self.nodes.contains(id.0) {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            count += 1;
            let node = &self.nodes[current.0];
            stack.extend(node.left);
            stack.extend(node.right);
        }
        count
    }

    /// Edges on the longest downward path from `id` (a leaf has height 0).
    pub fn height(&self, id: NodeId) -> usize {
        if !self.nodes.contains(id.0) {
            return 0;
        }
        let mut height = 0;
        let mut stack = vec![(id, 0)];
        while let Some((current, level)) = stack.pop() {
            height = height.max(level);
            let node = &self.nodes[current.0];
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, level + 1));
            }
        }
        height
    }

    /// Edges from `id` up to the top of its tree.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.nodes.get(id.0).and_then(|n| n.parent);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Whether `id` has no parent.
    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.parent.is_none())
    }

    /// Whether `id` has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .is_some_and(|n| n.left.is_none() && n.right.is_none())
    }

    /// Whether `id` is its parent's left child.
    pub fn is_left_child(&self, id: NodeId) -> bool {
        self.side_of(id) == Some(Side::Left)
    }

    /// Whether `id` is its parent's right child.
    pub fn is_right_child(&self, id: NodeId) -> bool {
        self.side_of(id) == Some(Side::Right)
    }

    /// Whether `id` has a left child.
    pub fn has_left_child(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.left.is_some())
    }

    /// Whether `id` has a right child.
    pub fn has_right_child(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.right.is_some())
    }

    /// Compare the keys of two nodes under the installed ordering.
    pub fn compare(&self, a: NodeId, b: NodeId) -> ContainerResult<Ordering> {
        Ok(self.order.compare(&self.node(a)?.key, &self.node(b)?.key))
    }

    /// Whether `a` orders at or before `b`.
    pub fn lte(&self, a: NodeId, b: NodeId) -> ContainerResult<bool> {
        Ok(self.compare(a, b)? != Ordering::Greater)
    }

    // ========================================================================
    // Traversals
    // ========================================================================

    /// Left, node, right.
    pub fn in_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.linked);
        let mut stack = Vec::new();
        let mut cursor = self.root;
        while cursor.is_some() || !stack.is_empty() {
            while let Some(id) = cursor {
                stack.push(id);
                cursor = self.nodes[id.0].left;
            }
            if let Some(id) = stack.pop() {
                out.push(id);
                cursor = self.nodes[id.0].right;
            }
        }
        out
    }

    /// Node, left, right.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.linked);
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = &self.nodes[id.0];
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }

    /// Breadth first, left to right.
    pub fn level_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.linked);
        let mut queue: VecDeque<NodeId> = self.root.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            out.push(id);
            let node = &self.nodes[id.0];
            queue.extend(node.left);
            queue.extend(node.right);
        }
        out
    }

    /// Keys in in-order sequence.
    pub fn keys_in_order(&self) -> Vec<Key> {
        self.in_order()
            .into_iter()
            .map(|id| self.nodes[id.0].key.clone())
            .collect()
    }

    // ========================================================================
    // Placement plumbing
    // ========================================================================

    fn node(&self, id: NodeId) -> ContainerResult<&TreeNode<V>> {
        self.nodes.get(id.0).ok_or(ContainerError::InvalidNode(id))
    }

    fn require_detached(&self, id: NodeId) -> ContainerResult<()> {
        let node = self.node(id)?;
        if node.parent.is_some() || self.root == Some(id) {
            return Err(ContainerError::NodeAttached(id));
        }
        Ok(())
    }

    fn side_of(&self, id: NodeId) -> Option<Side> {
        let parent = self.nodes.get(id.0)?.parent?;
        let parent = &self.nodes[parent.0];
        if parent.left == Some(id) {
            Some(Side::Left)
        } else {
            Some(Side::Right)
        }
    }

    fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        while let Some(parent) = self.nodes.get(current.0)?.parent {
            current = parent;
        }
        Some(current)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, side: Side) -> ContainerResult<()> {
        self.node(parent)?;
        self.require_detached(child)?;
        if parent == child || self.root_of(parent) == Some(child) {
            return Err(ContainerError::NodeAttached(child));
        }
        if self.nodes[parent.0].child(side).is_some() {
            return Err(ContainerError::SlotOccupied(parent));
        }
        let in_tree = self.root.is_some() && self.root_of(parent) == self.root;
        let size = self.size(child);
        self.link_child(parent, child, side);
        if in_tree {
            self.linked += size;
            self.complete = false;
        }
        Ok(())
    }

    fn link_child(&mut self, parent: NodeId, child: NodeId, side: Side) {
        *self.nodes[parent.0].child_mut(side) = Some(child);
        self.nodes[child.0].parent = Some(parent);
    }

    fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
        self.linked = self.size(id);
        self.complete = self.linked == 1;
    }

    /// Follow the level-order position `position` (1-based) down from the
    /// root; returns the parent and side of that position.
    fn slot_for_position(&self, position: usize) -> Option<(NodeId, Side)> {
        let root = self.root?;
        let bits = usize::BITS - position.leading_zeros();
        let mut current = root;
        for shift in (1..bits - 1).rev() {
            let node = &self.nodes[current.0];
            current = if position >> shift & 1 == 0 {
                node.left?
            } else {
                node.right?
            };
        }
        let side = if position & 1 == 0 { Side::Left } else { Side::Right };
        Some((current, side))
    }

    /// First node in level order with a free child slot.
    fn first_open_slot(&self) -> Option<(NodeId, Side)> {
        self.level_order().into_iter().find_map(|id| {
            let node = &self.nodes[id.0];
            match (node.left, node.right) {
                (None, _) => Some((id, Side::Left)),
                (Some(_), None) => Some((id, Side::Right)),
                _ => None,
            }
        })
    }

    /// Last node in level order.
    fn last_linked(&self) -> Option<NodeId> {
        if self.complete {
            if self.linked <= 1 {
                return self.root;
            }
            let (parent, side) = self.slot_for_position(self.linked)?;
            self.nodes[parent.0].child(side)
        } else {
            self.level_order().last().copied()
        }
    }

    pub(crate) fn place_level_order(&mut self, id: NodeId) {
        if self.root.is_none() {
            self.set_root(id);
            return;
        }
        let slot = if self.complete {
            self.slot_for_position(self.linked + 1)
        } else {
            self.first_open_slot()
        };
        if let Some((parent, side)) = slot {
            self.link_child(parent, id, side);
            self.linked += 1;
        }
    }

    pub(crate) fn place_ordered(&mut self, id: NodeId) {
        let Some(mut current) = self.root else {
            self.set_root(id);
            return;
        };
        loop {
            let side = match self
                .order
                .compare(&self.nodes[id.0].key, &self.nodes[current.0].key)
            {
                Ordering::Less => Side::Left,
                _ => Side::Right,
            };
            match self.nodes[current.0].child(side) {
                Some(next) => current = next,
                None => {
                    self.link_child(current, id, side);
                    self.linked += 1;
                    self.complete = false;
                    return;
                }
            }
        }
    }

    pub(crate) fn sift_up(&mut self, mut id: NodeId) {
        while let Some(parent) = self.nodes[id.0].parent {
            if self.order.compare(&self.nodes[id.0].key, &self.nodes[parent.0].key)
                != Ordering::Less
            {
                break;
            }
            self.swap_payloads(id, parent);
            id = parent;
        }
    }

    pub(crate) fn sift_down(&mut self, mut id: NodeId) {
        loop {
            let node = &self.nodes[id.0];
            let mut best = id;
            for child in [node.left, node.right].into_iter().flatten() {
                if self.order.compare(&self.nodes[child.0].key, &self.nodes[best.0].key)
                    == Ordering::Less
                {
                    best = child;
                }
            }
            if best == id {
                return;
            }
            self.swap_payloads(id, best);
            id = best;
        }
    }

    /// Exchange keys and values of two distinct live nodes.
    fn swap_payloads(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        if let Some((first, second)) = self.nodes.get2_mut(a.0, b.0) {
            std::mem::swap(&mut first.key, &mut second.key);
            std::mem::swap(&mut first.value, &mut second.value);
        }
    }

    /// First node in pre-order whose key equals `key`.
    fn scan(&self, key: &Key) -> Option<NodeId> {
        self.pre_order()
            .into_iter()
            .find(|id| self.nodes[id.0].key.compare(key) == Some(Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_heap_invariant<V>(heap: &Heap<V>) {
        for id in heap.level_order() {
            let node = heap.get(id).unwrap();
            for child in [node.left(), node.right()].into_iter().flatten() {
                assert!(heap.lte(id, child).unwrap(), "heap order broken at {}", id);
            }
        }
    }

    #[test]
    fn test_search_tree_in_order() {
        let mut tree = SearchTree::binary_search();
        for k in [5, 3, 8, 1, 4] {
            tree.insert(k, ()).unwrap();
        }
        let keys: Vec<i64> = tree.keys_in_order().iter().filter_map(Key::as_int).collect();
        assert_eq!(keys, vec![1, 3, 4, 5, 8]);
        assert_eq!(tree.height(tree.root().unwrap()), 2);
    }

    #[test]
    fn test_search_tree_lookup() {
        let mut tree = SearchTree::binary_search();
        for k in [5, 3, 8, 1, 4] {
            tree.insert(k, k * 10).unwrap();
        }
        let found = tree.search(&Key::Int(4)).unwrap();
        assert_eq!(tree.get(found).unwrap().value, 40);
        assert!(tree.is_leaf(found));
        assert!(tree.is_right_child(found));
        assert_eq!(tree.depth(found), 2);
        assert!(tree.search(&Key::Int(7)).is_none());
    }

    #[test]
    fn test_duplicate_keys_go_right() {
        let mut tree = SearchTree::binary_search();
        let first = tree.insert(2, "a").unwrap();
        let second = tree.insert(2, "b").unwrap();
        assert_eq!(tree.get(first).unwrap().right(), Some(second));
    }

    #[test]
    fn test_mixed_key_kinds_are_rejected() {
        let mut tree = SearchTree::binary_search();
        tree.insert(1, ()).unwrap();
        assert_eq!(
            tree.insert("one", ()),
            Err(ContainerError::KeyKindMismatch {
                expected: KeyKind::Int,
                got: KeyKind::Str,
            })
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_generic_tree_fills_level_order() {
        let mut tree = GenericTree::new();
        let ids: Vec<_> = (0..6).map(|k| tree.insert(k, ()).unwrap()).collect();
        assert_eq!(tree.level_order(), ids);
        assert_eq!(tree.get(ids[2]).unwrap().left(), Some(ids[5]));
        assert!(tree.is_root(ids[0]));
        assert!(tree.has_left_child(ids[2]) && !tree.has_right_child(ids[2]));
        assert_eq!(tree.size(ids[1]), 3);
    }

    #[test]
    fn test_heap_root_is_extremum() {
        let mut heap = Heap::max_heap();
        for k in [3, 9, 1, 7, 5] {
            heap.insert(k, ()).unwrap();
        }
        assert_eq!(heap.peek().map(|n| n.key.clone()), Some(Key::Int(9)));
        assert_heap_invariant(&heap);

        let drained: Vec<i64> = std::iter::from_fn(|| heap.pop_root())
            .filter_map(|(k, _)| k.as_int())
            .collect();
        assert_eq!(drained, vec![9, 7, 5, 3, 1]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_min_heap_with_float_keys() {
        let mut heap = Heap::min_heap();
        for k in [0.5f32, -1.0, 2.0] {
            heap.insert(k, k).unwrap();
        }
        assert_eq!(heap.pop_root().map(|(_, v)| v), Some(-1.0));
        assert_eq!(heap.pop_root().map(|(_, v)| v), Some(0.5));
    }

    #[test]
    fn test_free_requires_detached_node() {
        let mut tree = GenericTree::new();
        let root = tree.insert(0, ()).unwrap();
        let child = tree.insert(1, ()).unwrap();

        assert_eq!(tree.free(child), Err(ContainerError::NodeAttached(child)));
        assert_eq!(tree.free(root), Err(ContainerError::NodeAttached(root)));

        tree.detach(child).unwrap();
        assert!(tree.is_leaf(root));
        assert_eq!(tree.linked_len(), 1);
        assert!(tree.free(child).is_ok());
        assert_eq!(tree.free(child), Err(ContainerError::InvalidNode(child)));
        assert!(tree.get(root).is_some());
    }

    #[test]
    fn test_manual_children() {
        let mut tree = GenericTree::new();
        let root = tree.insert(0, ()).unwrap();
        let a = tree.create(1, ()).unwrap();
        let b = tree.create(2, ()).unwrap();
        tree.add_right_child(root, a).unwrap();
        assert_eq!(tree.add_right_child(root, b), Err(ContainerError::SlotOccupied(root)));
        assert_eq!(tree.add_left_child(root, a), Err(ContainerError::NodeAttached(a)));
        tree.add_left_child(root, b).unwrap();
        assert!(tree.is_left_child(b) && tree.is_right_child(a));
        assert_eq!(tree.linked_len(), 3);

        // The tree is no longer known to be complete; placement falls back to a scan.
        let c = tree.insert(3, ()).unwrap();
        assert_eq!(tree.get(b).unwrap().left(), Some(c));
    }

    #[test]
    fn test_swap_exchanges_payloads() {
        let mut tree = GenericTree::new();
        let a = tree.insert(1, "a").unwrap();
        let b = tree.insert(2, "b").unwrap();
        tree.swap(a, b).unwrap();
        assert_eq!(tree.get(a).unwrap().value, "b");
        assert_eq!(tree.get(b).unwrap().key, Key::Int(1));
        assert!(tree.is_root(a));
    }

    #[test]
    fn test_swap_rejects_stale_handle() {
        let mut tree = GenericTree::new();
        let a = tree.insert(1, "a").unwrap();
        let gone = NodeId(99);
        assert_eq!(tree.swap(a, gone), Err(ContainerError::InvalidNode(gone)));
        assert_eq!(tree.swap(gone, a), Err(ContainerError::InvalidNode(gone)));
        assert_eq!(tree.get(a).unwrap().value, "a");
    }

    #[test]
    fn test_unordered_search_scans() {
        let mut tree = GenericTree::new();
        let ids: Vec<_> = (0..6).map(|k| tree.insert(k, k * 2).unwrap()).collect();
        let found = tree.search(&Key::Int(4)).unwrap();
        assert_eq!(found, ids[4]);
        assert_eq!(tree.get(found).unwrap().value, 8);
        assert!(tree.search(&Key::Int(42)).is_none());
        assert!(tree.search(&Key::Str("4".into())).is_none());
    }

    #[test]
    fn test_heap_search_scans() {
        let mut heap = Heap::min_heap();
        for k in [4, 2, 6, 1] {
            heap.insert(k, k * 10).unwrap();
        }
        let found = heap.search(&Key::Int(6)).unwrap();
        assert_eq!(heap.get(found).unwrap().value, 60);
        assert!(heap.search(&Key::Int(5)).is_none());
    }

    #[test]
    fn test_detach_internal_heap_subtree() {
        let mut heap = Heap::max_heap();
        for k in 1..=7 {
            heap.insert(k, ()).unwrap();
        }
        let root = heap.root().unwrap();
        let cut = heap.get(root).unwrap().left().unwrap();
        assert_eq!(heap.size(cut), 3);
        let cut_keys: Vec<i64> = [cut]
            .into_iter()
            .chain(heap.get(cut).unwrap().left())
            .chain(heap.get(cut).unwrap().right())
            .filter_map(|id| heap.get(id).unwrap().key.as_int())
            .collect();

        heap.detach(cut).unwrap();
        assert_eq!(heap.linked_len(), 4);
        assert!(heap.is_root(cut));
        assert_eq!(heap.size(cut), 3);

        heap.insert(100, ()).unwrap();
        assert_eq!(heap.linked_len(), 5);
        assert_eq!(heap.peek().map(|n| n.key.clone()), Some(Key::Int(100)));
        assert_heap_invariant(&heap);

        let mut expected: Vec<i64> = (1..=7).filter(|k| !cut_keys.contains(k)).collect();
        expected.push(100);
        expected.sort_unstable_by(|a, b| b.cmp(a));
        let drained: Vec<i64> = std::iter::from_fn(|| heap.pop_root())
            .filter_map(|(k, _)| k.as_int())
            .collect();
        assert_eq!(drained, expected);
        assert_eq!(heap.linked_len(), 0);
        assert_eq!(heap.len(), 3);
        assert!(heap.search(&Key::Int(100)).is_none());
    }

    proptest! {
        #[test]
        fn prop_heap_invariant_holds(keys in proptest::collection::vec(-1000i64..1000, 0..64)) {
            let mut heap = Heap::max_heap();
            for k in &keys {
                heap.insert(*k, ()).unwrap();
                assert_heap_invariant(&heap);
            }
            prop_assert_eq!(heap.linked_len(), keys.len());
            let mut sorted = keys.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            let drained: Vec<i64> = std::iter::from_fn(|| heap.pop_root())
                .filter_map(|(k, _)| k.as_int())
                .collect();
            prop_assert_eq!(drained, sorted);
        }

        #[test]
        fn prop_search_tree_sorts(keys in proptest::collection::vec(-50i64..50, 0..48)) {
            let mut tree = SearchTree::binary_search();
            for k in &keys {
                tree.insert(*k, ()).unwrap();
            }
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            let in_order: Vec<i64> = tree.keys_in_order().iter().filter_map(Key::as_int).collect();
            prop_assert_eq!(in_order, sorted);
        }
    }
}

//! Index-addressed doubly linked list.
//!
//! Nodes live in a slab arena owned by the list; `prev`/`next` are arena
//! slots rather than pointers, so unlinking never leaves a dangling link.
//!
//! # Link Invariant
//!
//! For every linked node `n`: `n.prev.next == n` and `n.next.prev == n`
//! whenever both neighbours exist. `first`/`last` are `None` iff the list is
//! empty. Every public operation restores both before returning.

use crate::core::error::{ContainerError, ContainerResult};
use crate::structs::key::Key;
use slab::Slab;

/// A list entry: a key, an owned value and its neighbour links.
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode<V> {
    /// Key of the entry.
    pub key: Key,
    /// Payload.
    pub value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<V> ListNode<V> {
    /// Create a detached node.
    pub fn new(key: impl Into<Key>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            prev: None,
            next: None,
        }
    }

    /// Whether the node carries no links.
    ///
    /// Always true for nodes handed out by `pop`.
    pub fn is_detached(&self) -> bool {
        self.prev.is_none() && self.next.is_none()
    }

    /// Consume the node, returning its value.
    pub fn into_value(self) -> V {
        self.value
    }
}

/// Doubly linked sequence addressed by integer position.
///
/// Positional lookups walk the chain from the first node, so `get` is O(n).
#[derive(Debug, Clone)]
pub struct LinkedList<V> {
    nodes: Slab<ListNode<V>>,
    first: Option<usize>,
    last: Option<usize>,
    count: usize,
}

impl<V> Default for LinkedList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LinkedList<V> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            first: None,
            last: None,
            count: 0,
        }
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The first node.
    pub fn first(&self) -> Option<&ListNode<V>> {
        self.first.map(|slot| &self.nodes[slot])
    }

    /// The last node.
    pub fn last(&self) -> Option<&ListNode<V>> {
        self.last.map(|slot| &self.nodes[slot])
    }

    /// Node at position `idx`, or `None` when `idx >= len()`.
    pub fn get(&self, idx: usize) -> Option<&ListNode<V>> {
        self.slot_at(idx).map(|slot| &self.nodes[slot])
    }

    /// Mutable node at position `idx`.
    ///
    /// Links are not reachable through the returned reference.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut ListNode<V>> {
        let slot = self.slot_at(idx)?;
        Some(&mut self.nodes[slot])
    }

    /// Link `node` after the current last node.
    pub fn append(&mut self, node: ListNode<V>) {
        let slot = self.nodes.insert(ListNode {
            prev: self.last,
            next: None,
            ..node
        });
        match self.last {
            Some(last) => self.nodes[last].next = Some(slot),
            None => self.first = Some(slot),
        }
        self.last = Some(slot);
        self.count += 1;
    }

    /// Link `node` before position `idx`.
    ///
    /// An `idx` at or past the end degrades to [`append`](Self::append).
    pub fn insert(&mut self, node: ListNode<V>, idx: usize) {
        match self.slot_at(idx) {
            Some(before) => {
                self.link_before(before, node);
            }
            None => self.append(node),
        }
    }

    /// Unlink and drop the node at `idx`.
    pub fn remove(&mut self, idx: usize) -> ContainerResult<()> {
        let slot = self.slot_at(idx).ok_or(ContainerError::LookupMiss {
            index: idx,
            len: self.count,
        })?;
        drop(self.unlink(slot));
        Ok(())
    }

    /// Unlink the node at `idx` and hand it to the caller.
    ///
    /// The returned node is detached. Returns `None` when `idx >= len()`.
    pub fn pop(&mut self, idx: usize) -> Option<ListNode<V>> {
        let slot = self.slot_at(idx)?;
        Some(self.unlink(slot))
    }

    /// Iterate nodes front to back.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.first,
            remaining: self.count,
        }
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.first = None;
        self.last = None;
        self.count = 0;
    }

    // ========================================================================
    // Chain plumbing
    // ========================================================================

    /// Arena slot of the node at position `idx`.
    pub(crate) fn slot_at(&self, idx: usize) -> Option<usize> {
        if idx >= self.count {
            return None;
        }
        let mut cursor = self.first;
        for _ in 0..idx {
            cursor = cursor.and_then(|slot| self.nodes[slot].next);
        }
        cursor
    }

    /// Arena slot of the first node whose key satisfies `pred`.
    pub(crate) fn find_slot(&self, mut pred: impl FnMut(&Key) -> bool) -> Option<usize> {
        let mut cursor = self.first;
        while let Some(slot) = cursor {
            let node = &self.nodes[slot];
            if pred(&node.key) {
                return Some(slot);
            }
            cursor = node.next;
        }
        None
    }

    pub(crate) fn node(&self, slot: usize) -> &ListNode<V> {
        &self.nodes[slot]
    }

    pub(crate) fn node_mut(&mut self, slot: usize) -> &mut ListNode<V> {
        &mut self.nodes[slot]
    }

    /// Link `node` immediately before `before`, returning its slot.
    pub(crate) fn link_before(&mut self, before: usize, node: ListNode<V>) -> usize {
        let prev = self.nodes[before].prev;
        let slot = self.nodes.insert(ListNode {
            prev,
            next: Some(before),
            ..node
        });
        self.nodes[before].prev = Some(slot);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(slot),
            None => self.first = Some(slot),
        }
        self.count += 1;
        slot
    }

    /// Remove the node at `slot` from the chain and the arena.
    fn unlink(&mut self, slot: usize) -> ListNode<V> {
        let mut node = self.nodes.remove(slot);
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.first = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.last = node.prev,
        }
        node.prev = None;
        node.next = None;
        self.count -= 1;
        node
    }
}

/// Front-to-back iterator over list nodes.
pub struct Iter<'a, V> {
    list: &'a LinkedList<V>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a ListNode<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = &self.list.nodes[slot];
        self.cursor = node.next;
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a LinkedList<V> {
    type Item = &'a ListNode<V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &LinkedList<i32>) -> Vec<i32> {
        list.iter().map(|n| n.value).collect()
    }

    fn assert_links(list: &LinkedList<i32>) {
        let mut prev = None;
        let mut cursor = list.first;
        let mut seen = 0;
        while let Some(slot) = cursor {
            assert_eq!(list.nodes[slot].prev, prev);
            prev = Some(slot);
            cursor = list.nodes[slot].next;
            seen += 1;
        }
        assert_eq!(list.last, prev);
        assert_eq!(seen, list.len());
        assert_eq!(list.first.is_none(), list.is_empty());
    }

    #[test]
    fn test_append_on_empty_sets_both_ends() {
        let mut list = LinkedList::new();
        list.append(ListNode::new(0, 7));
        assert_eq!(list.first().map(|n| n.value), Some(7));
        assert_eq!(list.last().map(|n| n.value), Some(7));
        assert_links(&list);
    }

    #[test]
    fn test_insert_positions() {
        let mut list = LinkedList::new();
        for v in [1, 2, 3] {
            list.append(ListNode::new(0, v));
        }
        list.insert(ListNode::new(0, 0), 0);
        list.insert(ListNode::new(0, 9), 2);
        list.insert(ListNode::new(0, 4), 99);
        assert_eq!(values(&list), vec![0, 1, 9, 2, 3, 4]);
        assert_links(&list);
    }

    #[test]
    fn test_remove_first_middle_last() {
        let mut list = LinkedList::new();
        for v in 0..5 {
            list.append(ListNode::new(0, v));
        }
        list.remove(2).unwrap();
        list.remove(0).unwrap();
        list.remove(2).unwrap();
        assert_eq!(values(&list), vec![1, 3]);
        assert_links(&list);
    }

    #[test]
    fn test_out_of_range_is_a_miss() {
        let mut list: LinkedList<i32> = LinkedList::new();
        assert_eq!(
            list.remove(0),
            Err(ContainerError::LookupMiss { index: 0, len: 0 })
        );
        assert!(list.pop(0).is_none());
        assert!(list.get(0).is_none());

        list.append(ListNode::new(0, 1));
        assert!(list.remove(1).is_err());
        assert!(list.pop(5).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_pop_hands_back_detached_node() {
        let mut list = LinkedList::new();
        for v in 0..3 {
            list.append(ListNode::new(0, v));
        }
        let node = list.pop(1).unwrap();
        assert!(node.is_detached());
        assert_eq!(node.into_value(), 1);
        assert_eq!(values(&list), vec![0, 2]);
        assert_links(&list);
    }

    #[test]
    fn test_drain_from_front() {
        let mut list = LinkedList::new();
        for v in 0..10 {
            list.append(ListNode::new(0, v));
        }
        for _ in 0..10 {
            list.remove(0).unwrap();
        }
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert!(list.last().is_none());
    }

    #[test]
    fn test_get_mut_updates_value() {
        let mut list = LinkedList::new();
        list.append(ListNode::new(0, 1));
        list.get_mut(0).unwrap().value = 5;
        assert_eq!(values(&list), vec![5]);
    }
}

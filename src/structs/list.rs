//! Key-addressed list with auto-assigned positional keys.
//!
//! `List` layers key dispatch over [`LinkedList`]: a [`Key::Int`] addresses
//! a position, a [`Key::Str`] addresses a node by name, and [`Key::Float`]
//! lookups are reserved and always miss.
//!
//! # Positional Keys
//!
//! `append` and `insert` stamp integer-keyed nodes with their ordinal
//! position at the time of insertion. Nodes further down the chain are not
//! renumbered afterwards, so after an `insert` or `remove` the stored keys of
//! trailing nodes can lag their actual position. Positional `get` never reads
//! the stored key, it always walks the chain.

use crate::core::error::ContainerResult;
use crate::structs::key::Key;
use crate::structs::linked_list::{Iter, LinkedList, ListNode};

/// Doubly linked sequence addressed by [`Key`].
#[derive(Debug, Clone)]
pub struct List<V> {
    chain: LinkedList<V>,
}

impl<V> Default for List<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> List<V> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            chain: LinkedList::new(),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` if the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// The first node.
    pub fn first(&self) -> Option<&ListNode<V>> {
        self.chain.first()
    }

    /// The last node.
    pub fn last(&self) -> Option<&ListNode<V>> {
        self.chain.last()
    }

    /// Look a node up by key.
    pub fn get(&self, key: &Key) -> Option<&ListNode<V>> {
        match key {
            Key::Int(i) => usize::try_from(*i).ok().and_then(|i| self.get_index(i)),
            Key::Str(name) => self.get_key(name),
            Key::Float(value) => self.get_float(*value),
        }
    }

    /// Node at position `idx`, walking from the first node.
    pub fn get_index(&self, idx: usize) -> Option<&ListNode<V>> {
        self.chain.get(idx)
    }

    /// Mutable node at position `idx`.
    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut ListNode<V>> {
        self.chain.get_mut(idx)
    }

    /// First node whose key is the string `name`.
    pub fn get_key(&self, name: &str) -> Option<&ListNode<V>> {
        let slot = self.chain.find_slot(|key| key.as_str() == Some(name))?;
        Some(self.chain.node(slot))
    }

    /// Float-keyed lookup is reserved; it never returns a node.
    fn get_float(&self, _value: f32) -> Option<&ListNode<V>> {
        None
    }

    /// Link `node` at the end.
    ///
    /// Integer keys are overwritten with the node's position.
    pub fn append(&mut self, mut node: ListNode<V>) {
        if node.key.as_int().is_some() {
            node.key = Key::Int(self.len() as i64);
        }
        self.chain.append(node);
    }

    /// Link `node` before position `idx`; `idx >= len()` appends.
    ///
    /// The new node takes key `idx` and the node it displaced takes
    /// `idx + 1` (integer keys only). Later nodes keep their keys.
    pub fn insert(&mut self, mut node: ListNode<V>, idx: usize) {
        let Some(before) = self.chain.slot_at(idx) else {
            self.append(node);
            return;
        };
        if node.key.as_int().is_some() {
            node.key = Key::Int(idx as i64);
        }
        let displaced = self.chain.node_mut(before);
        if displaced.key.as_int().is_some() {
            displaced.key = Key::Int(idx as i64 + 1);
        }
        self.chain.link_before(before, node);
    }

    /// Unlink and drop the node at `idx`.
    pub fn remove(&mut self, idx: usize) -> ContainerResult<()> {
        self.chain.remove(idx)
    }

    /// Unlink the node at `idx` and hand it to the caller.
    pub fn pop(&mut self, idx: usize) -> Option<ListNode<V>> {
        self.chain.pop(idx)
    }

    /// Iterate nodes front to back.
    pub fn iter(&self) -> Iter<'_, V> {
        self.chain.iter()
    }

    /// Stored keys, front to back.
    pub fn keys(&self) -> Vec<Key> {
        self.iter().map(|node| node.key.clone()).collect()
    }
}

impl<V> FromIterator<V> for List<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut list = List::new();
        for value in iter {
            list.append(ListNode::new(0, value));
        }
        list
    }
}

impl<'a, V> IntoIterator for &'a List<V> {
    type Item = &'a ListNode<V>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(list: &List<&str>) -> Vec<i64> {
        list.keys().iter().filter_map(Key::as_int).collect()
    }

    #[test]
    fn test_append_assigns_positions() {
        let mut list = List::new();
        for v in ["a", "b", "c"] {
            list.append(ListNode::new(99, v));
        }
        assert_eq!(ints(&list), vec![0, 1, 2]);
        assert_eq!(list.get(&Key::Int(1)).map(|n| n.value), Some("b"));
    }

    #[test]
    fn test_named_nodes_keep_their_key() {
        let mut list = List::new();
        list.append(ListNode::new(0, 1.0));
        list.append(ListNode::new("peak", 2.0));
        assert_eq!(list.get(&Key::from("peak")).map(|n| n.value), Some(2.0));
        assert!(list.get(&Key::from("valley")).is_none());
        // Positional lookup walks the chain regardless of key kind.
        assert_eq!(list.get(&Key::Int(1)).map(|n| n.value), Some(2.0));
    }

    #[test]
    fn test_float_lookup_always_misses() {
        let mut list = List::new();
        list.append(ListNode::new(Key::Float(1.5), "x"));
        assert!(list.get(&Key::Float(1.5)).is_none());
    }

    #[test]
    fn test_empty_list_misses_every_key_kind() {
        let list: List<u8> = List::new();
        assert!(list.get(&Key::Int(0)).is_none());
        assert!(list.get(&Key::Int(-1)).is_none());
        assert!(list.get(&Key::Float(0.0)).is_none());
        assert!(list.get(&Key::from("")).is_none());
    }

    #[test]
    fn test_insert_does_not_renumber_trailing_nodes() {
        let mut list = List::new();
        for v in ["a", "b", "c"] {
            list.append(ListNode::new(0, v));
        }
        list.insert(ListNode::new(0, "x"), 1);
        let order: Vec<_> = list.iter().map(|n| n.value).collect();
        assert_eq!(order, vec!["a", "x", "b", "c"]);
        // "c" still carries the key it received on append.
        assert_eq!(ints(&list), vec![0, 1, 2, 2]);
    }

    #[test]
    fn test_remove_does_not_renumber() {
        let mut list: List<&str> = ["a", "b", "c"].into_iter().collect();
        list.remove(0).unwrap();
        assert_eq!(ints(&list), vec![1, 2]);
        assert_eq!(list.get(&Key::Int(0)).map(|n| n.value), Some("b"));
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut list: List<&str> = ["a"].into_iter().collect();
        list.insert(ListNode::new(0, "b"), 10);
        assert_eq!(list.last().map(|n| n.value), Some("b"));
        assert_eq!(ints(&list), vec![0, 1]);
    }

    #[test]
    fn test_insert_at_front_moves_first() {
        let mut list: List<&str> = ["a", "b"].into_iter().collect();
        list.insert(ListNode::new(0, "z"), 0);
        assert_eq!(list.first().map(|n| n.value), Some("z"));
        assert_eq!(ints(&list), vec![0, 1, 1]);
    }

    #[test]
    fn test_drain_by_removing_front() {
        let mut list: List<usize> = (0..8).collect();
        for _ in 0..8 {
            list.remove(0).unwrap();
        }
        assert_eq!(list.len(), 0);
        assert!(list.first().is_none() && list.last().is_none());
        assert!(list.remove(0).unwrap_err().is_lookup_miss());
    }

    #[test]
    fn test_pop_transfers_node() {
        let mut list: List<usize> = (0..3).collect();
        let node = list.pop(2).unwrap();
        assert_eq!(node.key, Key::Int(2));
        assert!(node.is_detached());
        assert_eq!(list.len(), 2);
        assert!(list.pop(2).is_none());
    }
}

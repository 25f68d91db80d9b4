//! Key-addressed containers used to index and rank pipeline results.
//!
//! - [`Key`]: INT / FLOAT / STRING tagged identifier
//! - [`LinkedList`]: doubly linked list addressed by position
//! - [`List`]: doubly linked list addressed by [`Key`]
//! - [`Tree`]: binary tree with generic, search-tree and heap orderings

pub mod key;
pub mod linked_list;
pub mod list;
pub mod tree;

pub use key::{Key, KeyKind};
pub use linked_list::{LinkedList, ListNode};
pub use list::List;
pub use tree::{
    GenericTree, Heap, HeapOrder, NodeId, SearchOrder, SearchTree, Tree, TreeNode, TreeOrder,
    Unordered,
};

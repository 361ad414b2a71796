//! A copy-on-write compressed radix tree.
//!
//! Writers are serialized by a mutex. A write starts from the published root,
//! path-copies every node it touches (`TrioArc::make_mut` clones a node only
//! while it is still shared with a published version), and finally publishes
//! the new root with a single pointer swap. Readers take the read lock just long
//! enough to clone the root pointer, so they never wait for a write to finish,
//! and the iterators they get walk an immutable version of the tree.

use parking_lot::{Mutex, RwLock};
use smallvec::{smallvec, SmallVec};
use std::{
    iter::FusedIterator,
    sync::atomic::{AtomicUsize, Ordering},
};
use triomphe::Arc as TrioArc;

pub(crate) type NodeRef<V> = TrioArc<Node<V>>;

#[derive(Clone)]
pub(crate) struct Node<V> {
    // Empty only for the root.
    edge: Box<str>,
    value: Option<V>,
    // Sorted by the first char of their edges.
    children: SmallVec<[NodeRef<V>; 4]>,
}

impl<V> Node<V> {
    fn root() -> Self {
        Self {
            edge: "".into(),
            value: None,
            children: SmallVec::new(),
        }
    }

    fn leaf(edge: &str, value: V) -> Self {
        Self {
            edge: edge.into(),
            value: Some(value),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    fn first_char(&self) -> Option<char> {
        self.edge.chars().next()
    }

    fn child_index(&self, c: char) -> Result<usize, usize> {
        self.children
            .binary_search_by_key(&Some(c), |child| child.first_char())
    }
}

/// Returns the length in bytes of the longest common prefix of `a` and `b`,
/// always on a char boundary of both.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Where a key ends up when it is walked down from the root.
pub(crate) struct Search<'a, V> {
    node: &'a NodeRef<V>,
    // Bytes of the key matched in total.
    matched: usize,
    // Bytes of the key matched against the incoming edge of `node`.
    matched_in_node: usize,
}

impl<'a, V> Search<'a, V> {
    pub(crate) fn run(root: &'a NodeRef<V>, key: &str) -> Self {
        let mut node = root;
        let mut matched = 0;
        let mut matched_in_node = 0;

        while let Some(c) = key[matched..].chars().next() {
            let Ok(i) = node.child_index(c) else {
                break;
            };
            node = &node.children[i];
            matched_in_node = common_prefix_len(&node.edge, &key[matched..]);
            matched += matched_in_node;
            if matched_in_node < node.edge.len() {
                break;
            }
        }

        Self {
            node,
            matched,
            matched_in_node,
        }
    }

    pub(crate) fn is_exact(&self, key: &str) -> bool {
        self.matched == key.len() && self.matched_in_node == self.node.edge.len()
    }

    pub(crate) fn exact_value(&self, key: &str) -> Option<&'a V> {
        if self.is_exact(key) {
            self.node.value.as_ref()
        } else {
            None
        }
    }

    /// The full key of the node found, which may extend past `key` when the
    /// search stopped inside an edge.
    fn node_key(&self, key: &str) -> String {
        let parent_len = self.matched - self.matched_in_node;
        let mut node_key = String::with_capacity(parent_len + self.node.edge.len());
        node_key.push_str(&key[..parent_len]);
        node_key.push_str(&self.node.edge);
        node_key
    }

    /// Keys stored below the deepest node the key reached, including that node.
    /// Nothing matches when not even the first char of a non-empty key did.
    pub(crate) fn closest(&self, key: &str) -> Keys<V> {
        if self.matched == 0 && !key.is_empty() {
            Keys::empty()
        } else {
            Keys::below(self.node, self.node_key(key))
        }
    }

    /// Keys starting with `key`, inclusive.
    pub(crate) fn starting_with(&self, key: &str) -> Keys<V> {
        if self.matched == key.len() {
            Keys::below(self.node, self.node_key(key))
        } else {
            Keys::empty()
        }
    }
}

fn put<V: Clone>(node: &mut NodeRef<V>, key: &str, value: V) -> Option<V> {
    let node = TrioArc::make_mut(node);
    let Some(c) = key.chars().next() else {
        return node.value.replace(value);
    };

    match node.child_index(c) {
        Ok(i) => {
            let child = &mut node.children[i];
            let common = common_prefix_len(&child.edge, key);
            if common < child.edge.len() {
                split(child, common);
            }
            put(child, &key[common..], value)
        }
        Err(i) => {
            node.children.insert(i, TrioArc::new(Node::leaf(key, value)));
            None
        }
    }
}

// Turns `child` into an upper node holding the first `at` bytes of its edge,
// with the old node below it holding the rest.
fn split<V: Clone>(child: &mut NodeRef<V>, at: usize) {
    let mut lower = Node::clone(child);
    lower.edge = child.edge[at..].into();
    let upper = Node {
        edge: child.edge[..at].into(),
        value: None,
        children: smallvec![TrioArc::new(lower)],
    };
    *child = TrioArc::new(upper);
}

pub(crate) struct Tree<V> {
    root: RwLock<NodeRef<V>>,
    writer: Mutex<()>,
    len: AtomicUsize,
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self {
            root: RwLock::new(TrioArc::new(Node::root())),
            writer: Mutex::new(()),
            len: AtomicUsize::new(0),
        }
    }
}

impl<V> Tree<V> {
    /// The version of the tree published most recently.
    pub(crate) fn snapshot(&self) -> NodeRef<V> {
        TrioArc::clone(&self.root.read())
    }

    /// The number of keys holding a value.
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        let root = self.snapshot();
        let found = Search::run(&root, key);
        found.exact_value(key).is_some()
    }

    pub(crate) fn closest_keys(&self, candidate: &str) -> Keys<V> {
        let root = self.snapshot();
        let found = Search::run(&root, candidate);
        found.closest(candidate)
    }

    pub(crate) fn keys_starting_with(&self, prefix: &str) -> Keys<V> {
        let root = self.snapshot();
        let found = Search::run(&root, prefix);
        found.starting_with(prefix)
    }
}

impl<V: Clone> Tree<V> {
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let root = self.snapshot();
        let found = Search::run(&root, key);
        found.exact_value(key).cloned()
    }

    /// Runs `f` against a private copy of the tree and publishes the result.
    ///
    /// Concurrent writers queue up on the writer lock. Readers keep seeing the
    /// previous version until `f` returns.
    pub(crate) fn write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Writer<V>) -> R,
    {
        let _guard = self.writer.lock();
        let mut writer = Writer {
            root: self.snapshot(),
            added: 0,
            is_dirty: false,
        };
        let result = f(&mut writer);

        if writer.is_dirty {
            *self.root.write() = writer.root;
            self.len.fetch_add(writer.added, Ordering::AcqRel);
        }
        result
    }
}

pub(crate) struct Writer<V> {
    root: NodeRef<V>,
    added: usize,
    is_dirty: bool,
}

impl<V: Clone> Writer<V> {
    /// Calls `f` with the current value of `key` and stores the value it
    /// returns, if any. Returning `None` leaves the tree untouched.
    pub(crate) fn upsert<F>(&mut self, key: &str, f: F)
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let found = Search::run(&self.root, key);
        let Some(value) = f(found.exact_value(key)) else {
            return;
        };
        if put(&mut self.root, key, value).is_none() {
            self.added += 1;
        }
        self.is_dirty = true;
    }
}

/// A lazy iterator over the keys stored below a node of the tree.
///
/// The iterator holds the version of the tree that was current when the query
/// was made. Keys inserted afterwards are not visited. Keys are yielded in
/// lexicographic order of their chars.
pub struct Keys<V = ()> {
    stack: Vec<(NodeRef<V>, String)>,
}

impl<V> Keys<V> {
    pub(crate) fn empty() -> Self {
        Self { stack: Vec::new() }
    }

    fn below(node: &NodeRef<V>, key: String) -> Self {
        Self {
            stack: vec![(TrioArc::clone(node), key)],
        }
    }

    /// Returns the next node holding a value, with its key.
    pub(crate) fn next_node(&mut self) -> Option<(NodeRef<V>, String)> {
        while let Some((node, key)) = self.stack.pop() {
            for child in node.children.iter().rev() {
                let mut child_key = String::with_capacity(key.len() + child.edge.len());
                child_key.push_str(&key);
                child_key.push_str(&child.edge);
                self.stack.push((TrioArc::clone(child), child_key));
            }
            if node.value.is_some() {
                return Some((node, key));
            }
        }
        None
    }
}

impl<V> Iterator for Keys<V> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().map(|(_node, key)| key)
    }
}

impl<V> FusedIterator for Keys<V> {}

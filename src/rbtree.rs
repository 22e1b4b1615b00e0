//! Module provide ordered index implemented by [RbTree] type.
//!
//! RbTree is a parent-linked [red-black tree][wiki-rbtree], nodes are held
//! in an arena and linked by slot index.
//!
//! - Parametrised over `key-type`, no value payload.
//! - Duplicate keys are allowed, insert places equal keys to the right.
//! - insert(), find(), min(), max(), erase() api, via [NodeRef] handles.
//! - In-order export into a bounded buffer.
//! - No Durability guarantee.
//! - Not thread safe.
//!
//! Constructing a new [RbTree] instance:
//! ```
//! use rbix::RbTree;
//!
//! let index: RbTree<i32> = RbTree::new();
//! assert!(index.is_empty());
//! assert_eq!(index.min(), None);
//! ```
//!
//! Insert, lookup and erase:
//! ```
//! use rbix::RbTree;
//!
//! let mut index: RbTree<String> = RbTree::new();
//! index.insert("key1".to_string()).unwrap();
//! index.insert("key2".to_string()).unwrap();
//! index.insert("key2".to_string()).unwrap();
//! assert_eq!(index.len(), 3);
//!
//! let node = index.find("key1").unwrap();
//! assert_eq!(index.key(node).unwrap(), "key1");
//!
//! let key = index.erase(node).unwrap();
//! assert_eq!(key, "key1".to_string());
//! assert_eq!(index.key(node), None);
//! assert!(index.erase(node).is_err());
//! ```
//!
//! Bounded export:
//! ```
//! use rbix::RbTree;
//!
//! let mut index: RbTree<u32> = RbTree::new();
//! for key in [5, 3, 8, 1].iter() {
//!     index.insert(*key).unwrap();
//! }
//! let mut keys = [0_u32; 3];
//! assert_eq!(index.export(&mut keys), 3);
//! assert_eq!(keys, [1, 3, 5]);
//! assert_eq!(index.to_vec(10), vec![1, 3, 5, 8]);
//! ```
//!
//! [wiki-rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree

use log::{debug, trace};

use std::{
    borrow::Borrow,
    cmp::{self, Ordering},
    fmt,
    sync::atomic::{self, AtomicUsize},
};

use crate::{
    arena::Arena,
    node::{Color, Node, NodeRef, Side, NIL},
    Error, Result,
};

// Every tree gets an id, handles carry it to catch cross-tree use.
static TREE_ID: AtomicUsize = AtomicUsize::new(1);

/// RbTree manage a single instance of in-memory ordered index using
/// [red-black][rbtree] tree.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RbTree<K> {
    id: usize,
    arena: Arena<K>,
    root: usize,
    n_count: usize, // number of entries in the tree.
}

/// Statistics on tree shape, returned by [RbTree::validate].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of entries reachable from root.
    pub n_count: usize,
    /// Number of black nodes from root to any leaf.
    pub blacks: usize,
    /// Longest path from root to a leaf, counted in nodes.
    pub depth: usize,
}

impl<K> Default for RbTree<K> {
    fn default() -> RbTree<K> {
        RbTree::new()
    }
}

impl<K> RbTree<K> {
    /// Create an empty instance of RbTree.
    pub fn new() -> RbTree<K> {
        RbTree {
            id: TREE_ID.fetch_add(1, atomic::Ordering::Relaxed),
            arena: Arena::new(),
            root: NIL,
            n_count: Default::default(),
        }
    }

    /// Create an empty instance of RbTree, with room for `n` entries.
    /// Fail with [Error::AllocFailed] if memory cannot be reserved.
    pub fn with_capacity(n: usize) -> Result<RbTree<K>> {
        let arena = Arena::with_capacity(n).map_err(|err| {
            debug!("with_capacity({}): {}", n, err);
            err
        })?;

        Ok(RbTree {
            id: TREE_ID.fetch_add(1, atomic::Ordering::Relaxed),
            arena,
            root: NIL,
            n_count: Default::default(),
        })
    }
}

/// Maintenance API.
impl<K> RbTree<K> {
    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Release all entries, children before parent. Handles obtained
    /// before this call turn stale.
    pub fn clear(&mut self) {
        let mut paths = Vec::default();
        if self.root != NIL {
            paths.push(Fragment {
                flag: IFlag::Left,
                node: self.root,
            });
        }

        let mut n = 0;
        while let Some(path) = paths.last_mut() {
            let node = path.node;
            match path.flag {
                IFlag::Left => {
                    path.flag = IFlag::Center;
                    let left = self.arena[node].left;
                    if left != NIL {
                        paths.push(Fragment {
                            flag: IFlag::Left,
                            node: left,
                        });
                    }
                }
                IFlag::Center => {
                    path.flag = IFlag::Right;
                    let right = self.arena[node].right;
                    if right != NIL {
                        paths.push(Fragment {
                            flag: IFlag::Left,
                            node: right,
                        });
                    }
                }
                IFlag::Right => {
                    paths.pop();
                    self.arena.release(node);
                    n += 1;
                }
            }
        }

        trace!("clear(): tree {} released {} entries", self.id, n);
        self.root = NIL;
        self.n_count = 0;
    }

    /// Validate red-black tree with following rules:
    ///
    /// * Root node is always black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure keys are in sorted order.
    /// * Parent links agree with child links.
    ///
    /// Additionally return statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats>
    where
        K: Ord + fmt::Debug,
    {
        if self.is_red(self.root) {
            err_at!(Fatal, msg: "red root {:?}", self.arena[self.root].key)?;
        }
        if self.root != NIL && self.arena[self.root].parent != NIL {
            err_at!(Fatal, msg: "root has parent {}", self.arena[self.root].parent)?;
        }

        let mut stats = Stats::default();
        stats.blacks = self.validate_tree(self.root, false, 0, 1, &mut stats)?;

        if stats.n_count != self.n_count || self.arena.len() != self.n_count {
            err_at!(
                Fatal,
                msg: "n_count {} reachable:{} arena:{}",
                self.n_count,
                stats.n_count,
                self.arena.len()
            )?;
        }

        let mut prev: Option<&K> = None;
        for key in self.in_order() {
            match prev {
                Some(prev) if prev.gt(key) => {
                    err_at!(Fatal, msg: "sort {:?} before {:?}", prev, key)?;
                }
                _ => (),
            }
            prev = Some(key);
        }

        Ok(stats)
    }
}

/// Handle API.
impl<K> RbTree<K> {
    /// Return handle to the root node, None if tree is empty.
    pub fn root(&self) -> Option<NodeRef> {
        self.to_ref(self.root)
    }

    /// Check whether `node` refers to a live entry in this tree.
    pub fn contains(&self, node: NodeRef) -> bool {
        self.resolve(node).is_some()
    }

    /// Return the key for `node`, None if handle is stale.
    pub fn key(&self, node: NodeRef) -> Option<&K> {
        self.resolve(node).map(|slot| &self.arena[slot].key)
    }

    /// Return the color for `node`, None if handle is stale.
    pub fn color(&self, node: NodeRef) -> Option<Color> {
        self.resolve(node).map(|slot| self.arena[slot].to_color())
    }

    /// Return handle to the left child of `node`, None if absent.
    pub fn left(&self, node: NodeRef) -> Option<NodeRef> {
        let slot = self.resolve(node)?;
        self.to_ref(self.arena[slot].left)
    }

    /// Return handle to the right child of `node`, None if absent.
    pub fn right(&self, node: NodeRef) -> Option<NodeRef> {
        let slot = self.resolve(node)?;
        self.to_ref(self.arena[slot].right)
    }

    /// Return handle to the parent of `node`, None for the root.
    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        let slot = self.resolve(node)?;
        self.to_ref(self.arena[slot].parent)
    }

    fn to_ref(&self, slot: usize) -> Option<NodeRef> {
        if slot == NIL {
            return None;
        }
        let gen = self.arena.to_gen(slot)?;
        Some(NodeRef {
            tree: self.id,
            slot,
            gen,
        })
    }

    fn resolve(&self, node: NodeRef) -> Option<usize> {
        match node.tree == self.id && self.arena.is_live(node.slot, node.gen) {
            true => Some(node.slot),
            false => None,
        }
    }
}

impl<K> RbTree<K> {
    /// Insert `key` into this instance. Equal keys are kept, the new one
    /// is placed after the existing ones. Return handle to the root of
    /// the tree after rebalancing.
    ///
    /// Fail with [Error::AllocFailed] if the arena cannot grow, in which
    /// case the tree is not modified.
    pub fn insert(&mut self, key: K) -> Result<NodeRef>
    where
        K: Ord,
    {
        let (mut parent, mut side) = (NIL, Side::Left);
        let mut curr = self.root;
        while curr != NIL {
            parent = curr;
            side = match key.cmp(&self.arena[curr].key) {
                Ordering::Less => Side::Left,
                Ordering::Equal | Ordering::Greater => Side::Right,
            };
            curr = self.arena[curr].child(side);
        }

        let node = self.arena.alloc(Node::new(key, parent)).map_err(|err| {
            debug!("insert(): tree {} n_count {}: {}", self.id, self.n_count, err);
            err
        })?;
        if parent == NIL {
            self.root = node;
        } else {
            self.arena[parent].set_child(side, node);
        }
        self.n_count += 1;

        self.insert_fixup(node);

        match self.root() {
            Some(root) => Ok(root),
            None => panic!("insert(): empty tree after insert ? Call the programmer"),
        }
    }

    /// Erase the entry referred by `node` and return its key. Fail with
    /// [Error::InvalidHandle], leaving the tree untouched, if `node` is
    /// stale or belongs to another tree.
    ///
    /// Handles to other entries stay valid.
    pub fn erase(&mut self, node: NodeRef) -> Result<K> {
        let z = match self.resolve(node) {
            Some(z) => z,
            None => {
                debug!("erase(): tree {} rejected {:?}", self.id, node);
                return err_at!(InvalidHandle, msg: "{:?} in tree {}", node, self.id);
            }
        };

        let (left, right) = (self.arena[z].left, self.arena[z].right);
        let mut black = self.arena[z].is_black();

        // x takes the place of the spliced node, x_parent is tracked apart
        // because x can be NIL.
        let (x, x_parent) = if left == NIL {
            let parent = self.arena[z].parent;
            self.transplant(z, right);
            (right, parent)
        } else if right == NIL {
            let parent = self.arena[z].parent;
            self.transplant(z, left);
            (left, parent)
        } else {
            let y = self.minimum(right);
            black = self.arena[y].is_black();
            let x = self.arena[y].right;
            let x_parent = if self.arena[y].parent == z {
                y
            } else {
                let parent = self.arena[y].parent;
                self.transplant(y, x);
                self.arena[y].right = right;
                self.arena[right].parent = y;
                parent
            };
            self.transplant(z, y);
            self.arena[y].left = left;
            self.arena[left].parent = y;
            let z_black = self.arena[z].black;
            self.arena[y].black = z_black;
            (x, x_parent)
        };

        if black {
            self.delete_fixup(x, x_parent);
        }
        self.n_count -= 1;

        match self.arena.release(z) {
            Some(node) => Ok(node.key),
            None => panic!("erase(): slot {} not live ? Call the programmer", z),
        }
    }
}

impl<K> RbTree<K> {
    /// Find an entry whose key is equal to `key`.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeRef>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root;
        while node != NIL {
            let nref = &self.arena[node];
            node = match nref.key.borrow().cmp(key) {
                Ordering::Less => nref.right,
                Ordering::Greater => nref.left,
                Ordering::Equal => return self.to_ref(node),
            };
        }
        None
    }

    /// Return the entry with smallest key, None if tree is empty.
    pub fn min(&self) -> Option<NodeRef> {
        match self.root {
            NIL => None,
            root => self.to_ref(self.minimum(root)),
        }
    }

    /// Return the entry with largest key, None if tree is empty.
    pub fn max(&self) -> Option<NodeRef> {
        match self.root {
            NIL => None,
            root => self.to_ref(self.maximum(root)),
        }
    }

    /// Copy keys in ascending order into `keys`, stop once `keys` is full.
    /// Return the number of keys copied.
    pub fn export(&self, keys: &mut [K]) -> usize
    where
        K: Clone,
    {
        let mut n = 0;
        for (dst, key) in keys.iter_mut().zip(self.in_order()) {
            *dst = key.clone();
            n += 1;
        }
        n
    }

    /// Same as [RbTree::export], into a new vector of at most `capacity`
    /// keys.
    pub fn to_vec(&self, capacity: usize) -> Vec<K>
    where
        K: Clone,
    {
        let n = cmp::min(capacity, self.n_count);
        let mut keys = Vec::with_capacity(n);
        keys.extend(self.in_order().take(n).cloned());
        keys
    }

    fn in_order(&self) -> InOrder<'_, K> {
        let mut paths = Vec::default();
        build_iter(&self.arena, self.root, &mut paths);
        InOrder {
            arena: &self.arena,
            paths,
        }
    }

    fn minimum(&self, mut node: usize) -> usize {
        while self.arena[node].left != NIL {
            node = self.arena[node].left;
        }
        node
    }

    fn maximum(&self, mut node: usize) -> usize {
        while self.arena[node].right != NIL {
            node = self.arena[node].right;
        }
        node
    }

    fn validate_tree(
        &self,
        node: usize,
        fromred: bool,
        mut n_blacks: usize,
        depth: usize,
        stats: &mut Stats,
    ) -> Result<usize>
    where
        K: Ord + fmt::Debug,
    {
        if node == NIL {
            return Ok(n_blacks);
        }
        stats.n_count += 1;
        stats.depth = cmp::max(stats.depth, depth);

        let red = self.is_red(node);
        if fromred && red {
            return err_at!(Fatal, msg: "consecutive reds at {:?}", self.arena[node].key);
        }

        if !red {
            n_blacks += 1;
        }

        let nref = &self.arena[node];
        let (left, right) = (nref.left, nref.right);
        for child in [left, right].iter().filter(|child| **child != NIL) {
            if self.arena[*child].parent != node {
                err_at!(Fatal, msg: "parent link {:?}", self.arena[*child].key)?;
            }
        }

        let lblacks = self.validate_tree(left, red, n_blacks, depth + 1, stats)?;
        let rblacks = self.validate_tree(right, red, n_blacks, depth + 1, stats)?;
        if lblacks != rblacks {
            err_at!(Fatal, msg: "unbalanced blacks {} {}", lblacks, rblacks)?;
        }

        if left != NIL && self.arena[left].key.gt(&nref.key) {
            let lkey = &self.arena[left].key;
            err_at!(Fatal, msg: "sort lkey:{:?} parent:{:?}", lkey, nref.key)?;
        }
        if right != NIL && self.arena[right].key.lt(&nref.key) {
            let rkey = &self.arena[right].key;
            err_at!(Fatal, msg: "sort rkey:{:?} parent:{:?}", rkey, nref.key)?;
        }

        Ok(lblacks)
    }
}

//--------- fixup routines ----------------

impl<K> RbTree<K> {
    fn insert_fixup(&mut self, mut node: usize) {
        while self.is_red(self.arena[node].parent) {
            // red parent is never the root, grand is always a node.
            let parent = self.arena[node].parent;
            let grand = self.arena[parent].parent;
            let side = self.side_of(parent, grand);
            let uncle = self.arena[grand].child(side.flip());

            if self.is_red(uncle) {
                self.arena[parent].set_black();
                self.arena[uncle].set_black();
                self.arena[grand].set_red();
                node = grand;
                continue;
            }

            if node == self.arena[parent].child(side.flip()) {
                node = parent;
                self.rotate(node, side);
            }

            let parent = self.arena[node].parent;
            let grand = self.arena[parent].parent;
            self.arena[parent].set_black();
            self.arena[grand].set_red();
            self.rotate(grand, side.flip());
        }

        let root = self.root;
        self.arena[root].set_black();
    }

    fn delete_fixup(&mut self, mut node: usize, mut parent: usize) {
        while node != self.root && self.is_black(node) {
            // sibling of a removed black node is never NIL.
            let side = self.side_of(node, parent);
            let mut sibling = self.arena[parent].child(side.flip());

            if self.is_red(sibling) {
                self.arena[sibling].set_black();
                self.arena[parent].set_red();
                self.rotate(parent, side);
                sibling = self.arena[parent].child(side.flip());
            }

            let near = self.arena[sibling].child(side);
            let far = self.arena[sibling].child(side.flip());
            if self.is_black(near) && self.is_black(far) {
                self.arena[sibling].set_red();
                node = parent;
                parent = self.arena[node].parent;
                continue;
            }

            if self.is_black(far) {
                self.arena[near].set_black();
                self.arena[sibling].set_red();
                self.rotate(sibling, side.flip());
                sibling = self.arena[parent].child(side.flip());
            }

            let far = self.arena[sibling].child(side.flip());
            let black = self.arena[parent].is_black();
            self.arena[sibling].black = black;
            self.arena[parent].set_black();
            self.arena[far].set_black();
            self.rotate(parent, side);

            node = self.root;
            parent = NIL;
        }

        if node != NIL {
            self.arena[node].set_black();
        }
    }

    // Replace the subtree rooted at `old` with the one rooted at `new`,
    // `new` can be NIL.
    fn transplant(&mut self, old: usize, new: usize) {
        let parent = self.arena[old].parent;
        if parent == NIL {
            self.root = new;
        } else {
            let side = self.side_of(old, parent);
            self.arena[parent].set_child(side, new);
        }
        if new != NIL {
            self.arena[new].parent = parent;
        }
    }

    #[inline]
    fn is_red(&self, node: usize) -> bool {
        node != NIL && !self.arena[node].is_black()
    }

    #[inline]
    fn is_black(&self, node: usize) -> bool {
        !self.is_red(node)
    }

    // `node` can be NIL, as long as parent's other child is not.
    #[inline]
    fn side_of(&self, node: usize, parent: usize) -> Side {
        match self.arena[parent].left == node {
            true => Side::Left,
            false => Side::Right,
        }
    }
}

//--------- rotation routines ----------------

impl<K> RbTree<K> {
    // Rotate `node` down towards `side`.
    #[inline]
    fn rotate(&mut self, node: usize, side: Side) {
        match side {
            Side::Left => self.rotate_left(node),
            Side::Right => self.rotate_right(node),
        }
    }

    //              (p)                       (p)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left      x             node      xr
    //                   / \            /  \
    //                 xl   xr       left   xl
    //
    fn rotate_left(&mut self, node: usize) {
        let x = self.arena[node].right;
        if x == NIL {
            panic!("rotate_left(): no right child to pivot ? Call the programmer");
        }
        let xl = self.arena[x].left;
        self.arena[node].right = xl;
        if xl != NIL {
            self.arena[xl].parent = node;
        }
        self.transplant(node, x);
        self.arena[x].left = node;
        self.arena[node].parent = x;
    }

    //              (p)                       (p)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //           x      right             xl      node
    //          / \                               / \
    //        xl   xr                           xr  right
    //
    fn rotate_right(&mut self, node: usize) {
        let x = self.arena[node].left;
        if x == NIL {
            panic!("rotate_right(): no left child to pivot ? Call the programmer");
        }
        let xr = self.arena[x].right;
        self.arena[node].left = xr;
        if xr != NIL {
            self.arena[xr].parent = node;
        }
        self.transplant(node, x);
        self.arena[x].right = node;
        self.arena[node].parent = x;
    }
}

#[derive(Copy, Clone)]
enum IFlag {
    Left,
    Center,
    Right,
}

struct Fragment {
    flag: IFlag,
    node: usize,
}

// In-order walk over keys, backed by an explicit stack.
struct InOrder<'a, K> {
    arena: &'a Arena<K>,
    paths: Vec<Fragment>,
}

impl<'a, K> Iterator for InOrder<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        loop {
            let path = self.paths.last_mut()?;
            match path.flag {
                IFlag::Left => {
                    path.flag = IFlag::Center;
                    break Some(&arena[path.node].key);
                }
                IFlag::Center => {
                    path.flag = IFlag::Right;
                    let right = arena[path.node].right;
                    build_iter(arena, right, &mut self.paths)
                }
                IFlag::Right => {
                    self.paths.pop();
                }
            }
        }
    }
}

fn build_iter<K>(arena: &Arena<K>, mut node: usize, paths: &mut Vec<Fragment>) {
    while node != NIL {
        paths.push(Fragment {
            flag: IFlag::Left,
            node,
        });
        node = arena[node].left;
    }
}

#[cfg(test)]
#[path = "rbtree_test.rs"]
mod rbtree_test;

/// Reserved arena index, stands for every missing child and for the
/// root's parent. Always black, never stored.
pub const NIL: usize = usize::MAX;

/// Color of a node in [RbTree](crate::RbTree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Handle to a live node in a [RbTree](crate::RbTree).
///
/// Handles are cheap to copy. A handle turns stale once its node is
/// erased, or the tree is cleared, after which the tree rejects it.
/// Handles are bound to the tree that returned them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) tree: usize,
    pub(crate) slot: usize,
    pub(crate) gen: u32,
}

// Node corresponds to a single key in RbTree instance.
#[derive(Clone)]
pub struct Node<K> {
    pub key: K,
    pub black: bool,   // store: black or red
    pub parent: usize, // link: parent, NIL for root
    pub left: usize,   // link: left child
    pub right: usize,  // link: right child
}

impl<K> Node<K> {
    /// New nodes are red, with both children pointing to NIL.
    pub fn new(key: K, parent: usize) -> Node<K> {
        Node {
            key,
            black: false,
            parent,
            left: NIL,
            right: NIL,
        }
    }

    #[inline]
    pub fn set_red(&mut self) {
        self.black = false
    }

    #[inline]
    pub fn set_black(&mut self) {
        self.black = true
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        self.black
    }

    #[inline]
    pub fn to_color(&self) -> Color {
        match self.black {
            true => Color::Black,
            false => Color::Red,
        }
    }

    #[inline]
    pub fn child(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub fn set_child(&mut self, side: Side, child: usize) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

/// Which child link of a parent a node hangs from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

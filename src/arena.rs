//! Module implement slot storage for tree nodes.
//!
//! Nodes are addressed by their slot index. Released slots are kept in a
//! free list and handed out again on the next allocation, each release
//! bumps the slot's generation so that handles minted earlier can be
//! detected as stale.

use std::ops::{Index, IndexMut};

use crate::{node::Node, Error, Result};

struct Slot<K> {
    gen: u32,
    node: Option<Node<K>>,
}

pub struct Arena<K> {
    slots: Vec<Slot<K>>,
    free: Vec<usize>, // released slots, reused LIFO.
    n_live: usize,
    #[cfg(test)]
    limit: Option<usize>, // max slots, to exercise allocation failures.
}

impl<K> Arena<K> {
    pub fn new() -> Arena<K> {
        Arena {
            slots: Vec::default(),
            free: Vec::default(),
            n_live: 0,
            #[cfg(test)]
            limit: None,
        }
    }

    /// Reserve room for `n` nodes, fail instead of aborting when memory
    /// is not available.
    pub fn with_capacity(n: usize) -> Result<Arena<K>> {
        let mut arena = Arena::new();
        err_at!(AllocFailed, arena.slots.try_reserve(n), "slots:{}", n)?;
        err_at!(AllocFailed, arena.free.try_reserve(n), "free:{}", n)?;
        Ok(arena)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n_live
    }

    /// Store `node` and return its slot. Arena is left untouched when
    /// growing it fails.
    pub fn alloc(&mut self, node: Node<K>) -> Result<usize> {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                #[cfg(test)]
                match self.limit {
                    Some(limit) if self.slots.len() >= limit => {
                        err_at!(AllocFailed, msg: "slot limit {}", limit)?;
                    }
                    _ => (),
                }
                err_at!(AllocFailed, self.slots.try_reserve(1))?;
                // free list can always take back every slot, release()
                // must not allocate.
                err_at!(AllocFailed, self.free.try_reserve(self.slots.len() + 1))?;
                self.slots.push(Slot {
                    gen: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        self.n_live += 1;
        Ok(slot)
    }

    /// Take the node out of `slot`, return None if slot is not live.
    /// A slot whose generation is exhausted is retired, never reused.
    pub fn release(&mut self, slot: usize) -> Option<Node<K>> {
        let item = self.slots.get_mut(slot)?;
        let node = item.node.take()?;
        if item.gen < u32::MAX {
            item.gen += 1;
            self.free.push(slot);
        }
        self.n_live -= 1;
        Some(node)
    }

    #[cfg(test)]
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = Some(limit)
    }

    #[cfg(test)]
    pub fn set_gen(&mut self, slot: usize, gen: u32) {
        self.slots[slot].gen = gen
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Node<K>> {
        self.slots.get(slot).and_then(|item| item.node.as_ref())
    }

    #[inline]
    pub fn to_gen(&self, slot: usize) -> Option<u32> {
        self.slots.get(slot).map(|item| item.gen)
    }

    /// Check whether `slot` holds a node and was not released since
    /// generation `gen`.
    #[inline]
    pub fn is_live(&self, slot: usize, gen: u32) -> bool {
        match self.slots.get(slot) {
            Some(item) => item.gen == gen && item.node.is_some(),
            None => false,
        }
    }
}

impl<K> Index<usize> for Arena<K> {
    type Output = Node<K>;

    fn index(&self, slot: usize) -> &Node<K> {
        match self.get(slot) {
            Some(node) => node,
            None => panic!("arena[{}]: dangling link ? Call the programmer", slot),
        }
    }
}

impl<K> IndexMut<usize> for Arena<K> {
    fn index_mut(&mut self, slot: usize) -> &mut Node<K> {
        match self.slots.get_mut(slot).and_then(|item| item.node.as_mut()) {
            Some(node) => node,
            None => panic!("arena[{}]: dangling link ? Call the programmer", slot),
        }
    }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;

//! Fixed-capacity arena of path nodes
//!
//! Every path node of the simulation lives in one [`NodePool`]. Paths are
//! singly linked chains of slot indices; released nodes are threaded onto
//! an intrusive free list over the same slots, so nodes are never copied.

use log::warn;

use super::error::{PathError, PathResult};
use super::types::MapElement;

/// Stable handle to a slot of a [`NodePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One step of a path: the element to traverse and the following step
#[derive(Debug, Clone, Copy)]
pub struct PathNode {
    pub element: MapElement,
    next: Option<NodeIndex>,
}

/// Arena owning every path node, with a free list for recycling
#[derive(Debug)]
pub struct NodePool {
    slots: Vec<PathNode>,
    capacity: usize,
    free_head: Option<NodeIndex>,
    free_count: usize,
}

impl NodePool {
    /// Creates a pool that will never hold more than `capacity` nodes
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            free_head: None,
            free_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nodes currently owned by paths
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free_count
    }

    /// Number of nodes that can still be acquired
    pub fn available(&self) -> usize {
        self.capacity - self.in_use()
    }

    /// Takes a node from the free list, or carves a fresh slot from the
    /// unused tail of the arena
    pub fn acquire(&mut self, element: MapElement) -> PathResult<NodeIndex> {
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index.index()];
            self.free_head = slot.next;
            self.free_count -= 1;
            slot.element = element;
            slot.next = None;
            return Ok(index);
        }

        if self.slots.len() < self.capacity {
            let index = NodeIndex(self.slots.len() as u32);
            self.slots.push(PathNode {
                element,
                next: None,
            });
            return Ok(index);
        }

        warn!("Path node pool exhausted at capacity {}", self.capacity);
        Err(PathError::PoolExhausted {
            capacity: self.capacity,
        })
    }

    /// Returns one node to the pool
    ///
    /// The node's link is overwritten by the free list, so the successor it
    /// had in its path is returned instead.
    pub fn release_one(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let slot = &mut self.slots[node.index()];
        let successor = slot.next;
        slot.next = self.free_head;
        self.free_head = Some(node);
        self.free_count += 1;
        successor
    }

    /// Returns a whole chain to the pool, splicing it onto the free list at once
    pub fn release_chain(&mut self, head: NodeIndex) {
        let mut tail = head;
        let mut count = 1;
        while let Some(next) = self.slots[tail.index()].next {
            tail = next;
            count += 1;
        }
        self.slots[tail.index()].next = self.free_head;
        self.free_head = Some(head);
        self.free_count += count;
    }

    /// Allocates a chain holding `elements` in order and returns its head
    ///
    /// Nodes are acquired back to front. When the pool cannot hold the whole
    /// chain nothing is acquired.
    pub fn alloc_chain(&mut self, elements: &[MapElement]) -> PathResult<Option<NodeIndex>> {
        if elements.len() > self.available() {
            warn!(
                "Path of {} nodes does not fit, {} of {} nodes available",
                elements.len(),
                self.available(),
                self.capacity
            );
            return Err(PathError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        let mut head = None;
        for element in elements.iter().rev() {
            head = Some(self.prepend(*element, head)?);
        }
        Ok(head)
    }

    /// Acquires a node for `element` linked in front of `head`
    pub fn prepend(&mut self, element: MapElement, head: Option<NodeIndex>) -> PathResult<NodeIndex> {
        let node = self.acquire(element)?;
        self.slots[node.index()].next = head;
        Ok(node)
    }

    pub fn node(&self, node: NodeIndex) -> &PathNode {
        &self.slots[node.index()]
    }

    pub fn element(&self, node: NodeIndex) -> MapElement {
        self.slots[node.index()].element
    }

    pub fn next(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.slots[node.index()].next
    }

    /// Walks a path from `head` without modifying it
    pub fn iter(&self, head: Option<NodeIndex>) -> PathIter<'_> {
        PathIter {
            pool: self,
            current: head,
        }
    }

    pub fn elements(&self, head: Option<NodeIndex>) -> Vec<MapElement> {
        self.iter(head).map(|(_, element)| element).collect()
    }

    pub fn chain_len(&self, head: Option<NodeIndex>) -> usize {
        self.iter(head).count()
    }
}

/// Iterator over `(node, element)` pairs of a path
pub struct PathIter<'a> {
    pool: &'a NodePool,
    current: Option<NodeIndex>,
}

impl Iterator for PathIter<'_> {
    type Item = (NodeIndex, MapElement);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = self.pool.next(node);
        Some((node, self.pool.element(node)))
    }
}

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node of a [`CircularList`].
    pub struct NodeId;
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    previous: NodeId,
    next: NodeId,
}

/// A cyclic doubly linked list.
///
/// Nodes live in an arena owned by the list and are addressed by [`NodeId`],
/// which stays valid across insertions and removals of other nodes. Cloning
/// the list copies every node.
#[derive(Debug, Clone)]
pub struct CircularList<T> {
    nodes: SlotMap<NodeId, Node<T>>,
    front: Option<NodeId>,
}

impl<T> Default for CircularList<T> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            front: None,
        }
    }
}

impl<T> CircularList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle of the first node.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.front
    }

    /// Handle of the last node, i.e. the predecessor of the first.
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.front.map(|front| self.nodes[front].previous)
    }

    #[must_use]
    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).map(|n| n.next)
    }

    #[must_use]
    pub fn previous(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).map(|n| n.previous)
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.nodes.get(node).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(node).map(|n| &mut n.value)
    }

    /// Value of the first node.
    #[must_use]
    pub fn get_first(&self) -> Option<&T> {
        self.first().and_then(|id| self.get(id))
    }

    /// Value of the last node.
    #[must_use]
    pub fn get_last(&self) -> Option<&T> {
        self.last().and_then(|id| self.get(id))
    }

    /// Handle of the node at `index`, counting forward from the first node.
    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        if index >= self.len() {
            return None;
        }
        // Walk from whichever end is closer.
        if index <= self.len() / 2 {
            let mut node = self.front?;
            for _ in 0..index {
                node = self.nodes[node].next;
            }
            Some(node)
        } else {
            let mut node = self.last()?;
            for _ in 0..(self.len() - 1 - index) {
                node = self.nodes[node].previous;
            }
            Some(node)
        }
    }

    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.node_at(index).and_then(|id| self.get(id))
    }

    /// Inserts `value` at the front of the list.
    pub fn insert_first(&mut self, value: T) -> NodeId {
        let id = self.insert_last(value);
        self.front = Some(id);
        id
    }

    /// Inserts `value` at the back of the list.
    pub fn insert_last(&mut self, value: T) -> NodeId {
        match self.front {
            Some(front) => self.link_before(front, value),
            None => {
                let id = self.nodes.insert_with_key(|id| Node {
                    value,
                    previous: id,
                    next: id,
                });
                self.front = Some(id);
                id
            }
        }
    }

    /// Inserts `value` so that it ends up at position `index`.
    ///
    /// Returns `None` if `index > len()`.
    pub fn insert_at(&mut self, value: T, index: usize) -> Option<NodeId> {
        match index {
            0 => Some(self.insert_first(value)),
            i if i == self.len() => Some(self.insert_last(value)),
            i => {
                let successor = self.node_at(i)?;
                Some(self.link_before(successor, value))
            }
        }
    }

    /// Inserts `value` directly after `node`.
    pub fn insert_after(&mut self, node: NodeId, value: T) -> Option<NodeId> {
        let successor = self.nodes.get(node)?.next;
        Some(self.link_before(successor, value))
    }

    fn link_before(&mut self, successor: NodeId, value: T) -> NodeId {
        let predecessor = self.nodes[successor].previous;
        let id = self.nodes.insert(Node {
            value,
            previous: predecessor,
            next: successor,
        });
        self.nodes[predecessor].next = id;
        self.nodes[successor].previous = id;
        id
    }

    pub fn delete_first(&mut self) -> Option<T> {
        self.remove(self.front?)
    }

    pub fn delete_last(&mut self) -> Option<T> {
        self.remove(self.last()?)
    }

    /// Removes the node at `index` and returns its value.
    pub fn delete_at(&mut self, index: usize) -> Option<T> {
        let node = self.node_at(index)?;
        self.remove(node)
    }

    /// Unlinks `node` from the ring and returns its value.
    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        let removed = self.nodes.remove(node)?;
        if self.nodes.is_empty() {
            self.front = None;
            return Some(removed.value);
        }
        self.nodes[removed.previous].next = removed.next;
        self.nodes[removed.next].previous = removed.previous;
        if self.front == Some(node) {
            self.front = Some(removed.next);
        }
        Some(removed.value)
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.front = None;
    }

    /// Iterates over values from the first node, once around the ring.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.node_ids().map(|id| &self.nodes[id].value)
    }

    /// Iterates over node handles from the first node, once around the ring.
    pub fn node_ids(&self) -> NodeIds<'_, T> {
        NodeIds {
            list: self,
            next: self.front,
            remaining: self.len(),
        }
    }

    /// Iterates once around the ring starting at `start`.
    pub fn node_ids_from(&self, start: NodeId) -> NodeIds<'_, T> {
        let valid = self.nodes.contains_key(start);
        NodeIds {
            list: self,
            next: valid.then_some(start),
            remaining: if valid { self.len() } else { 0 },
        }
    }
}

impl<T: PartialEq> CircularList<T> {
    /// Returns the handle of the first node whose value equals `value`.
    #[must_use]
    pub fn get_value(&self, value: &T) -> Option<NodeId> {
        self.node_ids().find(|&id| self.nodes[id].value == *value)
    }
}

impl<T> FromIterator<T> for CircularList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for value in iter {
            list.insert_last(value);
        }
        list
    }
}

/// Iterator over node handles of a [`CircularList`].
pub struct NodeIds<'a, T> {
    list: &'a CircularList<T>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<T> Iterator for NodeIds<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.list.next(current);
        Some(current)
    }
}

use tracing::trace;

use crate::error::AllocationError;

use super::array::AllocationState;

/// Identifier of a single item. `0` is never handed out.
pub type ItemId = u32;

/// Allocator of single items, such as per-glyph slots in a uniform buffer.
///
/// Unlike arrays, freed items go back on a free list and are handed out
/// again before the untouched space at the end.
#[derive(Debug, Clone)]
pub struct ItemAllocationManager<O> {
    items: Vec<AllocationState<O>>,
    capacity: u32,
    free_list: Vec<ItemId>,
}

impl<O> ItemAllocationManager<O> {
    /// Creates a manager over `capacity` items, the first `null_items` of
    /// which are reserved. Item `0` is always reserved.
    #[must_use]
    pub fn new(capacity: u32, null_items: u32) -> Self {
        let reserved = null_items.max(1).min(capacity);
        let mut items = Vec::with_capacity(capacity as usize);
        items.resize_with(reserved as usize, || AllocationState::Reserved);
        Self {
            items,
            capacity,
            free_list: Vec::new(),
        }
    }

    /// Allocates one item. Returns `0` when the manager is full.
    #[allow(clippy::cast_possible_truncation)]
    pub fn alloc(&mut self, owner: O) -> ItemId {
        if let Some(id) = self.free_list.pop() {
            self.items[id as usize] = AllocationState::Live(owner);
            return id;
        }
        if self.items.len() as u32 >= self.capacity {
            trace!(capacity = self.capacity, "item allocation failed");
            return 0;
        }
        self.items.push(AllocationState::Live(owner));
        (self.items.len() - 1) as ItemId
    }

    /// Allocates `num_items` items into `ids`, or none at all.
    ///
    /// Returns `false` and leaves `ids` untouched if fewer than `num_items`
    /// items are available.
    pub fn alloc_many(&mut self, num_items: u32, owner: &O, ids: &mut Vec<ItemId>) -> bool
    where
        O: Clone,
    {
        if num_items > self.available() {
            return false;
        }
        ids.reserve(num_items as usize);
        for _ in 0..num_items {
            ids.push(self.alloc(owner.clone()));
        }
        true
    }

    /// Releases an item so it can be reused. Reserved items are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] for an id that was never
    /// allocated and [`AllocationError::DoubleFree`] for a freed one.
    pub fn free(&mut self, id: ItemId) -> Result<Option<O>, AllocationError> {
        let state = self
            .items
            .get_mut(id as usize)
            .ok_or_else(|| AllocationError::InvalidHandle {
                handle: id.to_string(),
            })?;
        if matches!(state, AllocationState::Reserved) {
            return Ok(None);
        }
        match std::mem::replace(state, AllocationState::Free) {
            AllocationState::Live(owner) => {
                self.free_list.push(id);
                Ok(Some(owner))
            }
            AllocationState::Free | AllocationState::Reserved => Err(AllocationError::DoubleFree {
                handle: id.to_string(),
            }),
        }
    }

    /// Owner of a live item.
    #[must_use]
    pub fn owner(&self, id: ItemId) -> Option<&O> {
        self.items.get(id as usize).and_then(AllocationState::owner)
    }

    /// Items that [`Self::alloc`] can still hand out.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn available(&self) -> u32 {
        self.capacity - self.items.len() as u32 + self.free_list.len() as u32
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn freed_items_are_reused_first() {
        let mut m = ItemAllocationManager::new(8, 1);
        let a = m.alloc('a');
        let b = m.alloc('b');
        assert_eq!((a, b), (1, 2));
        assert_eq!(m.free(a).unwrap(), Some('a'));
        assert_eq!(m.alloc('c'), a);
        assert_eq!(m.owner(a), Some(&'c'));
        assert_eq!(m.available(), 5);
    }

    #[test]
    fn alloc_many_is_all_or_nothing() {
        let mut m = ItemAllocationManager::new(5, 2);
        let mut ids = Vec::new();
        assert!(!m.alloc_many(4, &(), &mut ids));
        assert!(ids.is_empty());
        assert!(m.alloc_many(3, &(), &mut ids));
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(m.alloc(()), 0);
    }

    #[test]
    fn reserved_and_bad_ids() {
        let mut m: ItemAllocationManager<u8> = ItemAllocationManager::new(4, 0);
        assert!(m.free(0).unwrap().is_none());
        assert!(matches!(m.free(3), Err(AllocationError::InvalidHandle { .. })));
        let id = m.alloc(9);
        m.free(id).unwrap();
        assert!(matches!(m.free(id), Err(AllocationError::DoubleFree { .. })));
        assert!(m.owner(id).is_none());
    }
}

use tracing::trace;

use crate::error::AllocationError;

/// Identifier of an array allocation. `0` is the reserved null allocation
/// and doubles as the failure value of [`ArrayAllocationManager::alloc`].
pub type ArrayId = u32;

/// Liveness of a managed allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationState<O> {
    /// Freed; the space is not handed out again.
    Free,
    /// Permanently reserved by the manager itself.
    Reserved,
    /// In use by `O`.
    Live(O),
}

impl<O> AllocationState<O> {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    #[must_use]
    pub fn owner(&self) -> Option<&O> {
        match self {
            Self::Live(owner) => Some(owner),
            Self::Free | Self::Reserved => None,
        }
    }
}

/// A contiguous range of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayAllocation<O> {
    pub start_index: u32,
    pub num_items: u32,
    /// Next allocation in address order, `0` for the allocation at the end.
    pub next_rec: ArrayId,
    pub state: AllocationState<O>,
}

/// Bump allocator for arrays of items, such as ranges of a vertex buffer.
///
/// Arrays are only ever taken from the free space after the last array.
/// Freed arrays leave holes that are counted by [`Self::available`] but never
/// reused.
#[derive(Debug, Clone)]
pub struct ArrayAllocationManager<O> {
    allocations: Vec<ArrayAllocation<O>>,
    capacity: u32,
    first_item_available_at_the_end: u32,
    id_of_array_at_the_end: ArrayId,
    available: u32,
}

impl<O> ArrayAllocationManager<O> {
    /// Creates a manager over `capacity` items whose first `null_items`
    /// items form the reserved allocation `0`.
    #[must_use]
    pub fn new(capacity: u32, null_items: u32) -> Self {
        let null_items = null_items.min(capacity);
        Self {
            allocations: vec![ArrayAllocation {
                start_index: 0,
                num_items: null_items,
                next_rec: 0,
                state: AllocationState::Reserved,
            }],
            capacity,
            first_item_available_at_the_end: null_items,
            id_of_array_at_the_end: 0,
            available: 0,
        }
    }

    /// Allocates `num_items` contiguous items for `owner`.
    ///
    /// Returns `0` if the space after the last array is too small.
    #[allow(clippy::cast_possible_truncation)]
    pub fn alloc(&mut self, num_items: u32, owner: O) -> ArrayId {
        if num_items > self.available_at_the_end() {
            trace!(num_items, available = self.available_at_the_end(), "array allocation failed");
            return 0;
        }
        let id = self.allocations.len() as ArrayId;
        self.allocations.push(ArrayAllocation {
            start_index: self.first_item_available_at_the_end,
            num_items,
            next_rec: 0,
            state: AllocationState::Live(owner),
        });
        self.allocations[self.id_of_array_at_the_end as usize].next_rec = id;
        self.id_of_array_at_the_end = id;
        self.first_item_available_at_the_end += num_items;
        id
    }

    /// Releases an array and returns its owner. Freeing `0` does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] for an unknown id and
    /// [`AllocationError::DoubleFree`] for an id that was already freed.
    pub fn free(&mut self, id: ArrayId) -> Result<Option<O>, AllocationError> {
        if id == 0 {
            return Ok(None);
        }
        let allocation = self
            .allocations
            .get_mut(id as usize)
            .ok_or_else(|| AllocationError::InvalidHandle {
                handle: id.to_string(),
            })?;
        match std::mem::replace(&mut allocation.state, AllocationState::Free) {
            AllocationState::Live(owner) => {
                self.available += allocation.num_items;
                Ok(Some(owner))
            }
            AllocationState::Free => Err(AllocationError::DoubleFree {
                handle: id.to_string(),
            }),
            AllocationState::Reserved => {
                allocation.state = AllocationState::Reserved;
                Ok(None)
            }
        }
    }

    /// Returns the live allocation with `id`, or the reserved null array
    /// for `0`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] for an unknown or freed id.
    pub fn get(&self, id: ArrayId) -> Result<&ArrayAllocation<O>, AllocationError> {
        self.allocations
            .get(id as usize)
            .filter(|allocation| !matches!(allocation.state, AllocationState::Free))
            .ok_or_else(|| AllocationError::InvalidHandle {
                handle: id.to_string(),
            })
    }

    /// Items sitting in freed holes.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Items after the last array.
    #[must_use]
    pub fn available_at_the_end(&self) -> u32 {
        self.capacity - self.first_item_available_at_the_end
    }

    /// Largest array [`Self::alloc`] can currently satisfy.
    #[must_use]
    pub fn largest_available(&self) -> u32 {
        self.available_at_the_end()
    }

    #[must_use]
    pub fn id_of_array_at_the_end(&self) -> ArrayId {
        self.id_of_array_at_the_end
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Walks every allocation in address order, starting with the null
    /// allocation.
    pub fn iter(&self) -> impl Iterator<Item = (ArrayId, &ArrayAllocation<O>)> + '_ {
        let mut next = Some(0);
        std::iter::from_fn(move || {
            let id = next?;
            let allocation = self.allocations.get(id as usize)?;
            next = (allocation.next_rec != 0).then_some(allocation.next_rec);
            Some((id, allocation))
        })
    }
}

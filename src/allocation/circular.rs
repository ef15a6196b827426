//! Ring sub-allocator for streaming GPU buffer memory.
//!
//! The buffer is split into two used regions. Block2 grows towards the end
//! of the buffer while its oldest allocations are freed from the front.
//! Block1 then fills the space freed at the start of the buffer, below
//! Block2's start. Once Block2 drains completely the regions swap roles,
//! so the ring keeps rotating without ever moving live data.
//!
//! Allocation records live in fixed-size allocation blocks chained per
//! region. Runs of freed records are coalesced from the front block only,
//! which keeps both `alloc_internal` and `free_internal` amortized O(1).

use std::collections::VecDeque;
use std::ops::Range;

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::error::AllocationError;

new_key_type! {
    /// Handle of an allocation block.
    pub struct BlockId;
}

/// Handle of one ring allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationId {
    block: BlockId,
    slot: u32,
}

/// A record slot inside an [`AllocationBlock`].
#[derive(Debug)]
enum AllocationSlot<R> {
    Live {
        address: u64,
        num_bytes: u64,
        record: R,
    },
    /// Freed, but not yet reached by the free run at the block head.
    Freed,
    /// Part of the free run that starts at the block head.
    Coalesced,
}

/// Up to `RECORDS_PER_BLOCK` records of one used region, in address order.
#[derive(Debug)]
struct AllocationBlock<R> {
    region: usize,
    /// First slot after the free run at the block head.
    head: usize,
    slots: Vec<AllocationSlot<R>>,
}

#[derive(Debug)]
struct UsedRegion {
    start: u64,
    end: u64,
    blocks: VecDeque<BlockId>,
}

impl UsedRegion {
    fn empty_at(address: u64) -> Self {
        Self {
            start: address,
            end: address,
            blocks: VecDeque::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A live allocation seen through [`CircularAllocationMemory::live_allocations`].
#[derive(Debug, Clone, Copy)]
pub struct LiveAllocation<'a, R> {
    pub id: AllocationId,
    pub address: u64,
    pub num_bytes: u64,
    pub record: &'a R,
}

/// Circular allocator over `[buffer_start, buffer_start + buffer_size)`.
///
/// `R` is the caller's per-allocation record. Addresses are plain offsets;
/// what they point into is up to the caller.
#[derive(Debug)]
pub struct CircularAllocationMemory<R, const RECORDS_PER_BLOCK: usize = 64> {
    buffer_start: u64,
    buffer_end: u64,
    regions: [UsedRegion; 2],
    /// Index into `regions` of Block2, the region growing towards the end.
    block2: usize,
    blocks: SlotMap<BlockId, AllocationBlock<R>>,
    spare_block: Option<Vec<AllocationSlot<R>>>,
    used_bytes: u64,
    live_count: usize,
}

fn alignment(num_bytes: u64) -> u64 {
    if num_bytes >= 64 {
        64
    } else {
        16
    }
}

/// Aligned address at or after `end` where `num_bytes` fit below `limit`.
fn fit(end: u64, align: u64, num_bytes: u64, limit: u64) -> Option<u64> {
    let address = end.checked_next_multiple_of(align)?;
    let alloc_end = address.checked_add(num_bytes)?;
    (alloc_end <= limit).then_some(address)
}

fn invalid_handle(id: AllocationId) -> AllocationError {
    AllocationError::InvalidHandle {
        handle: format!("{id:?}"),
    }
}

impl<R, const RECORDS_PER_BLOCK: usize> CircularAllocationMemory<R, RECORDS_PER_BLOCK> {
    #[must_use]
    pub fn new(buffer_start: u64, buffer_size: u64) -> Self {
        Self {
            buffer_start,
            buffer_end: buffer_start.saturating_add(buffer_size),
            regions: [
                UsedRegion::empty_at(buffer_start),
                UsedRegion::empty_at(buffer_start),
            ],
            block2: 1,
            blocks: SlotMap::with_key(),
            spare_block: None,
            used_bytes: 0,
            live_count: 0,
        }
    }

    fn block1(&self) -> usize {
        1 - self.block2
    }

    /// Allocates `num_bytes`, aligned to 64 bytes for sizes of at least 64
    /// bytes and to 16 bytes otherwise.
    ///
    /// Tries the tail of Block2 first, then the tail of Block1. Returns
    /// `None` when neither has room; the caller decides whether to grow,
    /// flush or wait.
    pub fn alloc_internal(&mut self, num_bytes: u64, record: R) -> Option<AllocationId> {
        let align = alignment(num_bytes);
        let block2 = self.block2;
        let block1 = self.block1();

        if let Some(address) = fit(self.regions[block2].end, align, num_bytes, self.buffer_end) {
            return Some(self.push_allocation(block2, address, num_bytes, record));
        }
        let limit = self.regions[block2].start;
        if let Some(address) = fit(self.regions[block1].end, align, num_bytes, limit) {
            return Some(self.push_allocation(block1, address, num_bytes, record));
        }
        trace!(num_bytes, used_bytes = self.used_bytes, "ring allocation failed");
        None
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_allocation(&mut self, region: usize, address: u64, num_bytes: u64, record: R) -> AllocationId {
        let was_empty = self.regions[region].is_empty();
        let back = self.regions[region]
            .blocks
            .back()
            .copied()
            .filter(|&b| self.blocks.get(b).is_some_and(|block| block.slots.len() < RECORDS_PER_BLOCK));
        let block_id = match back {
            Some(b) => b,
            None => self.create_allocation_block(region),
        };

        let block = &mut self.blocks[block_id];
        let slot = block.slots.len();
        block.slots.push(AllocationSlot::Live {
            address,
            num_bytes,
            record,
        });

        let used = &mut self.regions[region];
        if was_empty {
            used.start = address;
        }
        used.end = address + num_bytes;
        self.used_bytes += num_bytes;
        self.live_count += 1;
        AllocationId {
            block: block_id,
            slot: slot as u32,
        }
    }

    fn create_allocation_block(&mut self, region: usize) -> BlockId {
        let (slots, recycled) = match self.spare_block.take() {
            Some(slots) => (slots, true),
            None => (Vec::with_capacity(RECORDS_PER_BLOCK), false),
        };
        let id = self.blocks.insert(AllocationBlock {
            region,
            head: 0,
            slots,
        });
        self.regions[region].blocks.push_back(id);
        debug!(recycled, blocks = self.blocks.len(), "created allocation block");
        id
    }

    /// Keeps at most one drained block around for reuse.
    fn recycle_allocation_block(&mut self, id: BlockId) {
        let Some(mut block) = self.blocks.remove(id) else {
            return;
        };
        if self.spare_block.is_none() {
            block.slots.clear();
            self.spare_block = Some(block.slots);
            trace!("kept spare allocation block");
        } else {
            trace!("released allocation block");
        }
    }

    /// Frees an allocation and hands back its record.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] if `id` does not refer to a
    /// tracked allocation and [`AllocationError::DoubleFree`] if it was
    /// already freed.
    pub fn free_internal(&mut self, id: AllocationId) -> Result<R, AllocationError> {
        let block = self.blocks.get_mut(id.block).ok_or_else(|| invalid_handle(id))?;
        let region = block.region;
        let slot = block
            .slots
            .get_mut(id.slot as usize)
            .ok_or_else(|| invalid_handle(id))?;
        match std::mem::replace(slot, AllocationSlot::Freed) {
            AllocationSlot::Live {
                num_bytes, record, ..
            } => {
                self.used_bytes -= num_bytes;
                self.live_count -= 1;
                self.destroy_allocation(region);
                Ok(record)
            }
            previous @ (AllocationSlot::Freed | AllocationSlot::Coalesced) => {
                *slot = previous;
                Err(AllocationError::DoubleFree {
                    handle: format!("{id:?}"),
                })
            }
        }
    }

    /// Extends the free run at the front of `region` and releases drained
    /// blocks. Moves the region start past the run.
    fn destroy_allocation(&mut self, region: usize) {
        while let Some(&front) = self.regions[region].blocks.front() {
            if let Some(block) = self.blocks.get_mut(front) {
                while matches!(block.slots.get(block.head), Some(AllocationSlot::Freed)) {
                    block.slots[block.head] = AllocationSlot::Coalesced;
                    block.head += 1;
                }
                if let Some(AllocationSlot::Live { address, .. }) = block.slots.get(block.head) {
                    self.regions[region].start = *address;
                    return;
                }
            }
            self.regions[region].blocks.pop_front();
            self.recycle_allocation_block(front);
        }
        self.reset_data_memory_pointers(region);
    }

    /// Called once `region` has no allocations left.
    fn reset_data_memory_pointers(&mut self, region: usize) {
        if region == self.block2 && !self.regions[self.block1()].is_empty() {
            self.block2 = self.block1();
            let rotated = &self.regions[self.block2];
            debug!(start = rotated.start, end = rotated.end, "ring rotated");
        }
        self.regions[region] = UsedRegion::empty_at(self.buffer_start);
    }

    /// Start address of a live allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] unless `id` is live.
    pub fn address(&self, id: AllocationId) -> Result<u64, AllocationError> {
        self.live_slot(id).map(|(address, _, _)| address)
    }

    /// Size requested for a live allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] unless `id` is live.
    pub fn num_bytes(&self, id: AllocationId) -> Result<u64, AllocationError> {
        self.live_slot(id).map(|(_, num_bytes, _)| num_bytes)
    }

    /// Record of a live allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidHandle`] unless `id` is live.
    pub fn record(&self, id: AllocationId) -> Result<&R, AllocationError> {
        self.live_slot(id).map(|(_, _, record)| record)
    }

    fn live_slot(&self, id: AllocationId) -> Result<(u64, u64, &R), AllocationError> {
        match self
            .blocks
            .get(id.block)
            .and_then(|block| block.slots.get(id.slot as usize))
        {
            Some(AllocationSlot::Live {
                address,
                num_bytes,
                record,
            }) => Ok((*address, *num_bytes, record)),
            _ => Err(invalid_handle(id)),
        }
    }

    /// Sum of the sizes of all live allocations.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Address range of Block1, the region refilling the start of the buffer.
    #[must_use]
    pub fn used_block1(&self) -> Range<u64> {
        let region = &self.regions[self.block1()];
        region.start..region.end
    }

    /// Address range of Block2, the region growing towards the buffer end.
    #[must_use]
    pub fn used_block2(&self) -> Range<u64> {
        let region = &self.regions[self.block2];
        region.start..region.end
    }

    #[must_use]
    pub fn buffer(&self) -> Range<u64> {
        self.buffer_start..self.buffer_end
    }

    /// Number of allocation blocks in use, not counting the spare.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn has_spare_block(&self) -> bool {
        self.spare_block.is_some()
    }

    /// Live allocations in address order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn live_allocations(&self) -> impl Iterator<Item = LiveAllocation<'_, R>> + '_ {
        [self.block1(), self.block2]
            .into_iter()
            .flat_map(move |region| self.regions[region].blocks.iter().copied())
            .filter_map(move |id| self.blocks.get(id).map(|block| (id, block)))
            .flat_map(|(block_id, block)| {
                block
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(move |(slot, entry)| match entry {
                        AllocationSlot::Live {
                            address,
                            num_bytes,
                            record,
                        } => Some(LiveAllocation {
                            id: AllocationId {
                                block: block_id,
                                slot: slot as u32,
                            },
                            address: *address,
                            num_bytes: *num_bytes,
                            record,
                        }),
                        AllocationSlot::Freed | AllocationSlot::Coalesced => None,
                    })
            })
    }
}

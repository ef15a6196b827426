//! Allocators for GPU buffer space.
//!
//! [`ArrayAllocationManager`] and [`ItemAllocationManager`] hand out index
//! ranges of long-lived buffers. [`CircularAllocationMemory`] sub-allocates
//! a streaming ring and [`StagingRing`] drives it frame by frame.

mod array;
mod circular;
mod item;
mod staging;

pub use array::{AllocationState, ArrayAllocation, ArrayAllocationManager, ArrayId};
pub use circular::{AllocationId, BlockId, CircularAllocationMemory, LiveAllocation};
pub use item::{ItemAllocationManager, ItemId};
pub use staging::{CopyRegion, GpuFence, StagingAllocation, StagingRing};

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AllocationError, Result};

use super::circular::{AllocationId, CircularAllocationMemory};

/// A GPU fence signalled when the commands of a frame have completed.
pub trait GpuFence {
    /// Waits up to `timeout` for the fence. Returns `true` once signalled.
    fn wait(&self, timeout: Duration) -> bool;
}

/// Destination of a staged copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRegion {
    /// Caller-defined handle of the destination buffer.
    pub dst_buffer: u64,
    pub dst_offset: u64,
}

/// Staging space handed out for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingAllocation {
    pub id: AllocationId,
    /// Offset of the writable range inside the staging buffer.
    pub offset: u64,
    pub size: u64,
    pub region: CopyRegion,
}

#[derive(Debug)]
struct InFlightFrame<F> {
    frame: u64,
    fence: F,
    allocations: Vec<AllocationId>,
}

/// Per-frame upload ring over a staging buffer.
///
/// Uploads recorded for a frame stay allocated until the fence submitted
/// with that frame signals, so the GPU never reads memory that has been
/// handed out again.
#[derive(Debug)]
pub struct StagingRing<F: GpuFence> {
    memory: CircularAllocationMemory<CopyRegion>,
    recording: Vec<StagingAllocation>,
    in_flight: VecDeque<InFlightFrame<F>>,
    frame: u64,
}

impl<F: GpuFence> StagingRing<F> {
    /// Creates a ring over a staging buffer of `size` bytes.
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self {
            memory: CircularAllocationMemory::new(0, size),
            recording: Vec::new(),
            in_flight: VecDeque::new(),
            frame: 0,
        }
    }

    /// Reserves `num_bytes` of staging space for a copy into `region`.
    ///
    /// Returns `None` if the ring is full; reclaiming finished frames may
    /// make room.
    pub fn allocate(&mut self, num_bytes: u64, region: CopyRegion) -> Option<StagingAllocation> {
        let id = self.memory.alloc_internal(num_bytes, region)?;
        let offset = self.memory.address(id).ok()?;
        let allocation = StagingAllocation {
            id,
            offset,
            size: num_bytes,
            region,
        };
        self.recording.push(allocation);
        Some(allocation)
    }

    /// Copies recorded for the current frame, in allocation order.
    #[must_use]
    pub fn pending_copies(&self) -> &[StagingAllocation] {
        &self.recording
    }

    /// Closes the current frame; its staging space is kept until `fence`
    /// signals. Returns the number of the submitted frame.
    pub fn submit_frame(&mut self, fence: F) -> u64 {
        let frame = self.frame;
        self.frame += 1;
        let allocations = self.recording.drain(..).map(|a| a.id).collect();
        self.in_flight.push_back(InFlightFrame {
            frame,
            fence,
            allocations,
        });
        frame
    }

    /// Frees the staging space of every in-flight frame whose fence has
    /// already signalled, oldest first, without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if a tracked allocation was freed behind the ring's back.
    pub fn reclaim_signalled(&mut self) -> Result<usize> {
        let mut reclaimed = 0;
        while let Some(oldest) = self.in_flight.front() {
            if !oldest.fence.wait(Duration::ZERO) {
                break;
            }
            self.release_oldest()?;
            reclaimed += 1;
        }
        Ok(reclaimed)
    }

    /// Waits for every in-flight frame, oldest first, and frees its space.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::ResourceTimeout`] if a fence does not
    /// signal within `timeout`. Frames before it are still reclaimed.
    pub fn reclaim(&mut self, timeout: Duration) -> Result<usize> {
        let mut reclaimed = 0;
        while let Some(oldest) = self.in_flight.front() {
            if !oldest.fence.wait(timeout) {
                warn!(frame = oldest.frame, ?timeout, "staging fence timed out");
                return Err(AllocationError::ResourceTimeout {
                    frame: oldest.frame,
                    timeout_ms: timeout.as_millis(),
                }
                .into());
            }
            self.release_oldest()?;
            reclaimed += 1;
        }
        Ok(reclaimed)
    }

    fn release_oldest(&mut self) -> Result<()> {
        let Some(frame) = self.in_flight.pop_front() else {
            return Ok(());
        };
        for id in frame.allocations {
            self.memory.free_internal(id)?;
        }
        debug!(
            frame = frame.frame,
            used_bytes = self.memory.used_bytes(),
            "reclaimed staging frame"
        );
        Ok(())
    }

    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.memory.used_bytes()
    }
}

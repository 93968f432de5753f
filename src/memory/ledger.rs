//! Live allocation bookkeeping and high-water-mark snapshots.
//!
//! Records are keyed by size (largest first) then address, so iterating a
//! ledger yields the biggest allocations first.

use super::space::{MemorySpace, NSPACES};
use crate::aggregator::FrameId;
use crate::utils::error::ProfilerError;
use log::debug;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

/// Ordering key of a live allocation: size descending, then address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationKey {
    pub size: u64,
    pub address: usize,
}

impl Ord for AllocationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (Reverse(self.size), self.address).cmp(&(Reverse(other.size), other.address))
    }
}

impl PartialOrd for AllocationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One live allocation. The address is only an identity, never read.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub name: String,
    pub address: usize,
    pub size: u64,
    /// Frame that was current when the allocation happened
    pub frame: FrameId,
}

/// Live allocations of one memory space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationLedger {
    total_bytes: u64,
    records: BTreeMap<AllocationKey, Allocation>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live records, largest first
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.records.values()
    }

    pub fn record_allocate(
        &mut self,
        name: &str,
        address: usize,
        size: u64,
        frame: FrameId,
    ) -> Result<(), ProfilerError> {
        let key = AllocationKey { size, address };
        if self.records.contains_key(&key) {
            return Err(ProfilerError::DuplicateAllocation {
                name: name.to_string(),
                address,
                size,
            });
        }
        let total_bytes = self.total_bytes.checked_add(size).ok_or_else(|| {
            ProfilerError::AllocationOverflow {
                name: name.to_string(),
                size,
                total: self.total_bytes,
            }
        })?;

        self.records.insert(
            key,
            Allocation {
                name: name.to_string(),
                address,
                size,
                frame,
            },
        );
        self.total_bytes = total_bytes;
        Ok(())
    }

    /// Remove a live record; the recorded size is subtracted, not `size`
    /// as passed, in case the caller reports it differently
    pub fn record_deallocate(
        &mut self,
        name: &str,
        address: usize,
        size: u64,
    ) -> Result<Allocation, ProfilerError> {
        let key = AllocationKey { size, address };
        let record = self
            .records
            .remove(&key)
            .ok_or_else(|| ProfilerError::UnknownAllocation {
                name: name.to_string(),
                address,
                size,
            })?;

        self.total_bytes -= record.size;
        Ok(record)
    }
}

/// Current ledgers plus the snapshot taken at each space's peak
#[derive(Debug, Clone, Default)]
pub struct SpaceLedgers {
    current: [AllocationLedger; NSPACES],
    high_water: [AllocationLedger; NSPACES],
}

impl SpaceLedgers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, space: MemorySpace) -> &AllocationLedger {
        &self.current[space.index()]
    }

    /// Ledger state at the moment `space` reached its highest total
    pub fn high_water(&self, space: MemorySpace) -> &AllocationLedger {
        &self.high_water[space.index()]
    }

    pub fn allocate(
        &mut self,
        space: MemorySpace,
        name: &str,
        address: usize,
        size: u64,
        frame: FrameId,
    ) -> Result<(), ProfilerError> {
        let idx = space.index();
        self.current[idx].record_allocate(name, address, size, frame)?;

        if self.current[idx].total_bytes() > self.high_water[idx].total_bytes() {
            debug!(
                "New {} high water mark: {} bytes in {} allocations",
                space.label(),
                self.current[idx].total_bytes(),
                self.current[idx].len()
            );
            self.high_water[idx] = self.current[idx].clone();
        }
        Ok(())
    }

    pub fn deallocate(
        &mut self,
        space: MemorySpace,
        name: &str,
        address: usize,
        size: u64,
    ) -> Result<(), ProfilerError> {
        self.current[space.index()]
            .record_deallocate(name, address, size)
            .map(|_| ())
    }

    /// Consume the ledgers, keeping only the peak snapshots
    pub fn into_high_water(self) -> [AllocationLedger; NSPACES] {
        self.high_water
    }
}

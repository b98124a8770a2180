/*!
 * Memory Traits
 * Engine abstractions for embedding hosts
 */

use super::manager::MemoryManager;
use super::metrics::FragmentationSample;
use super::types::{AllocationAlgorithm, Block, MemoryResult, MemoryStats, Region};
use crate::core::types::{Pid, Size};

/// Allocation engine interface
pub trait Allocator: Send + Sync {
    /// Allocate memory for a process under a placement strategy
    fn allocate(&self, pid: Pid, size: Size, algorithm: AllocationAlgorithm)
        -> MemoryResult<Region>;

    /// Release the allocation held by a process
    fn free(&self, pid: Pid) -> MemoryResult<()>;

    /// Free every live allocation; returns the count freed
    fn free_all(&self) -> usize;

    /// Reinitialize the address space, clearing all engine state
    fn reset(&self, total: Size, min_block: Size) -> MemoryResult<()>;
}

/// Metrics and snapshot provider
pub trait MemoryInfo: Send + Sync {
    /// Summary statistics
    fn stats(&self) -> MemoryStats;

    /// Ordered view of the address-space partition
    fn snapshot(&self) -> Vec<Block>;

    /// Current fragmentation sample
    fn metrics(&self) -> FragmentationSample;

    /// Append-only fragmentation history
    fn history(&self) -> Vec<FragmentationSample>;
}

impl Allocator for MemoryManager {
    fn allocate(
        &self,
        pid: Pid,
        size: Size,
        algorithm: AllocationAlgorithm,
    ) -> MemoryResult<Region> {
        MemoryManager::allocate(self, pid, size, algorithm)
    }

    fn free(&self, pid: Pid) -> MemoryResult<()> {
        MemoryManager::free(self, pid)
    }

    fn free_all(&self) -> usize {
        MemoryManager::free_all(self)
    }

    fn reset(&self, total: Size, min_block: Size) -> MemoryResult<()> {
        MemoryManager::reset(self, total, min_block)
    }
}

impl MemoryInfo for MemoryManager {
    fn stats(&self) -> MemoryStats {
        MemoryManager::stats(self)
    }

    fn snapshot(&self) -> Vec<Block> {
        MemoryManager::snapshot(self)
    }

    fn metrics(&self) -> FragmentationSample {
        MemoryManager::metrics(self)
    }

    fn history(&self) -> Vec<FragmentationSample> {
        MemoryManager::history(self)
    }
}

/*!
 * Memory Types
 * Common types for the allocation engine
 */

use crate::core::types::{Address, Pid, Size, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
///
/// Every operation is all-or-nothing: an error means no state was mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Invalid size: {requested} bytes (total memory {total} bytes)")]
    InvalidSize { requested: Size, total: Size },

    #[error("Out of memory: no free block satisfies {requested} bytes under {algorithm} ({available} bytes free / {total} total)")]
    OutOfMemory {
        requested: Size,
        available: Size,
        total: Size,
        algorithm: AllocationAlgorithm,
    },

    #[error("Duplicate process: PID {0} already holds an allocation")]
    DuplicateProcess(Pid),

    #[error("Not allocated: PID {0} holds no allocation")]
    NotAllocated(Pid),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Block state within the address-space partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    Free,
    Allocated,
}

/// One block of the address-space partition
///
/// Blocks are kept in strictly increasing `start` order and exactly cover
/// `[0, total_memory)`. `order` is set only for blocks managed by the buddy
/// arena, where `size = min_block_size << order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub start: Address,
    pub size: Size,
    pub state: BlockState,
    pub owner: Option<Pid>,
    pub order: Option<u8>,
}

impl Block {
    pub fn free(start: Address, size: Size) -> Self {
        Self {
            start,
            size,
            state: BlockState::Free,
            owner: None,
            order: None,
        }
    }

    /// Exclusive end offset
    #[inline]
    pub fn end(&self) -> Address {
        self.start + self.size
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self.state, BlockState::Free)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        matches!(self.state, BlockState::Allocated)
    }
}

/// Placement strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationAlgorithm {
    FirstFit,
    BestFit,
    WorstFit,
    NextFit,
    Buddy,
}

impl AllocationAlgorithm {
    pub const ALL: [AllocationAlgorithm; 5] = [
        AllocationAlgorithm::FirstFit,
        AllocationAlgorithm::BestFit,
        AllocationAlgorithm::WorstFit,
        AllocationAlgorithm::NextFit,
        AllocationAlgorithm::Buddy,
    ];
}

impl std::fmt::Display for AllocationAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AllocationAlgorithm::FirstFit => write!(f, "First Fit"),
            AllocationAlgorithm::BestFit => write!(f, "Best Fit"),
            AllocationAlgorithm::WorstFit => write!(f, "Worst Fit"),
            AllocationAlgorithm::NextFit => write!(f, "Next Fit"),
            AllocationAlgorithm::Buddy => write!(f, "Buddy System"),
        }
    }
}

/// Allocated region handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: Address,
    pub size: Size,
}

/// Append-only allocation log entry
///
/// A release appends a record with `released = true`; entries are never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub pid: Pid,
    pub start: Address,
    pub size: Size,
    pub algorithm: AllocationAlgorithm,
    pub released: bool,
    pub timestamp: Timestamp,
}

/// Memory statistics summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: Size,
    pub used_memory: Size,
    pub available_memory: Size,
    pub usage_percentage: f64,
    pub allocated_processes: usize,
    pub free_blocks: usize,
    pub total_blocks: usize,
    pub largest_free_block: Size,
    pub allocation_count: u64,
}

/*!
 * Memory Allocation Simulator
 * Core allocation engine exposed as a library
 */

pub mod core;
pub mod memory;
pub mod process;

// Re-exports
pub use memory::{
    AllocationAlgorithm, AllocationRecord, Allocator, Block, BlockState, BlockTable,
    FragmentationPressure, FragmentationSample, MemoryError, MemoryInfo, MemoryManager,
    MemoryResult, MemoryStats, Region,
};
pub use process::{Process, ProcessGenerator, ProcessState};

/*!
 * Memory Allocation Engine
 *
 * Simulates dynamic allocation over a fixed-size address space using five
 * classical placement strategies:
 *
 * - **First-Fit**: first free block in table order that is large enough
 * - **Best-Fit**: smallest qualifying free block (earliest start on ties)
 * - **Worst-Fit**: largest qualifying free block (earliest start on ties)
 * - **Next-Fit**: first-fit resuming from a cursor that follows the last
 *   successful allocation, wrapping around the table
 * - **Buddy System**: power-of-two blocks managed through per-order free
 *   lists with XOR buddy merging on release
 *
 * The [`BlockTable`] is the single source of truth for the address space: an
 * ordered partition of `[0, total_memory)` with no gaps or overlaps. Every
 * mutation re-checks the partition invariants in debug builds.
 *
 * [`MemoryManager`] orchestrates placement, split/coalesce, the owner map,
 * and an append-only allocation log. Fragmentation and utilization metrics
 * are sampled after every mutating operation into an append-only history.
 */

mod buddy;
mod manager;
mod metrics;
mod strategy;
mod table;
mod traits;
mod types;

pub use manager::MemoryManager;
pub use metrics::{FragmentationPressure, FragmentationSample};
pub use strategy::NextFitCursor;
pub use table::BlockTable;
pub use traits::{Allocator, MemoryInfo};
pub use types::{
    AllocationAlgorithm, AllocationRecord, Block, BlockState, MemoryError, MemoryResult,
    MemoryStats, Region,
};

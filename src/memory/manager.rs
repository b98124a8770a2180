/*!
 * Memory Manager
 *
 * Orchestrates placement, split/coalesce, the owner map, and the append-only
 * allocation and fragmentation logs. All state sits behind a single lock
 * held for the duration of one operation; every operation is all-or-nothing.
 */

use super::buddy::BuddyArena;
use super::metrics::FragmentationSample;
use super::strategy::{self, NextFitCursor};
use super::table::BlockTable;
use super::types::{
    AllocationAlgorithm, AllocationRecord, Block, MemoryError, MemoryResult, MemoryStats, Region,
};
use crate::core::types::{Pid, Size, Timestamp};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

/// Default simulated address space (1 MiB)
pub const DEFAULT_TOTAL_MEMORY: Size = 1024 * 1024;

/// Default buddy granularity
pub const DEFAULT_MIN_BLOCK: Size = 64;

/// Live allocation as tracked by the owner map. Keeps the original request
/// so buddy rounding overhead stays attributable.
#[derive(Debug, Clone)]
struct Ownership {
    region: Region,
    requested: Size,
    algorithm: AllocationAlgorithm,
    order: Option<u8>,
}

#[derive(Debug)]
struct ManagerInner {
    table: BlockTable,
    arena: BuddyArena,
    min_block: Size,
    owners: BTreeMap<Pid, Ownership>,
    records: Vec<AllocationRecord>,
    history: Vec<FragmentationSample>,
    cursor: NextFitCursor,
    active: Option<AllocationAlgorithm>,
    allocation_count: u64,
    // Total bytes over-allocated by rounding across live allocations
    overhead: Size,
}

/// Allocation engine over a fixed-size simulated address space
pub struct MemoryManager {
    inner: Mutex<ManagerInner>,
    origin: Instant,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOTAL_MEMORY, DEFAULT_MIN_BLOCK)
    }

    /// Create a manager with a custom address space (useful for testing)
    ///
    /// # Panics
    /// If `total` is zero, `min_block` is not a power of two, or
    /// `min_block > total`. Use [`MemoryManager::reset`] for a fallible
    /// reconfiguration.
    pub fn with_capacity(total: Size, min_block: Size) -> Self {
        assert!(
            validate_config(total, min_block).is_ok(),
            "invalid memory configuration: total {total}, min block {min_block}"
        );
        info!(
            "Memory manager initialized with {} bytes (buddy granularity {})",
            total, min_block
        );

        let manager = Self {
            inner: Mutex::new(ManagerInner {
                table: BlockTable::new(total),
                arena: BuddyArena::new(total, min_block),
                min_block,
                owners: BTreeMap::new(),
                records: Vec::new(),
                history: Vec::new(),
                cursor: NextFitCursor::default(),
                active: None,
                allocation_count: 0,
                overhead: 0,
            }),
            origin: Instant::now(),
        };
        // Baseline sample so trend charts start at the empty state
        {
            let mut inner = manager.inner.lock();
            inner.sample(0);
        }
        manager
    }

    /// Discard the table and reinitialize to one free block of `total`
    /// bytes. Clears the owner map, both logs, and the next-fit cursor.
    /// This is distinct from [`MemoryManager::free_all`], which frees each
    /// process individually and keeps the history.
    pub fn reset(&self, total: Size, min_block: Size) -> MemoryResult<()> {
        validate_config(total, min_block)?;

        let mut inner = self.inner.lock();
        inner.table = BlockTable::new(total);
        inner.arena = BuddyArena::new(total, min_block);
        inner.min_block = min_block;
        inner.owners.clear();
        inner.records.clear();
        inner.history.clear();
        inner.cursor.reset();
        inner.active = None;
        inner.allocation_count = 0;
        inner.overhead = 0;

        let timestamp = self.timestamp();
        inner.sample(timestamp);
        info!("Memory reset: {} bytes, min block {}", total, min_block);
        Ok(())
    }

    /// Allocate `size` bytes for `pid` under the given strategy. Returns the
    /// placed region; the buddy strategy may round the region up to the next
    /// power-of-two multiple of the minimum block size.
    pub fn allocate(
        &self,
        pid: Pid,
        size: Size,
        algorithm: AllocationAlgorithm,
    ) -> MemoryResult<Region> {
        let timestamp = self.timestamp();
        let mut inner = self.inner.lock();
        inner.allocate(pid, size, algorithm, timestamp)
    }

    /// Release the allocation held by `pid`, coalescing free neighbors
    pub fn free(&self, pid: Pid) -> MemoryResult<()> {
        let timestamp = self.timestamp();
        let mut inner = self.inner.lock();
        inner.free(pid, timestamp)
    }

    /// Free every live allocation, one process at a time, so intermediate
    /// fragmentation samples remain meaningful. Returns the count freed.
    pub fn free_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let pids: Vec<Pid> = inner.owners.keys().copied().collect();
        let mut freed = 0;
        for pid in pids {
            let timestamp = self.timestamp();
            if inner.free(pid, timestamp).is_ok() {
                freed += 1;
            }
        }
        info!("Freed all allocations ({} processes)", freed);
        freed
    }

    /// Slide allocated blocks to the front of the address space, leaving one
    /// trailing free block. Returns the number of blocks that moved.
    pub fn compact(&self) -> usize {
        let timestamp = self.timestamp();
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        let moves = inner.table.compact();
        for (pid, _, new_start) in &moves {
            if let Some(own) = inner.owners.get_mut(pid) {
                own.region.start = *new_start;
            }
        }
        // Compaction breaks power-of-two alignment: tagged blocks fall back
        // to ordinary coalescing on release
        for own in inner.owners.values_mut() {
            own.order = None;
        }
        inner.arena.clear();
        if inner.active == Some(AllocationAlgorithm::Buddy) {
            inner.arena.rebuild(&mut inner.table);
        }

        inner.sample(timestamp);
        info!("Compacted memory: {} blocks moved", moves.len());
        moves.len()
    }

    /// Ordered view of the address-space partition
    pub fn snapshot(&self) -> Vec<Block> {
        self.inner.lock().table.blocks().to_vec()
    }

    /// Current fragmentation sample (computed, not appended)
    pub fn metrics(&self) -> FragmentationSample {
        let inner = self.inner.lock();
        FragmentationSample::compute(&inner.table, inner.overhead, self.timestamp())
    }

    /// Append-only fragmentation history, oldest first
    pub fn history(&self) -> Vec<FragmentationSample> {
        self.inner.lock().history.clone()
    }

    /// Append-only allocation log, oldest first
    pub fn records(&self) -> Vec<AllocationRecord> {
        self.inner.lock().records.clone()
    }

    pub fn stats(&self) -> MemoryStats {
        let inner = self.inner.lock();
        let total = inner.table.total();
        let used = inner.table.used_bytes();
        MemoryStats {
            total_memory: total,
            used_memory: used,
            available_memory: total - used,
            usage_percentage: if total == 0 {
                0.0
            } else {
                used as f64 / total as f64 * 100.0
            },
            allocated_processes: inner.owners.len(),
            free_blocks: inner.table.find_free(1).count(),
            total_blocks: inner.table.len(),
            largest_free_block: inner.table.largest_free(),
            allocation_count: inner.allocation_count,
        }
    }

    pub fn total_memory(&self) -> Size {
        self.inner.lock().table.total()
    }

    pub fn min_block_size(&self) -> Size {
        self.inner.lock().min_block
    }

    /// Run the full table consistency check (test harness hook)
    pub fn verify(&self) -> MemoryResult<()> {
        self.inner.lock().table.check_invariants()
    }

    /// Plain-text rendering of the memory map
    pub fn render_map(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        let rule = "=".repeat(72);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "MEMORY MAP");
        let _ = writeln!(out, "{rule}");
        for block in inner.table.blocks() {
            let status = match block.owner {
                Some(pid) => format!("PID:{pid}"),
                None => "FREE".to_string(),
            };
            let _ = writeln!(
                out,
                "[{:>8} - {:>8}] {:<12} {:>8} bytes",
                block.start,
                block.end() - 1,
                status,
                block.size
            );
        }
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Total: {} bytes | Free: {} bytes | Processes: {}",
            inner.table.total(),
            inner.table.free_bytes(),
            inner.owners.len()
        );
        out
    }

    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerInner {
    fn allocate(
        &mut self,
        pid: Pid,
        size: Size,
        algorithm: AllocationAlgorithm,
        timestamp: Timestamp,
    ) -> MemoryResult<Region> {
        let total = self.table.total();
        if size == 0 || size > total {
            warn!("Rejected allocation of {} bytes for PID {}: invalid size", size, pid);
            return Err(MemoryError::InvalidSize {
                requested: size,
                total,
            });
        }
        if self.owners.contains_key(&pid) {
            return Err(MemoryError::DuplicateProcess(pid));
        }

        let out_of_memory = |inner: &Self| MemoryError::OutOfMemory {
            requested: size,
            available: inner.table.free_bytes(),
            total,
            algorithm,
        };

        let (region, order) = match algorithm {
            AllocationAlgorithm::Buddy => {
                // Switching to buddy re-carves the free space. Keep the
                // pre-switch partition so a rejected request rolls back and
                // the failed call leaves no trace.
                let switching = self.active != Some(algorithm);
                let saved = switching.then(|| (self.table.clone(), self.arena.clone()));
                if switching {
                    self.arena.rebuild(&mut self.table);
                }
                let placed = match self.arena.allocate(&mut self.table, size) {
                    Ok(placed) => placed,
                    Err(err) => {
                        if let Some((table, arena)) = saved {
                            self.table = table;
                            self.arena = arena;
                        }
                        return Err(err);
                    }
                };
                let Some((start, order)) = placed else {
                    if let Some((table, arena)) = saved {
                        self.table = table;
                        self.arena = arena;
                    }
                    warn!(
                        "OOM: PID {} requested {} bytes under {} ({} bytes free)",
                        pid,
                        size,
                        algorithm,
                        self.table.free_bytes()
                    );
                    return Err(out_of_memory(self));
                };
                let rounded = self.arena.size_of(order);
                let index = self.table.index_of(start).ok_or_else(|| {
                    MemoryError::InvariantViolation(format!(
                        "buddy block at {start} missing from table"
                    ))
                })?;
                let region = self.table.split(index, rounded, pid, Some(order))?;
                (region, Some(order))
            }
            _ => {
                // A freshly activated next-fit searches from the table head
                if algorithm == AllocationAlgorithm::NextFit && self.active != Some(algorithm) {
                    self.cursor.reset();
                }
                let Some(index) = strategy::select(algorithm, &self.table, &mut self.cursor, size)
                else {
                    warn!(
                        "OOM: PID {} requested {} bytes under {} ({} bytes free)",
                        pid,
                        size,
                        algorithm,
                        self.table.free_bytes()
                    );
                    return Err(out_of_memory(self));
                };
                // A contiguous strategy may consume a block the buddy arena
                // still tracks; withdraw it first
                let block = &self.table.blocks()[index];
                if let Some(order) = block.order {
                    self.arena.withdraw(block.start, order);
                    self.table.set_order(index, None);
                }
                let region = self.table.split(index, size, pid, None)?;
                (region, None)
            }
        };

        self.active = Some(algorithm);
        self.overhead += region.size - size;
        self.owners.insert(
            pid,
            Ownership {
                region,
                requested: size,
                algorithm,
                order,
            },
        );
        self.records.push(AllocationRecord {
            pid,
            start: region.start,
            size: region.size,
            algorithm,
            released: false,
            timestamp,
        });
        self.allocation_count += 1;
        self.sample(timestamp);

        info!(
            "Allocated {} bytes at {} for PID {} via {}",
            region.size, region.start, pid, algorithm
        );
        Ok(region)
    }

    fn free(&mut self, pid: Pid, timestamp: Timestamp) -> MemoryResult<()> {
        let own = self
            .owners
            .get(&pid)
            .cloned()
            .ok_or(MemoryError::NotAllocated(pid))?;
        let index = self.table.index_of(own.region.start).ok_or_else(|| {
            MemoryError::InvariantViolation(format!(
                "owned block at {} missing from table",
                own.region.start
            ))
        })?;

        match own.order {
            Some(order) => {
                self.table.mark_free(index);
                self.arena.release(&mut self.table, own.region.start, order)?;
            }
            None => {
                self.table.release(index);
                // Untagged space is invisible to the buddy free lists; while
                // buddy is active, re-carve so the arena can place into it
                if self.active == Some(AllocationAlgorithm::Buddy) {
                    self.arena.rebuild(&mut self.table);
                }
            }
        }

        self.owners.remove(&pid);
        self.overhead -= own.region.size - own.requested;
        self.records.push(AllocationRecord {
            pid,
            start: own.region.start,
            size: own.region.size,
            algorithm: own.algorithm,
            released: true,
            timestamp,
        });
        self.sample(timestamp);

        info!(
            "Freed {} bytes at {} for PID {}",
            own.region.size, own.region.start, pid
        );
        Ok(())
    }

    fn sample(&mut self, timestamp: Timestamp) {
        self.history
            .push(FragmentationSample::compute(&self.table, self.overhead, timestamp));
    }
}

fn validate_config(total: Size, min_block: Size) -> MemoryResult<()> {
    if total == 0 || min_block == 0 || min_block > total || !min_block.is_power_of_two() {
        return Err(MemoryError::InvalidSize {
            requested: min_block,
            total,
        });
    }
    Ok(())
}

/*!
 * Memory Manager Tests
 * Allocation, release, reset, and bookkeeping behavior of the engine surface
 */

use memsim::{
    AllocationAlgorithm, Allocator, Block, FragmentationSample, MemoryError, MemoryInfo,
    MemoryManager,
};
use pretty_assertions::assert_eq;

fn free_partition(manager: &MemoryManager) -> Vec<(usize, usize)> {
    manager
        .snapshot()
        .iter()
        .filter(|b| b.is_free())
        .map(|b| (b.start, b.size))
        .collect()
}

#[test]
fn initialization_is_one_free_block() {
    let manager = MemoryManager::with_capacity(1024, 16);
    let blocks = manager.snapshot();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start, 0);
    assert_eq!(blocks[0].size, 1024);
    assert!(blocks[0].is_free());

    let stats = manager.stats();
    assert_eq!(stats.total_memory, 1024);
    assert_eq!(stats.used_memory, 0);
    assert_eq!(stats.available_memory, 1024);
    assert_eq!(stats.allocated_processes, 0);

    // Baseline sample is recorded at construction
    assert_eq!(manager.history().len(), 1);
}

#[test]
fn allocate_returns_region_and_updates_stats() {
    let manager = MemoryManager::with_capacity(1024, 16);
    let region = manager
        .allocate(1, 256, AllocationAlgorithm::FirstFit)
        .unwrap();
    assert_eq!(region.start, 0);
    assert_eq!(region.size, 256);

    let stats = manager.stats();
    assert_eq!(stats.used_memory, 256);
    assert_eq!(stats.available_memory, 768);
    assert_eq!(stats.allocated_processes, 1);
    assert_eq!(stats.allocation_count, 1);
}

#[test]
fn zero_and_oversized_requests_are_invalid() {
    let manager = MemoryManager::with_capacity(1024, 16);

    let err = manager
        .allocate(1, 0, AllocationAlgorithm::FirstFit)
        .unwrap_err();
    assert!(matches!(err, MemoryError::InvalidSize { requested: 0, .. }));

    let err = manager
        .allocate(1, 2048, AllocationAlgorithm::FirstFit)
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::InvalidSize {
            requested: 2048,
            total: 1024
        }
    ));

    // Rejection left no trace
    assert_eq!(manager.snapshot().len(), 1);
    assert_eq!(manager.history().len(), 1);
    assert!(manager.records().is_empty());
}

#[test]
fn duplicate_pid_is_rejected() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(7, 128, AllocationAlgorithm::FirstFit)
        .unwrap();
    let err = manager
        .allocate(7, 64, AllocationAlgorithm::FirstFit)
        .unwrap_err();
    assert_eq!(err, MemoryError::DuplicateProcess(7));
    assert_eq!(manager.stats().allocated_processes, 1);
}

#[test]
fn free_of_unknown_pid_is_rejected() {
    let manager = MemoryManager::with_capacity(1024, 16);
    assert_eq!(manager.free(3).unwrap_err(), MemoryError::NotAllocated(3));
}

#[test]
fn out_of_memory_leaves_state_untouched() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(1, 600, AllocationAlgorithm::FirstFit)
        .unwrap();
    let before = manager.snapshot();
    let history_len = manager.history().len();

    let err = manager
        .allocate(2, 600, AllocationAlgorithm::FirstFit)
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::OutOfMemory {
            requested: 600,
            available: 424,
            ..
        }
    ));
    assert_eq!(manager.snapshot(), before);
    assert_eq!(manager.history().len(), history_len);
}

#[test]
fn allocate_then_free_restores_the_free_partition() {
    for algorithm in AllocationAlgorithm::ALL {
        let manager = MemoryManager::with_capacity(1024, 16);
        // Fragment the space with the algorithm under test, so the starting
        // point is a state that algorithm itself can reach
        manager.allocate(1, 100, algorithm).unwrap();
        manager.allocate(2, 200, algorithm).unwrap();
        manager.free(1).unwrap();

        let before = free_partition(&manager);
        manager.allocate(9, 80, algorithm).unwrap();
        manager.free(9).unwrap();
        assert_eq!(
            free_partition(&manager),
            before,
            "round-trip broke the partition under {algorithm}"
        );
        manager.verify().unwrap();
    }
}

#[test]
fn free_all_frees_each_process_individually() {
    let manager = MemoryManager::with_capacity(1024, 16);
    for pid in 1..=3 {
        manager
            .allocate(pid, 100, AllocationAlgorithm::FirstFit)
            .unwrap();
    }
    let history_before = manager.history().len();

    assert_eq!(manager.free_all(), 3);
    assert_eq!(manager.stats().allocated_processes, 0);
    assert_eq!(manager.snapshot().len(), 1);

    // One sample per individual free keeps the trend meaningful
    assert_eq!(manager.history().len(), history_before + 3);
    // Each free also appended a release record
    assert_eq!(manager.records().iter().filter(|r| r.released).count(), 3);
}

#[test]
fn reset_discards_everything() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(1, 100, AllocationAlgorithm::NextFit)
        .unwrap();
    manager
        .allocate(2, 50, AllocationAlgorithm::NextFit)
        .unwrap();

    manager.reset(2048, 32).unwrap();
    assert_eq!(manager.total_memory(), 2048);
    assert_eq!(manager.min_block_size(), 32);
    assert_eq!(manager.snapshot().len(), 1);
    assert_eq!(manager.stats().allocated_processes, 0);
    assert_eq!(manager.stats().allocation_count, 0);
    assert!(manager.records().is_empty());
    assert_eq!(manager.history().len(), 1);

    // Previously active pids are gone
    assert_eq!(manager.free(1).unwrap_err(), MemoryError::NotAllocated(1));
}

#[test]
fn reset_rejects_bad_configuration() {
    let manager = MemoryManager::with_capacity(1024, 16);
    assert!(manager.reset(0, 16).is_err());
    assert!(manager.reset(1024, 0).is_err());
    assert!(manager.reset(1024, 48).is_err()); // not a power of two
    assert!(manager.reset(16, 32).is_err()); // min block exceeds total
    // Failed reset left the old space intact
    assert_eq!(manager.total_memory(), 1024);
}

#[test]
fn compact_consolidates_free_space() {
    let manager = MemoryManager::with_capacity(1024, 16);
    for pid in 1..=4 {
        manager
            .allocate(pid, 100, AllocationAlgorithm::FirstFit)
            .unwrap();
    }
    manager.free(2).unwrap();
    manager.free(4).unwrap();

    let moved = manager.compact();
    assert_eq!(moved, 1); // only P3 sat behind a hole

    let blocks = manager.snapshot();
    let free: Vec<&Block> = blocks.iter().filter(|b| b.is_free()).collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].start, 200);
    assert_eq!(free[0].size, 824);
    manager.verify().unwrap();

    // Owner map tracked the move: freeing P3 releases its new location
    manager.free(3).unwrap();
    assert_eq!(manager.snapshot().len(), 2);
}

#[test]
fn allocation_log_is_append_only() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(5, 128, AllocationAlgorithm::BestFit)
        .unwrap();
    let first = manager.records()[0].clone();
    assert!(!first.released);
    assert_eq!(first.pid, 5);
    assert_eq!(first.size, 128);
    assert_eq!(first.algorithm, AllocationAlgorithm::BestFit);

    manager.free(5).unwrap();
    let records = manager.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], first); // earlier entries never mutate
    assert!(records[1].released);
    assert!(records[1].timestamp >= first.timestamp);
}

#[test]
fn trait_objects_expose_the_engine_surface() {
    let manager = MemoryManager::with_capacity(1024, 16);
    let allocator: &dyn Allocator = &manager;
    let info: &dyn MemoryInfo = &manager;

    allocator.allocate(1, 64, AllocationAlgorithm::FirstFit).unwrap();
    assert_eq!(info.stats().used_memory, 64);
    allocator.free(1).unwrap();
    assert_eq!(info.snapshot().len(), 1);
}

#[test]
fn snapshot_and_history_survive_serialization() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(1, 300, AllocationAlgorithm::WorstFit)
        .unwrap();
    manager
        .allocate(2, 100, AllocationAlgorithm::WorstFit)
        .unwrap();
    manager.free(1).unwrap();

    let blocks_json = serde_json::to_string(&manager.snapshot()).unwrap();
    let history_json = serde_json::to_string(&manager.history()).unwrap();

    let blocks: Vec<Block> = serde_json::from_str(&blocks_json).unwrap();
    let history: Vec<FragmentationSample> = serde_json::from_str(&history_json).unwrap();
    assert_eq!(blocks, manager.snapshot());
    assert_eq!(history, manager.history());
}

/*!
 * Buddy System Tests
 * Power-of-two rounding, split cascades, and XOR buddy merging through the
 * engine surface
 */

use memsim::{AllocationAlgorithm, MemoryError, MemoryManager};
use pretty_assertions::assert_eq;

#[test]
fn requests_round_up_to_the_next_power_of_two() {
    let manager = MemoryManager::with_capacity(1024, 16);
    let region = manager.allocate(1, 50, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!(region.size, 64);
    assert_eq!(region.start, 0);

    // 14 wasted bytes out of 64 allocated
    let sample = manager.metrics();
    assert!((sample.internal_frag_pct - 14.0 / 64.0 * 100.0).abs() < 1e-9);
}

#[test]
fn splitting_parks_unused_halves_at_each_order() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager.allocate(1, 50, AllocationAlgorithm::Buddy).unwrap();

    // 1024 split down to 64: free halves at 64, 128, 256, 512
    let free_blocks: Vec<(usize, usize)> = manager
        .snapshot()
        .iter()
        .filter(|b| b.is_free())
        .map(|b| (b.start, b.size))
        .collect();
    assert_eq!(free_blocks, vec![(64, 64), (128, 128), (256, 256), (512, 512)]);
    manager.verify().unwrap();
}

#[test]
fn freeing_both_buddies_merges_them_and_cascades() {
    let manager = MemoryManager::with_capacity(256, 16);
    let a = manager.allocate(1, 32, AllocationAlgorithm::Buddy).unwrap();
    let b = manager.allocate(2, 32, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((a.start, b.start), (0, 32));

    // Freeing one half leaves it waiting for its buddy
    manager.free(1).unwrap();
    assert!(manager
        .snapshot()
        .iter()
        .any(|blk| blk.start == 0 && blk.size == 32 && blk.is_free()));

    // Freeing the other merges 0+32, then cascades through 64 and 128
    manager.free(2).unwrap();
    let blocks = manager.snapshot();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].size, 256);
    assert!(blocks[0].is_free());
    manager.verify().unwrap();
}

#[test]
fn a_block_never_merges_with_a_non_buddy_neighbor() {
    let manager = MemoryManager::with_capacity(256, 16);
    // Layout: [P1 32 @ 0][P2 32 @ 32][P3 64 @ 64][free 128 @ 128]
    manager.allocate(1, 32, AllocationAlgorithm::Buddy).unwrap();
    manager.allocate(2, 32, AllocationAlgorithm::Buddy).unwrap();
    manager.allocate(3, 64, AllocationAlgorithm::Buddy).unwrap();

    // 32 @ 32 and 64 @ 64 are adjacent but not buddies: 32 ^ 32 = 0
    manager.free(2).unwrap();
    manager.free(3).unwrap();
    let blocks = manager.snapshot();
    assert!(blocks
        .iter()
        .any(|b| b.start == 32 && b.size == 32 && b.is_free()));
    assert!(blocks
        .iter()
        .any(|b| b.start == 64 && b.size == 64 && b.is_free()));
    manager.verify().unwrap();
}

#[test]
fn oom_when_no_order_can_satisfy_the_request() {
    let manager = MemoryManager::with_capacity(128, 16);
    manager.allocate(1, 100, AllocationAlgorithm::Buddy).unwrap(); // takes all 128

    let err = manager
        .allocate(2, 16, AllocationAlgorithm::Buddy)
        .unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
}

#[test]
fn oversized_buddy_request_is_oom_not_a_split() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager.allocate(1, 16, AllocationAlgorithm::Buddy).unwrap();
    // 1000 rounds to 1024, and no free block of that order exists
    let err = manager
        .allocate(2, 1000, AllocationAlgorithm::Buddy)
        .unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
}

#[test]
fn internal_fragmentation_disappears_when_blocks_are_freed() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager.allocate(1, 50, AllocationAlgorithm::Buddy).unwrap();
    assert!(manager.metrics().internal_frag_pct > 0.0);

    manager.free(1).unwrap();
    assert_eq!(manager.metrics().internal_frag_pct, 0.0);
}

#[test]
fn non_power_of_two_totals_carve_what_they_can() {
    let manager = MemoryManager::with_capacity(96, 16);
    // Carved as 64 @ 0 and 32 @ 64
    let region = manager.allocate(1, 50, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((region.start, region.size), (0, 64));
    let region = manager.allocate(2, 20, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((region.start, region.size), (64, 32));

    let err = manager
        .allocate(3, 16, AllocationAlgorithm::Buddy)
        .unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
}

#[test]
fn rejected_buddy_switch_leaves_the_partition_untouched() {
    let manager = MemoryManager::with_capacity(1024, 16);
    manager
        .allocate(1, 50, AllocationAlgorithm::FirstFit)
        .unwrap();
    let before = manager.snapshot();

    // 900 rounds to 1024 and no aligned chunk that large exists, so the
    // switch to buddy must not stick: the free space stays un-carved
    let err = manager
        .allocate(2, 900, AllocationAlgorithm::Buddy)
        .unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { .. }));
    assert_eq!(manager.snapshot(), before);
    manager.verify().unwrap();

    // A satisfiable request afterwards still switches and carves
    let region = manager.allocate(3, 500, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((region.start, region.size), (512, 512));
    manager.verify().unwrap();
}

#[test]
fn freed_contiguous_space_reenters_the_arena_under_buddy() {
    let manager = MemoryManager::with_capacity(256, 16);
    manager
        .allocate(1, 128, AllocationAlgorithm::FirstFit)
        .unwrap();
    manager.allocate(2, 64, AllocationAlgorithm::Buddy).unwrap();

    // P1's space returns untagged while buddy is active; the arena must
    // pick it up or this request has nowhere to go
    manager.free(1).unwrap();
    let region = manager.allocate(3, 100, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((region.start, region.size), (0, 128));
    manager.verify().unwrap();
}

#[test]
fn switching_to_buddy_mid_session_carves_the_free_space() {
    let manager = MemoryManager::with_capacity(256, 16);
    manager
        .allocate(1, 50, AllocationAlgorithm::FirstFit)
        .unwrap();

    // Free space is [50, 256): the misaligned head up to 64 is skipped,
    // aligned chunks 64 @ 64 and 128 @ 128 are carved
    let region = manager.allocate(2, 40, AllocationAlgorithm::Buddy).unwrap();
    assert_eq!((region.start, region.size), (64, 64));
    manager.verify().unwrap();

    // The contiguous allocation is untouched and still releases cleanly
    manager.free(1).unwrap();
    manager.verify().unwrap();
}

#[test]
fn contiguous_strategies_can_consume_buddy_carved_blocks() {
    let manager = MemoryManager::with_capacity(256, 16);
    manager.allocate(1, 32, AllocationAlgorithm::Buddy).unwrap();

    // First-fit takes part of a block the arena still tracks; the arena
    // must forget it, or a later buddy allocation would double-place
    let region = manager
        .allocate(2, 20, AllocationAlgorithm::FirstFit)
        .unwrap();
    assert_eq!(region.start, 32);

    let region = manager.allocate(3, 30, AllocationAlgorithm::Buddy).unwrap();
    assert!(region.start >= 64, "buddy reused a withdrawn block");
    manager.verify().unwrap();
}

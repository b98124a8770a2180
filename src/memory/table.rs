/*!
 * Block Table
 *
 * Ordered partition of the simulated address space. Blocks are kept sorted
 * by `start`, never overlap, and always cover `[0, total)` exactly. All
 * split/coalesce logic lives here; placement strategies only select indices.
 */

use super::types::{Block, BlockState, MemoryError, MemoryResult, Region};
use crate::core::types::{Address, Pid, Size};

#[derive(Debug, Clone)]
pub struct BlockTable {
    total: Size,
    blocks: Vec<Block>,
}

impl BlockTable {
    /// Create a table covering `[0, total)` with a single free block
    pub fn new(total: Size) -> Self {
        Self {
            total,
            blocks: vec![Block::free(0, total)],
        }
    }

    #[inline]
    pub fn total(&self) -> Size {
        self.total
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Locate a block by its start offset
    pub fn index_of(&self, start: Address) -> Option<usize> {
        self.blocks.binary_search_by_key(&start, |b| b.start).ok()
    }

    /// Free blocks of at least `min_size`, as indices in table order
    pub fn find_free(&self, min_size: Size) -> impl Iterator<Item = usize> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.is_free() && b.size >= min_size)
            .map(|(i, _)| i)
    }

    /// Sum of free bytes
    pub fn free_bytes(&self) -> Size {
        self.blocks
            .iter()
            .filter(|b| b.is_free())
            .map(|b| b.size)
            .sum()
    }

    /// Sum of allocated bytes
    pub fn used_bytes(&self) -> Size {
        self.blocks
            .iter()
            .filter(|b| b.is_allocated())
            .map(|b| b.size)
            .sum()
    }

    /// Largest free block size, 0 if none
    pub fn largest_free(&self) -> Size {
        self.blocks
            .iter()
            .filter(|b| b.is_free())
            .map(|b| b.size)
            .max()
            .unwrap_or(0)
    }

    /// Free blocks as `(start, size)` regions in table order
    pub(super) fn free_regions(&self) -> Vec<(Address, Size)> {
        self.blocks
            .iter()
            .filter(|b| b.is_free())
            .map(|b| (b.start, b.size))
            .collect()
    }

    /// Shrink the free block at `index` to exactly `requested` bytes at its
    /// original start, mark it allocated, and insert the remainder (if any)
    /// as a free block immediately after it.
    pub fn split(
        &mut self,
        index: usize,
        requested: Size,
        owner: Pid,
        order: Option<u8>,
    ) -> MemoryResult<Region> {
        let block = &self.blocks[index];
        if !block.is_free() || requested == 0 || requested > block.size {
            return Err(MemoryError::InvalidSize {
                requested,
                total: block.size,
            });
        }

        let start = block.start;
        let remainder = block.size - requested;

        let block = &mut self.blocks[index];
        block.size = requested;
        block.state = BlockState::Allocated;
        block.owner = Some(owner);
        block.order = order;

        if remainder > 0 {
            self.blocks
                .insert(index + 1, Block::free(start + requested, remainder));
        }

        self.debug_check();
        Ok(Region {
            start,
            size: requested,
        })
    }

    /// Mark the block at `index` free and coalesce with untagged free
    /// neighbors (at most a 3-way merge). Returns the index of the merged
    /// block. Buddy-tagged neighbors are left to the buddy arena.
    pub fn release(&mut self, index: usize) -> usize {
        let block = &mut self.blocks[index];
        block.state = BlockState::Free;
        block.owner = None;
        block.order = None;

        let mut index = index;

        // Merge with the following block first so `index` stays valid
        if index + 1 < self.blocks.len() {
            let next = &self.blocks[index + 1];
            if next.is_free() && next.order.is_none() {
                let next_size = next.size;
                self.blocks[index].size += next_size;
                self.blocks.remove(index + 1);
            }
        }

        if index > 0 {
            let prev = &self.blocks[index - 1];
            if prev.is_free() && prev.order.is_none() {
                let size = self.blocks[index].size;
                self.blocks[index - 1].size += size;
                self.blocks.remove(index);
                index -= 1;
            }
        }

        self.debug_check();
        index
    }

    /// Mark free without coalescing; the buddy release path merges via
    /// explicit pair merges instead. No invariant check here: an unmerged
    /// free buddy is a legal transient until the arena finishes merging.
    pub(super) fn mark_free(&mut self, index: usize) {
        let block = &mut self.blocks[index];
        block.state = BlockState::Free;
        block.owner = None;
    }

    /// Split the free block at `index` into `[start, start + first_size)` and
    /// `[start + first_size, end)`, both free. Order tags are the caller's
    /// responsibility.
    pub(super) fn split_at(&mut self, index: usize, first_size: Size) {
        let block = &self.blocks[index];
        debug_assert!(block.is_free());
        debug_assert!(first_size > 0 && first_size < block.size);

        let upper_start = block.start + first_size;
        let upper_size = block.size - first_size;
        self.blocks[index].size = first_size;
        self.blocks
            .insert(index + 1, Block::free(upper_start, upper_size));
    }

    /// Merge the free blocks at `index` and `index + 1` into one free block
    /// tagged with `order`. Intermediate states of a cascading buddy merge
    /// are transient, so no invariant check runs here.
    pub(super) fn merge_free_pair(&mut self, index: usize, order: Option<u8>) {
        debug_assert!(self.blocks[index].is_free());
        debug_assert!(self.blocks[index + 1].is_free());

        let upper_size = self.blocks[index + 1].size;
        self.blocks[index].size += upper_size;
        self.blocks[index].order = order;
        self.blocks.remove(index + 1);
    }

    pub(super) fn set_order(&mut self, index: usize, order: Option<u8>) {
        self.blocks[index].order = order;
    }

    /// Clear the order tag on every free block (pre-pass for arena rebuilds)
    pub(super) fn clear_free_orders(&mut self) {
        for block in &mut self.blocks {
            if block.is_free() {
                block.order = None;
            }
        }
    }

    /// Merge every run of adjacent untagged free blocks
    pub(super) fn coalesce_free_runs(&mut self) {
        let mut i = 0;
        while i + 1 < self.blocks.len() {
            let mergeable = self.blocks[i].is_free()
                && self.blocks[i].order.is_none()
                && self.blocks[i + 1].is_free()
                && self.blocks[i + 1].order.is_none();
            if mergeable {
                let upper_size = self.blocks[i + 1].size;
                self.blocks[i].size += upper_size;
                self.blocks.remove(i + 1);
            } else {
                i += 1;
            }
        }
        self.debug_check();
    }

    /// Slide allocated blocks to the front of the address space, preserving
    /// their order, leaving one trailing free block. Clears all order tags
    /// (compaction breaks buddy alignment). Returns `(pid, old_start,
    /// new_start)` for every block that moved.
    pub(super) fn compact(&mut self) -> Vec<(Pid, Address, Address)> {
        let mut moves = Vec::new();
        let mut compacted = Vec::with_capacity(self.blocks.len());
        let mut cursor: Address = 0;

        for block in &self.blocks {
            if block.is_allocated() {
                if block.start != cursor {
                    if let Some(pid) = block.owner {
                        moves.push((pid, block.start, cursor));
                    }
                }
                compacted.push(Block {
                    start: cursor,
                    size: block.size,
                    state: BlockState::Allocated,
                    owner: block.owner,
                    order: None,
                });
                cursor += block.size;
            }
        }

        if cursor < self.total {
            compacted.push(Block::free(cursor, self.total - cursor));
        }

        self.blocks = compacted;
        self.debug_check();
        moves
    }

    /// Full consistency check: ordering, non-overlap, exact coverage,
    /// owner/state agreement, and no mergeable free neighbors. Exposed for
    /// test harnesses; debug builds assert it after every mutation.
    pub fn check_invariants(&self) -> MemoryResult<()> {
        if self.blocks.is_empty() {
            return Err(MemoryError::InvariantViolation(
                "block table is empty".into(),
            ));
        }

        let mut expected: Address = 0;
        for (i, block) in self.blocks.iter().enumerate() {
            if block.start != expected {
                return Err(MemoryError::InvariantViolation(format!(
                    "block {} starts at {} but {} expected (gap or overlap)",
                    i, block.start, expected
                )));
            }
            if block.size == 0 {
                return Err(MemoryError::InvariantViolation(format!(
                    "block {} at {} has zero size",
                    i, block.start
                )));
            }
            match block.state {
                BlockState::Allocated if block.owner.is_none() => {
                    return Err(MemoryError::InvariantViolation(format!(
                        "allocated block at {} has no owner",
                        block.start
                    )));
                }
                BlockState::Free if block.owner.is_some() => {
                    return Err(MemoryError::InvariantViolation(format!(
                        "free block at {} has an owner",
                        block.start
                    )));
                }
                _ => {}
            }
            expected = block.end();
        }
        if expected != self.total {
            return Err(MemoryError::InvariantViolation(format!(
                "blocks cover [0, {}) but total is {}",
                expected, self.total
            )));
        }

        for pair in self.blocks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if !(a.is_free() && b.is_free()) {
                continue;
            }
            match (a.order, b.order) {
                // Contiguous coalescing must have merged these already
                (None, None) => {
                    return Err(MemoryError::InvariantViolation(format!(
                        "adjacent free blocks at {} and {} were not coalesced",
                        a.start, b.start
                    )));
                }
                // Equal-order XOR buddies must have merged in the arena
                (Some(oa), Some(ob)) if oa == ob && a.size == b.size => {
                    if a.start ^ a.size == b.start {
                        return Err(MemoryError::InvariantViolation(format!(
                            "free buddies at {} and {} (order {}) were not merged",
                            a.start, b.start, oa
                        )));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        if let Err(err) = self.check_invariants() {
            panic!("block table corrupted: {err}");
        }
    }
}

/*!
 * Buddy Arena
 *
 * Power-of-two allocation over per-order free lists. Block sizes are
 * `min_block << order`; a block's buddy sits at `start ^ size`. The arena is
 * the search structure only; every split and merge is mirrored into the
 * block table so snapshots stay uniform across algorithms.
 */

use super::table::BlockTable;
use super::types::{MemoryError, MemoryResult};
use crate::core::types::{Address, Size};
use log::trace;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub(super) struct BuddyArena {
    min_block: Size,
    // free_lists[order] holds start offsets of free blocks of that order;
    // BTreeSet gives deterministic lowest-address selection
    free_lists: Vec<BTreeSet<Address>>,
}

impl BuddyArena {
    pub fn new(total: Size, min_block: Size) -> Self {
        let orders = if total >= min_block {
            (total / min_block).ilog2() as usize + 1
        } else {
            1
        };
        Self {
            min_block,
            free_lists: vec![BTreeSet::new(); orders],
        }
    }

    #[inline]
    pub fn size_of(&self, order: u8) -> Size {
        self.min_block << order
    }

    /// Smallest order whose block size holds `size`, if any order does
    pub fn order_for(&self, size: Size) -> Option<u8> {
        let rounded = size.max(self.min_block).next_power_of_two();
        let order = (rounded / self.min_block).ilog2() as u8;
        ((order as usize) < self.free_lists.len()).then_some(order)
    }

    /// Allocate a block of the smallest order that fits `size`, splitting a
    /// larger block downward as needed. On success the table block at the
    /// returned address is a free block of exactly the returned order; the
    /// caller marks it allocated. `Ok(None)` means no order can satisfy the
    /// request, with nothing mutated.
    pub fn allocate(
        &mut self,
        table: &mut BlockTable,
        size: Size,
    ) -> MemoryResult<Option<(Address, u8)>> {
        let Some(wanted) = self.order_for(size) else {
            return Ok(None);
        };
        let Some(from) = (wanted..self.free_lists.len() as u8)
            .find(|&o| !self.free_lists[o as usize].is_empty())
        else {
            return Ok(None);
        };
        let Some(start) = self.free_lists[from as usize].pop_first() else {
            return Ok(None);
        };

        // Split in half until we reach the wanted order, parking the upper
        // half at each intermediate order
        let mut order = from;
        while order > wanted {
            order -= 1;
            let half = self.size_of(order);
            let upper = start + half;
            self.free_lists[order as usize].insert(upper);

            let idx = table_index(table, start)?;
            table.split_at(idx, half);
            table.set_order(idx, Some(order));
            table.set_order(idx + 1, Some(order));
            trace!("buddy split: {} bytes at {} -> halves of {}", half * 2, start, half);
        }

        Ok(Some((start, wanted)))
    }

    /// Remove a specific free block from its order list (a contiguous
    /// strategy is about to consume it).
    pub fn withdraw(&mut self, start: Address, order: u8) {
        self.free_lists[order as usize].remove(&start);
    }

    /// Return a block to the arena, merging with its buddy upward while the
    /// buddy is free at the same order. The table block at `start` must
    /// already be marked free (still order-tagged).
    pub fn release(
        &mut self,
        table: &mut BlockTable,
        start: Address,
        order: u8,
    ) -> MemoryResult<()> {
        let mut start = start;
        let mut order = order;

        loop {
            let size = self.size_of(order);
            let buddy = start ^ size;
            let merged_order = order + 1;

            let can_merge = (merged_order as usize) < self.free_lists.len()
                && self.free_lists[order as usize].remove(&buddy);
            if !can_merge {
                self.free_lists[order as usize].insert(start);
                return Ok(());
            }

            let lower = start.min(buddy);
            let idx = table_index(table, lower)?;
            table.merge_free_pair(idx, Some(merged_order));
            trace!("buddy merge: {} + {} -> {} bytes at {}", size, size, size * 2, lower);

            start = lower;
            order = merged_order;
        }
    }

    /// Rebuild the arena from the table's current free space: clear the
    /// lists, coalesce untagged free runs, then carve each free block into
    /// maximal aligned power-of-two chunks. Fragments smaller than
    /// `min_block` stay untagged and are unreachable for buddy requests.
    pub fn rebuild(&mut self, table: &mut BlockTable) {
        for list in &mut self.free_lists {
            list.clear();
        }
        table.clear_free_orders();
        table.coalesce_free_runs();

        let top = self.size_of(self.free_lists.len() as u8 - 1);
        let mut idx = 0;
        while idx < table.len() {
            let block = &table.blocks()[idx];
            if !block.is_free() || block.size < self.min_block {
                idx += 1;
                continue;
            }
            let start = block.start;
            let size = block.size;

            let alignment = if start == 0 {
                top
            } else {
                1 << start.trailing_zeros()
            };
            if alignment < self.min_block {
                // Misaligned head: split it off untagged and resume carving
                // at the next min_block boundary, unless nothing carvable
                // remains past that boundary
                let skip = self.min_block - (start % self.min_block);
                if skip + self.min_block <= size {
                    table.split_at(idx, skip);
                }
                idx += 1;
                continue;
            }

            let chunk = alignment.min(prev_power_of_two(size)).min(top);
            let order = (chunk / self.min_block).ilog2() as u8;
            if chunk < size {
                table.split_at(idx, chunk);
            }
            table.set_order(idx, Some(order));
            self.free_lists[order as usize].insert(start);
            idx += 1;
        }
    }

    /// Drop all free-list entries (used after compaction invalidates
    /// alignment).
    pub fn clear(&mut self) {
        for list in &mut self.free_lists {
            list.clear();
        }
    }

    /// Total bytes sitting in the free lists
    #[cfg(test)]
    pub fn free_bytes(&self) -> Size {
        self.free_lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.len() * self.size_of(order as u8))
            .sum()
    }
}

fn table_index(table: &BlockTable, start: Address) -> MemoryResult<usize> {
    table.index_of(start).ok_or_else(|| {
        MemoryError::InvariantViolation(format!("buddy block at {start} missing from table"))
    })
}

#[inline]
fn prev_power_of_two(value: usize) -> usize {
    debug_assert!(value > 0);
    1 << value.ilog2()
}

/*!
 * Contiguous Placement Strategies
 *
 * First/best/worst/next-fit selection over the block table. Each strategy
 * returns the index of a qualifying free block or `None` when no block can
 * hold the request. The strategy set is closed, so selection is a match over
 * the algorithm enum rather than dynamic dispatch.
 */

use super::table::BlockTable;
use super::types::AllocationAlgorithm;
use crate::core::types::{Address, Size};

/// Next-fit search cursor
///
/// Tracks the start offset of the last successful next-fit allocation. Owned
/// by the manager; reset whenever the table is reinitialized or a different
/// algorithm becomes active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NextFitCursor {
    last_start: Address,
}

impl NextFitCursor {
    #[inline]
    pub fn position(&self) -> Address {
        self.last_start
    }

    #[inline]
    pub fn reset(&mut self) {
        self.last_start = 0;
    }
}

/// Select a candidate free block for `size` under `algorithm`
///
/// Buddy requests never reach this path; the manager routes them to the
/// buddy arena first.
pub(super) fn select(
    algorithm: AllocationAlgorithm,
    table: &BlockTable,
    cursor: &mut NextFitCursor,
    size: Size,
) -> Option<usize> {
    match algorithm {
        AllocationAlgorithm::FirstFit => first_fit(table, size),
        AllocationAlgorithm::BestFit => best_fit(table, size),
        AllocationAlgorithm::WorstFit => worst_fit(table, size),
        AllocationAlgorithm::NextFit => next_fit(table, cursor, size),
        AllocationAlgorithm::Buddy => None,
    }
}

/// First free block in table order with sufficient size
fn first_fit(table: &BlockTable, size: Size) -> Option<usize> {
    table.find_free(size).next()
}

/// Smallest qualifying free block; earliest start wins ties
fn best_fit(table: &BlockTable, size: Size) -> Option<usize> {
    let mut best: Option<usize> = None;
    for idx in table.find_free(size) {
        match best {
            Some(b) if table.blocks()[idx].size >= table.blocks()[b].size => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Largest qualifying free block; earliest start wins ties
fn worst_fit(table: &BlockTable, size: Size) -> Option<usize> {
    let mut worst: Option<usize> = None;
    for idx in table.find_free(size) {
        match worst {
            Some(w) if table.blocks()[idx].size <= table.blocks()[w].size => {}
            _ => worst = Some(idx),
        }
    }
    worst
}

/// First-fit resuming from the cursor, wrapping to the table head if the
/// tail has no qualifying block. Advances the cursor to the selected start.
fn next_fit(table: &BlockTable, cursor: &mut NextFitCursor, size: Size) -> Option<usize> {
    let pivot = table
        .blocks()
        .iter()
        .position(|b| b.start >= cursor.last_start)
        .unwrap_or(0);

    let tail = pivot..table.len();
    let head = 0..pivot;
    let selected = tail
        .chain(head)
        .find(|&i| table.blocks()[i].is_free() && table.blocks()[i].size >= size)?;

    cursor.last_start = table.blocks()[selected].start;
    Some(selected)
}

/*!
 * Fragmentation Metrics
 *
 * Snapshot-derived fragmentation and utilization figures. A sample is
 * appended to the history after every mutating operation; the history is
 * append-only and trimmed only by the caller's retention policy.
 */

use super::table::BlockTable;
use crate::core::types::{Size, Timestamp};
use serde::{Deserialize, Serialize};

/// One point of the fragmentation trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentationSample {
    pub timestamp: Timestamp,
    /// Share of free memory unusable because it is split into
    /// non-contiguous pieces: `(free - largest_free) / free * 100`
    pub external_frag_pct: f64,
    /// Share of allocated memory wasted by power-of-two rounding
    /// (buddy allocations only; 0 under contiguous strategies)
    pub internal_frag_pct: f64,
    pub utilization_pct: f64,
    pub free_bytes: Size,
    pub largest_free_block: Size,
}

impl FragmentationSample {
    /// Compute a sample from the current table. `overhead` is the total
    /// bytes over-allocated across live allocations (rounded size minus
    /// requested size), maintained by the manager's owner map.
    pub(super) fn compute(table: &BlockTable, overhead: Size, timestamp: Timestamp) -> Self {
        let free_bytes = table.free_bytes();
        let used_bytes = table.used_bytes();
        let largest_free_block = table.largest_free();

        let external_frag_pct = if free_bytes == 0 {
            0.0
        } else {
            (free_bytes - largest_free_block) as f64 / free_bytes as f64 * 100.0
        };
        let internal_frag_pct = if used_bytes == 0 {
            0.0
        } else {
            overhead as f64 / used_bytes as f64 * 100.0
        };
        let utilization_pct = if table.total() == 0 {
            0.0
        } else {
            used_bytes as f64 / table.total() as f64 * 100.0
        };

        Self {
            timestamp,
            external_frag_pct,
            internal_frag_pct,
            utilization_pct,
            free_bytes,
            largest_free_block,
        }
    }

    /// Severity level for the current external fragmentation
    pub fn pressure(&self) -> FragmentationPressure {
        FragmentationPressure::from_external(self.external_frag_pct)
    }
}

/// Fragmentation severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentationPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl FragmentationPressure {
    pub fn from_external(external_frag_pct: f64) -> Self {
        if external_frag_pct >= 85.0 {
            FragmentationPressure::Critical
        } else if external_frag_pct >= 60.0 {
            FragmentationPressure::High
        } else if external_frag_pct >= 30.0 {
            FragmentationPressure::Medium
        } else {
            FragmentationPressure::Low
        }
    }
}

impl std::fmt::Display for FragmentationPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FragmentationPressure::Low => write!(f, "LOW"),
            FragmentationPressure::Medium => write!(f, "MEDIUM"),
            FragmentationPressure::High => write!(f, "HIGH"),
            FragmentationPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}

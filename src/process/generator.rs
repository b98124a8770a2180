/*!
 * Process Generator
 * Seeded random workloads for driving the allocation engine
 */

use super::types::Process;
use crate::core::types::{Pid, Size};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_MIN_SIZE: Size = 16;
const DEFAULT_MAX_SIZE: Size = 1024;

/// Generates processes with unique sequential pids and randomized
/// characteristics. Seedable for reproducible workloads.
#[derive(Debug)]
pub struct ProcessGenerator {
    rng: StdRng,
    next_pid: Pid,
}

impl ProcessGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            next_pid: 1,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_pid: 1,
        }
    }

    fn next_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// Process with a random size in `[min_size, max_size]`, random duration
    /// and priority
    pub fn random_in(&mut self, min_size: Size, max_size: Size) -> Process {
        let size = self.rng.gen_range(min_size..=max_size);
        let duration = self.rng.gen_range(10.0..60.0);
        let priority = self.rng.gen_range(1..=5);
        Process::new(self.next_pid(), size)
            .with_duration(duration)
            .with_priority(priority)
    }

    pub fn random(&mut self) -> Process {
        self.random_in(DEFAULT_MIN_SIZE, DEFAULT_MAX_SIZE)
    }

    /// Process with a fixed size and default attributes
    pub fn sized(&mut self, size: Size) -> Process {
        Process::new(self.next_pid(), size)
    }

    /// Batch of random processes
    pub fn burst(&mut self, count: usize) -> Vec<Process> {
        (0..count).map(|_| self.random()).collect()
    }

    /// Processes sized to fill roughly `target_utilization` of `total`
    /// memory, for stress scenarios
    pub fn stress_workload(&mut self, total: Size, target_utilization: f64) -> Vec<Process> {
        let budget = (total as f64 * target_utilization) as Size;
        let mut consumed = 0;
        let mut processes = Vec::new();
        while consumed < budget {
            let remaining = budget - consumed;
            let max = remaining.min(total / 8).max(DEFAULT_MIN_SIZE);
            let process = self.random_in(DEFAULT_MIN_SIZE.min(max), max);
            consumed += process.size;
            processes.push(process);
        }
        processes
    }
}

impl Default for ProcessGenerator {
    fn default() -> Self {
        Self::new()
    }
}

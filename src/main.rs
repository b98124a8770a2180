/*!
 * Memory Allocation Simulator
 * Replays a seeded workload against each placement strategy and reports
 * fragmentation and utilization
 */

use log::info;
use memsim::{AllocationAlgorithm, MemoryManager, ProcessGenerator};

const TOTAL_MEMORY: usize = 64 * 1024;
const MIN_BLOCK: usize = 64;
const WORKLOAD_SEED: u64 = 42;
const BURST_SIZE: usize = 48;

fn main() {
    env_logger::init();
    info!("Starting allocation simulator");

    println!(
        "{:<14} {:>10} {:>12} {:>12} {:>12} {:>10}",
        "algorithm", "placed", "util %", "ext frag %", "int frag %", "pressure"
    );

    for algorithm in AllocationAlgorithm::ALL {
        let manager = MemoryManager::with_capacity(TOTAL_MEMORY, MIN_BLOCK);
        let mut generator = ProcessGenerator::with_seed(WORKLOAD_SEED);
        let workload = generator.burst(BURST_SIZE);

        let mut placed = Vec::new();
        for process in &workload {
            if manager.allocate(process.pid, process.size, algorithm).is_ok() {
                placed.push(process.pid);
            }
            // Retire every third placement to churn the free space
            if placed.len() % 3 == 0 {
                if let Some(pid) = placed.first().copied() {
                    let _ = manager.free(pid);
                    placed.remove(0);
                }
            }
        }

        let sample = manager.metrics();
        println!(
            "{:<14} {:>10} {:>12.1} {:>12.1} {:>12.1} {:>10}",
            algorithm.to_string(),
            placed.len(),
            sample.utilization_pct,
            sample.external_frag_pct,
            sample.internal_frag_pct,
            sample.pressure()
        );

        if algorithm == AllocationAlgorithm::Buddy {
            info!("Final buddy map:\n{}", manager.render_map());
        }
    }
}

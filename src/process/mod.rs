/*!
 * Process Model
 *
 * Caller-side process representation and workload generation. The engine
 * consumes only a process's pid and size; lifecycle bookkeeping (duration,
 * priority, state) belongs to the simulation driver.
 */

mod generator;
mod types;

pub use generator::ProcessGenerator;
pub use types::{Process, ProcessState};

/*!
 * Process Types
 */

use crate::core::types::{Pid, Priority, Size};
use serde::{Deserialize, Serialize};

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Created, not yet submitted to the allocator
    New,
    /// Submitted and holding memory
    Ready,
    /// Currently running
    Running,
    /// Waiting for I/O or event
    Waiting,
    /// Freed, explicitly or because its duration elapsed
    Terminated,
}

/// A simulated process
///
/// The allocation engine only reads `pid` and `size`; `duration_secs` is an
/// opaque attribute the driver uses to decide when the allocation expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub pid: Pid,
    pub size: Size,
    pub duration_secs: f64,
    pub priority: Priority,
    pub state: ProcessState,
}

impl Process {
    pub fn new(pid: Pid, size: Size) -> Self {
        Self {
            pid,
            size,
            duration_secs: 30.0,
            priority: 1,
            state: ProcessState::New,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, ProcessState::Terminated)
    }

    pub fn terminate(&mut self) {
        self.state = ProcessState::Terminated;
    }
}

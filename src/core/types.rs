/*!
 * Core Types
 * Common types used across the simulator
 */

/// Process ID type
pub type Pid = u32;

/// Address type for memory operations (offset into the simulated space)
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Timestamp in milliseconds since engine construction
pub type Timestamp = u64;

/// Priority level (1-5, higher is more important)
pub type Priority = u8;

/*!
 * Core Module
 * Shared types used across the engine
 */

pub mod types;

pub use types::*;

//! Aggregation of begin/end events into frame trees.
//!
//! This module provides:
//! - The top-down call/region tree
//! - Its bottom-up (self-time) inversion
//! - The cross-process reduction of either tree

pub mod inversion;
pub mod reducer;
pub mod stack_tree;

// Re-export main types and functions
pub use inversion::invert;
pub use reducer::reduce_tree;
pub use stack_tree::{Frame, FrameId, FrameKind, StackTree};

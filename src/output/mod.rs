//! Output writers for the profiling report.
//!
//! This module renders:
//! - Top-down and bottom-up time trees
//! - Per-space allocation high-water reports
//! - Process memory high-water statistics

pub mod report;

// Re-export main functions
pub use report::{
    allocation_label, write_allocation_report, write_process_high_water, write_report, write_tree,
};

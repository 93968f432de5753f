//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod replay;
pub mod validate;

// Re-export main command functions
pub use replay::{execute_replay, replay_trace, ReplayArgs};
pub use validate::{display_version, summarize_trace, validate_trace_file, TraceSummary};

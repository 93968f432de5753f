//! Space Time Stack
//!
//! Hierarchical time and memory profiling for instrumented runtimes.
//!
//! A [`Session`] consumes nested begin/end events (kernels, regions, deep
//! copies) and allocation events, builds a call tree and per-space
//! allocation high-water marks, and at shutdown merges everything across the
//! cooperating processes into one text report.
//!
//! ## Getting Started
//!
//! ```no_run
//! use space_time_stack::collective::SingleProcess;
//! use space_time_stack::utils::config::{ReportConfig, SUPPORTED_INTERFACE_VERSION};
//! use space_time_stack::Session;
//!
//! let mut session = Session::init(SUPPORTED_INTERFACE_VERSION)?;
//! session.push_region("solve");
//! let kernel = session.begin_parallel_for("assemble");
//! session.end_parallel_for(kernel)?;
//! session.pop_region()?;
//!
//! let mut out = std::io::stdout();
//! session.finalize(&SingleProcess, &mut out, &ReportConfig::default())?;
//! # Ok::<(), space_time_stack::utils::ProfilerError>(())
//! ```
//!
//! The CLI replays recorded event traces:
//!
//! ```bash
//! space-time-stack replay --trace run.json
//! ```

pub mod aggregator;
pub mod clock;
pub mod collective;
pub mod commands;
pub mod events;
pub mod memory;
pub mod output;
pub mod session;
pub mod utils;

pub use session::{KernelToken, ReducedProfile, Session};

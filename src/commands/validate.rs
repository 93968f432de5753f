use crate::events::{Event, EventTrace};
use crate::utils::config::{SUPPORTED_INTERFACE_VERSION, TRACE_SCHEMA_VERSION};
use anyhow::{Context, Result};
use std::path::Path;

/// Per-trace counts shown by `validate`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSummary {
    pub ranks: usize,
    pub events: usize,
    pub kernels: usize,
    pub regions: usize,
    pub allocations: usize,
    pub copies: usize,
    pub version_supported: bool,
}

pub fn summarize_trace(trace: &EventTrace) -> TraceSummary {
    let mut summary = TraceSummary {
        ranks: trace.rank_count(),
        events: trace.event_count(),
        version_supported: trace.version == SUPPORTED_INTERFACE_VERSION,
        ..Default::default()
    };

    for timed in trace.ranks.iter().flatten() {
        match timed.event {
            Event::BeginParallelFor { .. }
            | Event::BeginParallelReduce { .. }
            | Event::BeginParallelScan { .. } => summary.kernels += 1,
            Event::PushRegion { .. } => summary.regions += 1,
            Event::Allocate { .. } => summary.allocations += 1,
            Event::BeginDeepCopy { .. } => summary.copies += 1,
            _ => {}
        }
    }
    summary
}

/// Validate an event trace file
pub fn validate_trace_file(file_path: &Path) -> Result<()> {
    println!("Validating trace: {}", file_path.display());

    let trace = EventTrace::load(file_path)
        .with_context(|| format!("Failed to load trace {}", file_path.display()))?;
    let summary = summarize_trace(&trace);

    println!("✓ Valid trace JSON");
    println!(
        "  Interface version: {} ({})",
        trace.version,
        if summary.version_supported {
            "supported"
        } else {
            "UNSUPPORTED"
        }
    );
    println!("  Ranks: {}", summary.ranks);
    println!("  Events: {}", summary.events);
    println!("  Kernel launches: {}", summary.kernels);
    println!("  Regions: {}", summary.regions);
    println!("  Allocations: {}", summary.allocations);
    println!("  Deep copies: {}", summary.copies);

    if !summary.version_supported {
        anyhow::bail!(
            "trace interface version {} is not {}",
            trace.version,
            SUPPORTED_INTERFACE_VERSION
        );
    }
    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("Space Time Stack v{}", env!("CARGO_PKG_VERSION"));
    println!("Event interface: {}", SUPPORTED_INTERFACE_VERSION);
    println!("Trace schema: v{}", TRACE_SCHEMA_VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_counts_event_types() {
        let trace = EventTrace::from_json(
            r#"{"version": 20150628, "ranks": [
                [{"at": 0.0, "type": "push_region", "name": "r"},
                 {"at": 0.1, "type": "begin_parallel_for", "name": "k", "kernel_id": 1},
                 {"at": 0.2, "type": "end_parallel_for", "kernel_id": 1},
                 {"at": 0.3, "type": "pop_region"}],
                [{"at": 0.0, "type": "allocate", "space": "Host", "name": "a", "address": 1, "size": 8}]
            ]}"#,
        )
        .unwrap();

        let summary = summarize_trace(&trace);
        assert_eq!(
            summary,
            TraceSummary {
                ranks: 2,
                events: 5,
                kernels: 1,
                regions: 1,
                allocations: 1,
                copies: 0,
                version_supported: true,
            }
        );
    }
}

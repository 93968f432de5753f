//! Replay command implementation.
//!
//! The replay command:
//! 1. Loads the event trace (and optional report config)
//! 2. Starts one thread per recorded rank on an in-process group
//! 3. Replays each rank's events onto its own session
//! 4. Finalizes every session collectively
//! 5. Prints each rank's report output in rank order

use crate::collective::{Collective, ThreadGroup};
use crate::events::{EventTrace, Replayer, TimedEvent};
use crate::utils::config::ReportConfig;
use crate::utils::error::fatal;
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Arguments for the replay command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct ReplayArgs {
    /// Path to the JSON event trace
    pub trace: PathBuf,

    /// Optional TOML report configuration
    pub config: Option<PathBuf>,
}

/// Execute the replay command, printing the report to stdout
///
/// **Public** - main entry point called from main.rs
///
/// Protocol violations in the trace abort the process, exactly as they
/// would inside an instrumented run.
pub fn execute_replay(args: ReplayArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/3: Loading trace {}...", args.trace.display());
    let trace = EventTrace::load(&args.trace)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    let config = load_config(args.config.as_ref())?;

    info!(
        "Step 2/3: Replaying {} events over {} ranks...",
        trace.event_count(),
        trace.rank_count()
    );
    let outputs = replay_trace(&trace, &config);

    info!("Step 3/3: Writing report...");
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for output in outputs {
        handle
            .write_all(&output)
            .context("Failed to write report")?;
    }

    info!(
        "Replay completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Replay every rank of `trace` and return each rank's report bytes
///
/// **Public** - usable without touching stdout (tests, embedding)
///
/// A protocol violation or transport failure on any rank aborts the process.
pub fn replay_trace(trace: &EventTrace, config: &ReportConfig) -> Vec<Vec<u8>> {
    let ranks = Arc::new(trace.ranks.clone());
    let config = Arc::new(config.clone());
    let version = trace.version;

    let handles: Vec<_> = ThreadGroup::new(trace.rank_count())
        .into_iter()
        .map(move |comm| {
            let ranks = Arc::clone(&ranks);
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let events = &ranks[comm.rank()];
                replay_rank(version, events, &comm, &config)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| match handle.join() {
            Ok(output) => output,
            Err(panic) => std::panic::resume_unwind(panic),
        })
        .collect()
}

fn replay_rank<C: Collective>(
    version: u64,
    events: &[TimedEvent],
    comm: &C,
    config: &ReportConfig,
) -> Vec<u8> {
    debug!("Rank {} replaying {} events", comm.rank(), events.len());

    // A failing rank would leave its peers stuck in the collective phase,
    // so every error here, finalization included, takes the whole process
    // down.
    let mut replayer = Replayer::start(version).unwrap_or_else(|e| fatal(&e));
    replayer.apply_all(events).unwrap_or_else(|e| fatal(&e));

    let mut output = Vec::new();
    replayer
        .into_session()
        .finalize(comm, &mut output, config)
        .unwrap_or_else(|e| fatal(&e));
    output
}

fn load_config(path: Option<&PathBuf>) -> Result<ReportConfig> {
    match path {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ReportConfig::default()),
    }
}

//! Recorded event traces and their replay onto a [`Session`].
//!
//! A trace holds one event list per rank. Each event carries the time (in
//! seconds from the start of the run) at which the runtime delivered it;
//! replay steps a [`ManualClock`] to that time before dispatching, so the
//! resulting durations match the recording exactly.

use crate::aggregator::FrameKind;
use crate::clock::ManualClock;
use crate::memory::MemorySpace;
use crate::session::{KernelToken, Session};
use crate::utils::error::{ProfilerError, TraceError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One runtime notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BeginParallelFor { name: String, kernel_id: u64 },
    BeginParallelReduce { name: String, kernel_id: u64 },
    BeginParallelScan { name: String, kernel_id: u64 },
    EndParallelFor { kernel_id: u64 },
    EndParallelReduce { kernel_id: u64 },
    EndParallelScan { kernel_id: u64 },
    PushRegion { name: String },
    PopRegion,
    Allocate {
        space: String,
        name: String,
        address: usize,
        size: u64,
    },
    Deallocate {
        space: String,
        name: String,
        address: usize,
        size: u64,
    },
    BeginDeepCopy {
        dst_space: String,
        dst_name: String,
        src_space: String,
        src_name: String,
        size: u64,
    },
    EndDeepCopy,
}

/// Event stamped with its delivery time in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at: f64,
    #[serde(flatten)]
    pub event: Event,
}

/// Recorded run of one or more ranks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrace {
    /// Interface version the runtime announced at init
    pub version: u64,

    /// Events per rank, in delivery order
    pub ranks: Vec<Vec<TimedEvent>>,
}

impl EventTrace {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        debug!("Reading event trace from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TraceError> {
        let trace: EventTrace = serde_json::from_str(content)?;
        trace.validate()?;
        Ok(trace)
    }

    /// Check structural sanity; event discipline is checked during replay
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.ranks.is_empty() {
            return Err(TraceError::InvalidFormat(
                "trace must contain at least one rank".to_string(),
            ));
        }

        for (rank, events) in self.ranks.iter().enumerate() {
            let mut previous = 0.0;
            for (i, timed) in events.iter().enumerate() {
                if !timed.at.is_finite() || timed.at < 0.0 {
                    return Err(TraceError::InvalidFormat(format!(
                        "rank {} event {}: invalid time {}",
                        rank, i, timed.at
                    )));
                }
                if timed.at < previous {
                    return Err(TraceError::InvalidFormat(format!(
                        "rank {} event {}: time goes backwards ({} < {})",
                        rank, i, timed.at, previous
                    )));
                }
                previous = timed.at;
            }
        }
        Ok(())
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn event_count(&self) -> usize {
        self.ranks.iter().map(Vec::len).sum()
    }
}

/// Drives a session from recorded events
pub struct Replayer {
    session: Session<ManualClock>,
    tokens: HashMap<u64, KernelToken>,
}

impl Replayer {
    /// Validate `version` and start a session on a manual clock at t = 0
    pub fn start(version: u64) -> Result<Self, ProfilerError> {
        Ok(Self {
            session: Session::init_with_clock(version, ManualClock::new())?,
            tokens: HashMap::new(),
        })
    }

    pub fn session(&self) -> &Session<ManualClock> {
        &self.session
    }

    pub fn apply(&mut self, timed: &TimedEvent) -> Result<(), ProfilerError> {
        self.session.clock().set_secs(timed.at);

        match &timed.event {
            Event::BeginParallelFor { name, kernel_id } => {
                self.begin_kernel(*kernel_id, name, FrameKind::For)
            }
            Event::BeginParallelReduce { name, kernel_id } => {
                self.begin_kernel(*kernel_id, name, FrameKind::Reduce)
            }
            Event::BeginParallelScan { name, kernel_id } => {
                self.begin_kernel(*kernel_id, name, FrameKind::Scan)
            }
            Event::EndParallelFor { kernel_id }
            | Event::EndParallelReduce { kernel_id }
            | Event::EndParallelScan { kernel_id } => self.end_kernel(*kernel_id),
            Event::PushRegion { name } => {
                self.session.push_region(name);
                Ok(())
            }
            Event::PopRegion => self.session.pop_region(),
            Event::Allocate {
                space,
                name,
                address,
                size,
            } => {
                let space = MemorySpace::from_handle_name(space)?;
                self.session.allocate(space, name, *address, *size)
            }
            Event::Deallocate {
                space,
                name,
                address,
                size,
            } => {
                let space = MemorySpace::from_handle_name(space)?;
                self.session.deallocate(space, name, *address, *size)
            }
            Event::BeginDeepCopy {
                dst_space,
                dst_name,
                src_space,
                src_name,
                size,
            } => {
                let dst = MemorySpace::from_handle_name(dst_space)?;
                let src = MemorySpace::from_handle_name(src_space)?;
                self.session
                    .begin_deep_copy(dst, dst_name, src, src_name, *size);
                Ok(())
            }
            Event::EndDeepCopy => self.session.end_deep_copy(),
        }
    }

    pub fn apply_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a TimedEvent>,
    ) -> Result<(), ProfilerError> {
        for timed in events {
            self.apply(timed)?;
        }
        Ok(())
    }

    /// Hand back the session, e.g. for finalization
    pub fn into_session(self) -> Session<ManualClock> {
        self.session
    }

    fn begin_kernel(&mut self, kernel_id: u64, name: &str, kind: FrameKind) -> Result<(), ProfilerError> {
        if let Some(live) = self.tokens.get(&kernel_id) {
            return Err(ProfilerError::DuplicateKernelId {
                kernel_id,
                frame: self.session.tree().full_path(live.frame()),
            });
        }
        let token = self.session.begin_kernel(name, kind);
        self.tokens.insert(kernel_id, token);
        Ok(())
    }

    fn end_kernel(&mut self, kernel_id: u64) -> Result<(), ProfilerError> {
        match self.tokens.remove(&kernel_id) {
            Some(token) => self.session.end_kernel(token),
            None => Err(ProfilerError::MismatchedEnd {
                expected: self.session.tree().full_path(self.session.current_frame()),
            }),
        }
    }
}

//! Per-process profiling session.
//!
//! A [`Session`] owns the call tree, the cursor into it and the allocation
//! ledgers. Event hooks drive it with `&mut self` calls; it carries no
//! locking of its own, so a host that can deliver events from several
//! threads must serialize them (e.g. one `Mutex<Session>` around every
//! hook). [`Session::finalize`] consumes the session, so it runs exactly
//! once.

use crate::aggregator::{invert, reduce_tree, FrameId, FrameKind, StackTree};
use crate::clock::{Clock, SystemClock};
use crate::collective::Collective;
use crate::memory::{AllocationLedger, MemorySpace, SpaceLedgers, NSPACES};
use crate::output::write_report;
use crate::utils::config::{ReportConfig, SUPPORTED_INTERFACE_VERSION};
use crate::utils::error::ProfilerError;
use log::{debug, info};
use std::io::Write;

/// Correlation token handed out when a kernel begins.
///
/// The matching end must present it back; it identifies the frame that is
/// expected to be current at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelToken(FrameId);

impl KernelToken {
    pub fn frame(&self) -> FrameId {
        self.0
    }
}

/// Trees and peak ledgers after cross-process reduction
#[derive(Debug, Clone)]
pub struct ReducedProfile {
    pub top_down: StackTree,
    pub bottom_up: StackTree,
    pub high_water: [AllocationLedger; NSPACES],
}

/// Profiling state of one process between library init and finalize
pub struct Session<C: Clock = SystemClock> {
    clock: C,
    tree: StackTree,
    cursor: FrameId,
    ledgers: SpaceLedgers,
}

impl Session<SystemClock> {
    /// Start a session for the given event interface version
    pub fn init(version: u64) -> Result<Self, ProfilerError> {
        Self::init_with_clock(version, SystemClock::new())
    }
}

impl<C: Clock> Session<C> {
    /// Start a session after validating the host's interface version
    pub fn init_with_clock(version: u64, clock: C) -> Result<Self, ProfilerError> {
        if version != SUPPORTED_INTERFACE_VERSION {
            return Err(ProfilerError::UnsupportedVersion {
                found: version,
                expected: SUPPORTED_INTERFACE_VERSION,
            });
        }
        Ok(Self::with_clock(clock))
    }

    /// Create the root frame, begin it, and point the cursor at it
    pub fn with_clock(clock: C) -> Self {
        let mut tree = StackTree::new();
        let root = tree.root();
        tree.begin(root, clock.now());
        debug!("Profiling session started");

        Self {
            clock,
            tree,
            cursor: root,
            ledgers: SpaceLedgers::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn tree(&self) -> &StackTree {
        &self.tree
    }

    pub fn ledgers(&self) -> &SpaceLedgers {
        &self.ledgers
    }

    /// Frame new children and allocations are attributed to
    pub fn current_frame(&self) -> FrameId {
        self.cursor
    }

    pub fn begin_frame(&mut self, name: &str, kind: FrameKind) -> FrameId {
        self.cursor = self.tree.get_or_create_child(self.cursor, name, kind);
        self.tree.begin(self.cursor, self.clock.now());
        self.cursor
    }

    /// End the current frame and move the cursor to its parent
    pub fn end_frame(&mut self) -> Result<(), ProfilerError> {
        let end_time = self.clock.now();
        let parent = self
            .tree
            .frame(self.cursor)
            .parent()
            .ok_or(ProfilerError::PopAtRoot)?;
        self.tree.end(self.cursor, end_time);
        self.cursor = parent;
        Ok(())
    }

    pub fn begin_kernel(&mut self, name: &str, kind: FrameKind) -> KernelToken {
        KernelToken(self.begin_frame(name, kind))
    }

    pub fn end_kernel(&mut self, token: KernelToken) -> Result<(), ProfilerError> {
        if token.0 != self.cursor {
            return Err(ProfilerError::MismatchedEnd {
                expected: self.tree.full_path(self.cursor),
            });
        }
        self.end_frame()
    }

    pub fn begin_parallel_for(&mut self, name: &str) -> KernelToken {
        self.begin_kernel(name, FrameKind::For)
    }

    pub fn begin_parallel_reduce(&mut self, name: &str) -> KernelToken {
        self.begin_kernel(name, FrameKind::Reduce)
    }

    pub fn begin_parallel_scan(&mut self, name: &str) -> KernelToken {
        self.begin_kernel(name, FrameKind::Scan)
    }

    pub fn end_parallel_for(&mut self, token: KernelToken) -> Result<(), ProfilerError> {
        self.end_kernel(token)
    }

    pub fn end_parallel_reduce(&mut self, token: KernelToken) -> Result<(), ProfilerError> {
        self.end_kernel(token)
    }

    pub fn end_parallel_scan(&mut self, token: KernelToken) -> Result<(), ProfilerError> {
        self.end_kernel(token)
    }

    pub fn push_region(&mut self, name: &str) {
        self.begin_frame(name, FrameKind::Region);
    }

    pub fn pop_region(&mut self) -> Result<(), ProfilerError> {
        self.end_frame()
    }

    /// Open a COPY frame named `"dst"="src"`
    pub fn begin_deep_copy(
        &mut self,
        _dst_space: MemorySpace,
        dst_name: &str,
        _src_space: MemorySpace,
        src_name: &str,
        _size: u64,
    ) {
        let frame_name = format!("\"{}\"=\"{}\"", dst_name, src_name);
        self.begin_frame(&frame_name, FrameKind::Copy);
    }

    pub fn end_deep_copy(&mut self) -> Result<(), ProfilerError> {
        self.end_frame()
    }

    pub fn allocate(
        &mut self,
        space: MemorySpace,
        name: &str,
        address: usize,
        size: u64,
    ) -> Result<(), ProfilerError> {
        self.ledgers
            .allocate(space, name, address, size, self.cursor)
    }

    pub fn deallocate(
        &mut self,
        space: MemorySpace,
        name: &str,
        address: usize,
        size: u64,
    ) -> Result<(), ProfilerError> {
        self.ledgers.deallocate(space, name, address, size)
    }

    /// End the root frame, invert the tree and reduce both trees over `comm`.
    ///
    /// # Errors
    /// * `ProfilerError::UnterminatedFrame` - a frame was still open
    /// * `ProfilerError::Collective` - the transport failed mid-reduction
    pub fn into_reduced<T: Collective + ?Sized>(
        mut self,
        comm: &T,
    ) -> Result<ReducedProfile, ProfilerError> {
        let end_time = self.clock.now();
        let root = self.tree.root();
        if self.cursor != root {
            return Err(ProfilerError::UnterminatedFrame {
                frame: self.tree.full_path(self.cursor),
            });
        }
        self.tree.end(root, end_time);

        let mut bottom_up = invert(&self.tree);
        reduce_tree(&mut self.tree, comm)?;
        reduce_tree(&mut bottom_up, comm)?;

        Ok(ReducedProfile {
            top_down: self.tree,
            bottom_up,
            high_water: self.ledgers.into_high_water(),
        })
    }

    /// Finish profiling and write this rank's part of the report to `out`
    pub fn finalize<W, T>(
        self,
        comm: &T,
        out: &mut W,
        config: &ReportConfig,
    ) -> Result<ReducedProfile, ProfilerError>
    where
        W: Write + ?Sized,
        T: Collective + ?Sized,
    {
        let profile = self.into_reduced(comm)?;
        write_report(out, &profile, comm, config)?;
        info!("Profiling report complete on rank {}", comm.rank());
        Ok(profile)
    }
}

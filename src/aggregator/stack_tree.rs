//! Call/region tree built from nested begin/end events.
//!
//! Frames live in an append-only arena and are addressed by [`FrameId`].
//! An id handed out once stays valid for the life of the tree no matter how
//! many frames are added afterwards, so the session cursor and allocation
//! records can hold ids without owning anything.

use crate::clock::Timestamp;
use log::debug;
use std::collections::BTreeMap;

/// Stable handle to a frame inside one [`StackTree`].
///
/// Ids are only meaningful for the tree that issued them; using one with a
/// different tree is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What kind of event opened a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameKind {
    For,
    Reduce,
    Scan,
    Region,
    Copy,
}

impl FrameKind {
    /// Label printed after the frame name
    pub fn tag(&self) -> &'static str {
        match self {
            FrameKind::For => "[for]",
            FrameKind::Reduce => "[reduce]",
            FrameKind::Scan => "[scan]",
            FrameKind::Region => "[region]",
            FrameKind::Copy => "[copy]",
        }
    }

    /// Wire code used when broadcasting tree shape
    pub fn code(&self) -> u8 {
        match self {
            FrameKind::For => 0,
            FrameKind::Reduce => 1,
            FrameKind::Scan => 2,
            FrameKind::Region => 3,
            FrameKind::Copy => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FrameKind::For),
            1 => Some(FrameKind::Reduce),
            2 => Some(FrameKind::Scan),
            3 => Some(FrameKind::Region),
            4 => Some(FrameKind::Copy),
            _ => None,
        }
    }
}

/// One node of the tree
#[derive(Debug, Clone)]
pub struct Frame {
    name: String,
    kind: FrameKind,
    parent: Option<FrameId>,
    children: BTreeMap<(FrameKind, String), FrameId>,

    /// Number of begin calls routed to this frame
    pub call_count: u64,

    /// Seconds accumulated over every begin/end pair
    pub total_duration: f64,

    /// Largest per-process total; only meaningful after reduction
    pub max_duration: f64,

    /// Mean per-process total; only meaningful after reduction
    pub avg_duration: f64,

    active_start: Option<Timestamp>,
}

impl Frame {
    fn new(parent: Option<FrameId>, name: String, kind: FrameKind) -> Self {
        Self {
            name,
            kind,
            parent,
            children: BTreeMap::new(),
            call_count: 0,
            total_duration: 0.0,
            max_duration: 0.0,
            avg_duration: 0.0,
            active_start: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Percentage by which the slowest process exceeds the mean
    pub fn imbalance_percent(&self) -> f64 {
        if self.avg_duration > 0.0 {
            (self.max_duration / self.avg_duration - 1.0) * 100.0
        } else {
            0.0
        }
    }
}

/// Arena-backed frame tree with an empty-named REGION root
#[derive(Debug, Clone)]
pub struct StackTree {
    frames: Vec<Frame>,
}

impl Default for StackTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StackTree {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None, String::new(), FrameKind::Region)],
        }
    }

    pub fn root(&self) -> FrameId {
        FrameId(0)
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0]
    }

    /// Number of frames ever created, including detached ones. Never zero,
    /// the root always exists.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn find_child(&self, parent: FrameId, name: &str, kind: FrameKind) -> Option<FrameId> {
        self.frame(parent)
            .children
            .get(&(kind, name.to_string()))
            .copied()
    }

    /// Look up `(kind, name)` under `parent`, creating a zeroed frame if absent
    pub fn get_or_create_child(&mut self, parent: FrameId, name: &str, kind: FrameKind) -> FrameId {
        if let Some(id) = self.find_child(parent, name, kind) {
            return id;
        }

        let id = FrameId(self.frames.len());
        self.frames
            .push(Frame::new(Some(parent), name.to_string(), kind));
        self.frames[parent.0]
            .children
            .insert((kind, name.to_string()), id);

        debug!("New frame {:?} \"{}\" {} under {:?}", id, name, kind.tag(), parent);
        id
    }

    /// Children in `(kind, name)` order
    pub fn children(&self, id: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        self.frame(id).children.values().copied()
    }

    /// Children sorted by descending total duration, ties by ascending name
    pub fn children_by_time(&self, id: FrameId) -> Vec<FrameId> {
        let mut children: Vec<FrameId> = self.children(id).collect();
        children.sort_by(|a, b| {
            let (a, b) = (self.frame(*a), self.frame(*b));
            b.total_duration
                .total_cmp(&a.total_duration)
                .then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    pub fn begin(&mut self, id: FrameId, now: Timestamp) {
        let frame = self.frame_mut(id);
        frame.call_count += 1;
        frame.active_start = Some(now);
    }

    pub fn end(&mut self, id: FrameId, end_time: Timestamp) {
        let frame = self.frame_mut(id);
        if let Some(start) = frame.active_start.take() {
            frame.total_duration += end_time - start;
        }
    }

    /// Slash-joined names from the root down; the root contributes nothing
    pub fn full_path(&self, id: FrameId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let frame = self.frame(current);
            if !frame.name.is_empty() {
                names.push(frame.name.as_str());
            }
            cursor = frame.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Unlink `child` from its parent's children. The frame stays in the
    /// arena so outstanding ids remain valid, but traversals no longer reach it.
    pub(crate) fn detach(&mut self, child: FrameId) {
        let (parent, key) = {
            let frame = self.frame(child);
            match frame.parent {
                Some(parent) => (parent, (frame.kind, frame.name.clone())),
                None => return,
            }
        };
        self.frames[parent.0].children.remove(&key);
    }
}

//! Cross-process merge of frame trees.
//!
//! All ranks walk their trees breadth-first in lockstep. At every frame the
//! timings are all-reduced, then the authority rank broadcasts its children
//! and every other rank adopts exactly that set. Children that exist only on
//! non-authority ranks are detached and never reported; there is no cheap
//! way to reconcile shapes the authority has not seen.

use super::stack_tree::{FrameId, FrameKind, StackTree};
use crate::collective::{Collective, ReduceOp};
use crate::utils::config::AUTHORITY_RANK;
use crate::utils::error::CollectiveError;
use log::debug;
use std::collections::{HashSet, VecDeque};

/// Merge `tree` across the group in place.
///
/// After return, every visited frame holds the group-wide sum in
/// `total_duration`, plus `max_duration` and `avg_duration`. On every rank
/// the reachable shape equals the authority's.
///
/// # Errors
/// Any transport failure. The tree is left partially reduced and must not
/// be reported.
pub fn reduce_tree<C: Collective + ?Sized>(
    tree: &mut StackTree,
    comm: &C,
) -> Result<(), CollectiveError> {
    let group_size = comm.size() as f64;
    let is_authority = comm.rank() == AUTHORITY_RANK;

    let mut queue = VecDeque::new();
    queue.push_back(tree.root());
    let mut visited = 0usize;

    while let Some(id) = queue.pop_front() {
        visited += 1;

        let local = tree.frame(id).total_duration;
        let sum = comm.all_reduce_f64(local, ReduceOp::Sum)?;
        let max = comm.all_reduce_f64(local, ReduceOp::Max)?;

        let frame = tree.frame_mut(id);
        frame.total_duration = sum;
        frame.max_duration = max;
        frame.avg_duration = sum / group_size;

        let local_children = tree.frame(id).child_count() as u64;
        let nchildren = comm.broadcast_u64(AUTHORITY_RANK, local_children)?;

        if is_authority {
            let children: Vec<FrameId> = tree.children(id).collect();
            for child in children {
                let frame = tree.frame(child);
                broadcast_child(comm, Some((frame.name(), frame.kind())))?;
                queue.push_back(child);
            }
        } else {
            let mut adopted = HashSet::new();
            for _ in 0..nchildren {
                let (name, kind) = broadcast_child(comm, None)?;
                let child = tree.get_or_create_child(id, &name, kind);
                adopted.insert(child);
                queue.push_back(child);
            }

            let dropped: Vec<FrameId> = tree
                .children(id)
                .filter(|child| !adopted.contains(child))
                .collect();
            for child in dropped {
                debug!(
                    "Dropping frame \"{}\" absent on rank {}",
                    tree.full_path(child),
                    AUTHORITY_RANK
                );
                tree.detach(child);
            }
        }
    }

    debug!("Reduced {} frames across {} ranks", visited, comm.size());
    Ok(())
}

/// Send (on the authority) or receive one child identity.
///
/// Payload layout: one kind code byte followed by the UTF-8 name.
fn broadcast_child<C: Collective + ?Sized>(
    comm: &C,
    child: Option<(&str, FrameKind)>,
) -> Result<(String, FrameKind), CollectiveError> {
    let payload = match child {
        Some((name, kind)) => {
            let mut bytes = Vec::with_capacity(name.len() + 1);
            bytes.push(kind.code());
            bytes.extend_from_slice(name.as_bytes());
            bytes
        }
        None => Vec::new(),
    };

    let received = comm.broadcast_bytes(AUTHORITY_RANK, &payload)?;
    let (code, name) = received
        .split_first()
        .ok_or_else(|| CollectiveError::MalformedBroadcast("empty child payload".to_string()))?;

    let kind = FrameKind::from_code(*code)
        .ok_or_else(|| CollectiveError::MalformedBroadcast(format!("unknown frame kind {}", code)))?;
    let name = String::from_utf8(name.to_vec())
        .map_err(|e| CollectiveError::MalformedBroadcast(format!("frame name: {}", e)))?;

    Ok((name, kind))
}

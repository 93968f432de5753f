//! Text report rendering.
//!
//! Only the authority rank prints the time trees. Each allocation report is
//! printed by the rank holding the largest snapshot for that space, so in a
//! multi-rank run the report is spread over the ranks' outputs.

use crate::aggregator::{FrameId, StackTree};
use crate::collective::{Collective, ReduceOp};
use crate::memory::{peak_rss_kb, Allocation, AllocationLedger, MemorySpace};
use crate::session::ReducedProfile;
use crate::utils::config::{ReportConfig, AUTHORITY_RANK};
use crate::utils::error::ProfilerError;
use std::io::{self, Write};

const RULE: &str = "===================";
const TREE_LEGEND: &str =
    "<percent of total time> <percent imbalance> <number of calls> <name> [type]";

/// Write `tree` as an indented percentage tree
///
/// Frames below `threshold_percent` of the root's total are skipped along
/// with their whole subtree.
pub fn write_tree<W: Write + ?Sized>(
    out: &mut W,
    tree: &StackTree,
    threshold_percent: f64,
) -> io::Result<()> {
    let root = tree.root();
    let tree_time = tree.frame(root).total_duration;
    write_frame(out, tree, root, "", "", tree_time, threshold_percent)?;
    writeln!(out)
}

fn write_frame<W: Write + ?Sized>(
    out: &mut W,
    tree: &StackTree,
    id: FrameId,
    my_indent: &str,
    child_indent: &str,
    tree_time: f64,
    threshold_percent: f64,
) -> io::Result<()> {
    let frame = tree.frame(id);
    let percent = frame.total_duration / tree_time * 100.0;
    // NaN (empty tree) prints nothing
    if !(percent >= threshold_percent) {
        return Ok(());
    }

    if !frame.name().is_empty() {
        writeln!(
            out,
            "{}{:.1}% {:.1}% {} {} {}",
            my_indent,
            percent,
            frame.imbalance_percent(),
            frame.call_count,
            frame.name(),
            frame.kind().tag()
        )?;
    }

    let children = tree.children_by_time(id);
    let last = children.len().saturating_sub(1);
    let connector = format!("{}|-> ", child_indent);

    for (i, child) in children.into_iter().enumerate() {
        let grandchild_indent = if i == last {
            format!("{}    ", child_indent)
        } else {
            format!("{}|   ", child_indent)
        };
        write_frame(
            out,
            tree,
            child,
            &connector,
            &grandchild_indent,
            tree_time,
            threshold_percent,
        )?;
    }
    Ok(())
}

/// Report label of an allocation: owning frame path plus the buffer name
pub fn allocation_label(tree: &StackTree, allocation: &Allocation) -> String {
    let path = tree.full_path(allocation.frame);
    if path.is_empty() {
        allocation.name.clone()
    } else {
        format!("{}/{}", path, allocation.name)
    }
}

/// Print the high-water snapshot of the rank holding the group-wide peak.
///
/// Ties go to the lowest rank. Every rank must call this; all but one
/// return without writing.
pub fn write_allocation_report<W, C>(
    out: &mut W,
    snapshot: &AllocationLedger,
    tree: &StackTree,
    comm: &C,
    threshold_percent: f64,
) -> Result<(), ProfilerError>
where
    W: Write + ?Sized,
    C: Collective + ?Sized,
{
    let total = snapshot.total_bytes();
    let max_total = comm.all_reduce_u64(total, ReduceOp::Max)?;

    let candidate = if total == max_total {
        comm.rank()
    } else {
        comm.size()
    };
    let holder = comm.all_reduce_u64(candidate as u64, ReduceOp::Min)? as usize;
    if comm.rank() != holder {
        return Ok(());
    }

    writeln!(out, "MAX BYTES ALLOCATED: {}", total)?;
    writeln!(out, "RANK WITH MAX MEMORY: {}", comm.rank())?;
    writeln!(out, "ALLOCATIONS AT TIME OF HIGH WATER MARK:")?;
    for allocation in snapshot.iter() {
        let percent = allocation.size as f64 / total as f64 * 100.0;
        if !(percent >= threshold_percent) {
            continue;
        }
        writeln!(out, "  {:.1}% {}", percent, allocation_label(tree, allocation))?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print max/min/average peak resident memory over the group (authority only)
pub fn write_process_high_water<W, C>(
    out: &mut W,
    comm: &C,
    local_kb: u64,
) -> Result<(), ProfilerError>
where
    W: Write + ?Sized,
    C: Collective + ?Sized,
{
    let max = comm.all_reduce_u64(local_kb, ReduceOp::Max)?;
    let min = comm.all_reduce_u64(local_kb, ReduceOp::Min)?;
    let ave = comm.all_reduce_u64(local_kb, ReduceOp::Sum)? / comm.size().max(1) as u64;

    if comm.rank() == AUTHORITY_RANK {
        writeln!(
            out,
            "Host process high water mark memory consumption: {} kB",
            max
        )?;
        writeln!(out, "  Max: {}, Min: {}, Ave: {} kB", max, min, ave)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Write the complete report for this rank
pub fn write_report<W, C>(
    out: &mut W,
    profile: &ReducedProfile,
    comm: &C,
    config: &ReportConfig,
) -> Result<(), ProfilerError>
where
    W: Write + ?Sized,
    C: Collective + ?Sized,
{
    let authority = comm.rank() == AUTHORITY_RANK;
    let threshold = config.threshold_percent;

    if authority {
        let total_time = profile.top_down.frame(profile.top_down.root()).max_duration;
        writeln!(out)?;
        writeln!(out, "BEGIN {}:", config.title)?;
        writeln!(out, "TOTAL TIME: {} seconds", total_time)?;
        writeln!(out, "TOP-DOWN TIME TREE:")?;
        writeln!(out, "{}", TREE_LEGEND)?;
        writeln!(out, "{}", RULE)?;
        write_tree(out, &profile.top_down, threshold)?;
        writeln!(out, "BOTTOM-UP TIME TREE:")?;
        writeln!(out, "{}", TREE_LEGEND)?;
        writeln!(out, "{}", RULE)?;
        write_tree(out, &profile.bottom_up, threshold)?;
    }

    for space in MemorySpace::ALL {
        if authority {
            writeln!(out, "{} SPACE:", space.label())?;
            writeln!(out, "{}", RULE)?;
        }
        write_allocation_report(
            out,
            &profile.high_water[space.index()],
            &profile.top_down,
            comm,
            threshold,
        )?;
    }

    write_process_high_water(out, comm, peak_rss_kb())?;

    if authority {
        writeln!(out, "END {}.", config.title)?;
    }
    out.flush()?;
    Ok(())
}

//! Bottom-up view of a call tree.
//!
//! Every frame's self time is charged along its ancestor chain read
//! leaf-first, so the inverted root's children are the frames where time
//! was actually spent, and their children are the callers.

use super::stack_tree::StackTree;
use log::debug;
use std::collections::VecDeque;

/// Build the inverted (self-time) tree of `tree`
///
/// # Algorithm
/// 1. Walk the original tree breadth-first
/// 2. Self time = total minus the children's totals; self calls = call count
/// 3. Descend the inverted tree along frame, parent, ..., root, creating
///    nodes as needed, adding self time and calls at each step
/// 4. Also add them at the inverted root
pub fn invert(tree: &StackTree) -> StackTree {
    let mut inverted = StackTree::new();
    let inv_root = inverted.root();

    let mut queue = VecDeque::new();
    queue.push_back(tree.root());

    while let Some(id) = queue.pop_front() {
        let frame = tree.frame(id);
        let mut self_time = frame.total_duration;
        let self_calls = frame.call_count;

        for child in tree.children(id) {
            self_time -= tree.frame(child).total_duration;
            queue.push_back(child);
        }

        let root_frame = inverted.frame_mut(inv_root);
        root_frame.total_duration += self_time;
        root_frame.call_count += self_calls;

        let mut inv_node = inv_root;
        let mut chain = Some(id);
        while let Some(ancestor) = chain {
            let original = tree.frame(ancestor);
            inv_node = inverted.get_or_create_child(inv_node, original.name(), original.kind());

            let inv_frame = inverted.frame_mut(inv_node);
            inv_frame.total_duration += self_time;
            inv_frame.call_count += self_calls;

            chain = original.parent();
        }
    }

    debug!(
        "Inverted tree of {} frames into {} frames",
        tree.len(),
        inverted.len()
    );

    inverted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::stack_tree::FrameKind;

    fn sample_tree() -> StackTree {
        // root 10s: A 6s (B 4s), C 3s
        let mut tree = StackTree::new();
        let root = tree.root();
        tree.frame_mut(root).total_duration = 10.0;
        tree.frame_mut(root).call_count = 1;

        let a = tree.get_or_create_child(root, "A", FrameKind::Region);
        tree.frame_mut(a).total_duration = 6.0;
        tree.frame_mut(a).call_count = 2;

        let b = tree.get_or_create_child(a, "B", FrameKind::For);
        tree.frame_mut(b).total_duration = 4.0;
        tree.frame_mut(b).call_count = 5;

        let c = tree.get_or_create_child(root, "C", FrameKind::For);
        tree.frame_mut(c).total_duration = 3.0;
        tree.frame_mut(c).call_count = 1;
        tree
    }

    #[test]
    fn test_inverted_root_children_are_leaf_most() {
        let tree = sample_tree();
        let inverted = invert(&tree);
        let root = inverted.root();

        let b = inverted.find_child(root, "B", FrameKind::For).unwrap();
        assert!((inverted.frame(b).total_duration - 4.0).abs() < 1e-9);
        assert_eq!(inverted.frame(b).call_count, 5);

        // B's caller chain: B -> A -> root
        let a_under_b = inverted.find_child(b, "A", FrameKind::Region).unwrap();
        assert!((inverted.frame(a_under_b).total_duration - 4.0).abs() < 1e-9);
        assert!(inverted
            .find_child(a_under_b, "", FrameKind::Region)
            .is_some());

        // A's own self time is 2s
        let a = inverted.find_child(root, "A", FrameKind::Region).unwrap();
        assert!((inverted.frame(a).total_duration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_self_time_is_conserved() {
        let tree = sample_tree();
        let inverted = invert(&tree);
        let root = inverted.root();

        let sum: f64 = inverted
            .children(root)
            .map(|id| inverted.frame(id).total_duration)
            .sum();
        assert!((sum - 10.0).abs() < 1e-9);
        assert!((inverted.frame(root).total_duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_name_merges_across_call_sites() {
        let mut tree = StackTree::new();
        let root = tree.root();
        tree.frame_mut(root).total_duration = 5.0;
        let x = tree.get_or_create_child(root, "X", FrameKind::Region);
        tree.frame_mut(x).total_duration = 2.0;
        let y = tree.get_or_create_child(root, "Y", FrameKind::Region);
        tree.frame_mut(y).total_duration = 3.0;
        let kx = tree.get_or_create_child(x, "kernel", FrameKind::For);
        tree.frame_mut(kx).total_duration = 2.0;
        let ky = tree.get_or_create_child(y, "kernel", FrameKind::For);
        tree.frame_mut(ky).total_duration = 1.0;

        let inverted = invert(&tree);
        let kernel = inverted
            .find_child(inverted.root(), "kernel", FrameKind::For)
            .unwrap();
        assert!((inverted.frame(kernel).total_duration - 3.0).abs() < 1e-9);
        assert_eq!(inverted.frame(kernel).child_count(), 2);
    }
}

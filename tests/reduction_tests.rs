use space_time_stack::aggregator::{reduce_tree, FrameKind, StackTree};
use space_time_stack::clock::ManualClock;
use space_time_stack::collective::{Collective, ThreadComm, ThreadGroup};
use space_time_stack::utils::config::SUPPORTED_INTERFACE_VERSION;
use space_time_stack::{ReducedProfile, Session};
use std::sync::Arc;
use std::thread;

fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(ThreadComm) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = ThreadGroup::new(size)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            thread::spawn(move || f(comm))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn child_names(tree: &StackTree) -> Vec<String> {
    let mut names: Vec<String> = tree
        .children(tree.root())
        .map(|id| tree.frame(id).name().to_string())
        .collect();
    names.sort();
    names
}

/// Rank 0 runs A (1s) then B (2s); rank 1 runs A (3s) then C (1s)
fn divergent_profile(comm: &ThreadComm) -> ReducedProfile {
    let mut s =
        Session::init_with_clock(SUPPORTED_INTERFACE_VERSION, ManualClock::new()).unwrap();
    let (a_secs, other, other_secs) = if comm.rank() == 0 {
        (1.0, "B", 2.0)
    } else {
        (3.0, "C", 1.0)
    };

    let a = s.begin_parallel_for("A");
    s.clock().advance_secs(a_secs);
    s.end_parallel_for(a).unwrap();

    let k = s.begin_parallel_for(other);
    s.clock().advance_secs(other_secs);
    s.end_parallel_for(k).unwrap();

    s.into_reduced(comm).unwrap()
}

#[test]
fn test_authority_shape_wins() {
    let profiles = run_ranks(2, |comm| divergent_profile(&comm));

    for profile in &profiles {
        assert_eq!(
            child_names(&profile.top_down),
            vec!["A".to_string(), "B".to_string()]
        );
    }
}

#[test]
fn test_timings_combined_across_ranks() {
    let profiles = run_ranks(2, |comm| divergent_profile(&comm));

    for profile in &profiles {
        let tree = &profile.top_down;
        let root = tree.frame(tree.root());
        assert!((root.total_duration - 7.0).abs() < 1e-9);
        assert!((root.max_duration - 4.0).abs() < 1e-9);
        assert!((root.avg_duration - 3.5).abs() < 1e-9);

        let a = tree.find_child(tree.root(), "A", FrameKind::For).unwrap();
        let a = tree.frame(a);
        assert!((a.total_duration - 4.0).abs() < 1e-9);
        assert!((a.max_duration - 3.0).abs() < 1e-9);
        assert!((a.avg_duration - 2.0).abs() < 1e-9);
        assert!((a.imbalance_percent() - 50.0).abs() < 1e-9);

        // B never ran on rank 1, which contributes zero
        let b = tree.find_child(tree.root(), "B", FrameKind::For).unwrap();
        let b = tree.frame(b);
        assert!((b.total_duration - 2.0).abs() < 1e-9);
        assert!((b.avg_duration - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_placeholder_created_on_non_authority() {
    let profiles = run_ranks(2, |comm| divergent_profile(&comm));
    let tree = &profiles[1].top_down;

    let b = tree.find_child(tree.root(), "B", FrameKind::For).unwrap();
    assert_eq!(tree.frame(b).call_count, 0);
    assert!(tree.find_child(tree.root(), "C", FrameKind::For).is_none());
}

#[test]
fn test_bottom_up_tree_reduced_too() {
    let profiles = run_ranks(2, |comm| divergent_profile(&comm));

    for profile in &profiles {
        let tree = &profile.bottom_up;
        let a = tree.find_child(tree.root(), "A", FrameKind::For).unwrap();
        assert!((tree.frame(a).total_duration - 4.0).abs() < 1e-9);
        assert!(tree.find_child(tree.root(), "C", FrameKind::For).is_none());
    }
}

#[test]
fn test_deep_divergence_reconciled_breadth_first() {
    let trees = run_ranks(3, |comm| {
        let mut tree = StackTree::new();
        let root = tree.root();
        let outer = tree.get_or_create_child(root, "outer", FrameKind::Region);
        tree.frame_mut(outer).total_duration = 1.0;

        // Every rank has a differently named leaf under "outer"
        let leaf_name = format!("leaf{}", comm.rank());
        let leaf = tree.get_or_create_child(outer, &leaf_name, FrameKind::For);
        tree.frame_mut(leaf).total_duration = 0.5;

        reduce_tree(&mut tree, &comm).unwrap();
        tree
    });

    for tree in &trees {
        let outer = tree
            .find_child(tree.root(), "outer", FrameKind::Region)
            .unwrap();
        assert!((tree.frame(outer).total_duration - 3.0).abs() < 1e-9);

        let leaves: Vec<&str> = tree.children(outer).map(|id| tree.frame(id).name()).collect();
        assert_eq!(leaves, vec!["leaf0"]);

        let leaf0 = tree.find_child(outer, "leaf0", FrameKind::For).unwrap();
        assert!((tree.frame(leaf0).total_duration - 0.5).abs() < 1e-9);
        assert!((tree.frame(leaf0).max_duration - 0.5).abs() < 1e-9);
    }
}

use pretty_assertions::assert_eq;
use space_time_stack::aggregator::FrameKind;
use space_time_stack::clock::ManualClock;
use space_time_stack::collective::SingleProcess;
use space_time_stack::memory::MemorySpace;
use space_time_stack::utils::config::{ReportConfig, SUPPORTED_INTERFACE_VERSION};
use space_time_stack::utils::ProfilerError;
use space_time_stack::Session;

fn session() -> Session<ManualClock> {
    Session::init_with_clock(SUPPORTED_INTERFACE_VERSION, ManualClock::new()).unwrap()
}

fn report_lines(text: &str, header: &str, footer: &str) -> Vec<String> {
    text.lines()
        .skip_while(|line| *line != header)
        .skip(3)
        .take_while(|line| *line != footer && !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_two_kernel_scenario() {
    let mut s = session();

    let a = s.begin_parallel_for("A");
    s.clock().advance_secs(0.010);
    s.end_parallel_for(a).unwrap();

    let b = s.begin_parallel_for("B");
    s.clock().advance_secs(0.030);
    s.end_parallel_for(b).unwrap();

    let mut out = Vec::new();
    let profile = s
        .finalize(&SingleProcess, &mut out, &ReportConfig::default())
        .unwrap();

    let tree = &profile.top_down;
    let root_total = tree.frame(tree.root()).total_duration;
    assert!((root_total - 0.040).abs() < 1e-9);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("TOTAL TIME: 0.04 seconds"));
    assert_eq!(
        report_lines(&text, "TOP-DOWN TIME TREE:", "BOTTOM-UP TIME TREE:"),
        vec![
            "|-> 75.0% 0.0% 1 B [for]".to_string(),
            "|-> 25.0% 0.0% 1 A [for]".to_string(),
        ]
    );
    assert_eq!(
        report_lines(&text, "BOTTOM-UP TIME TREE:", "HOST SPACE:"),
        vec![
            "|-> 75.0% 0.0% 1 B [for]".to_string(),
            "|-> 25.0% 0.0% 1 A [for]".to_string(),
        ]
    );
}

#[test]
fn test_allocation_scenario() {
    let mut s = session();

    s.allocate(MemorySpace::Host, "buf1", 0x1000, 1000).unwrap();
    assert_eq!(s.ledgers().current(MemorySpace::Host).total_bytes(), 1000);
    s.allocate(MemorySpace::Host, "buf2", 0x2000, 200).unwrap();
    assert_eq!(s.ledgers().current(MemorySpace::Host).total_bytes(), 1200);
    s.deallocate(MemorySpace::Host, "buf1", 0x1000, 1000).unwrap();
    assert_eq!(s.ledgers().current(MemorySpace::Host).total_bytes(), 200);

    let peak = s.ledgers().high_water(MemorySpace::Host);
    assert_eq!(peak.total_bytes(), 1200);
    assert_eq!(peak.len(), 2);

    let mut out = Vec::new();
    s.finalize(&SingleProcess, &mut out, &ReportConfig::default())
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    let host_section: Vec<&str> = text
        .lines()
        .skip_while(|line| *line != "HOST SPACE:")
        .take_while(|line| *line != "DEVICE SPACE:")
        .collect();
    assert_eq!(
        host_section,
        vec![
            "HOST SPACE:",
            "===================",
            "MAX BYTES ALLOCATED: 1200",
            "RANK WITH MAX MEMORY: 0",
            "ALLOCATIONS AT TIME OF HIGH WATER MARK:",
            "  83.3% buf1",
            "  16.7% buf2",
            "",
        ]
    );
}

#[test]
fn test_allocations_labelled_with_frame_path() {
    let mut s = session();
    s.push_region("setup");
    let k = s.begin_parallel_for("init");
    s.allocate(MemorySpace::Device, "field", 0x10, 4096).unwrap();
    s.clock().advance_secs(1.0);
    s.end_parallel_for(k).unwrap();
    s.pop_region().unwrap();

    let mut out = Vec::new();
    s.finalize(&SingleProcess, &mut out, &ReportConfig::default())
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  100.0% setup/init/field"));
}

#[test]
fn test_mismatched_end_names_expected_frame() {
    let mut s = session();
    let outer = s.begin_parallel_for("outer");
    let _inner = s.begin_parallel_scan("inner");

    let err = s.end_parallel_for(outer).unwrap_err();
    assert!(matches!(err, ProfilerError::MismatchedEnd { .. }));
    assert_eq!(
        err.to_string(),
        "Expected \"outer/inner\" to end, got different kernel ID"
    );
}

#[test]
fn test_unterminated_frame_blocks_finalize() {
    let mut s = session();
    s.push_region("never_popped");

    let mut out = Vec::new();
    let err = s
        .finalize(&SingleProcess, &mut out, &ReportConfig::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Program ended before \"never_popped\" ended"
    );
    assert!(out.is_empty());
}

#[test]
fn test_repeated_frames_accumulate() {
    let mut s = session();
    for _ in 0..4 {
        s.push_region("loop");
        s.clock().advance_secs(0.5);
        s.pop_region().unwrap();
    }

    let tree = s.tree();
    let frame = tree
        .find_child(tree.root(), "loop", FrameKind::Region)
        .unwrap();
    assert_eq!(tree.frame(frame).call_count, 4);
    assert!((tree.frame(frame).total_duration - 2.0).abs() < 1e-9);
}

#[test]
fn test_threshold_from_config() {
    let mut s = session();
    s.push_region("big");
    s.clock().advance_secs(0.97);
    s.pop_region().unwrap();
    s.push_region("small");
    s.clock().advance_secs(0.03);
    s.pop_region().unwrap();

    let config = ReportConfig {
        threshold_percent: 5.0,
        ..Default::default()
    };
    let mut out = Vec::new();
    s.finalize(&SingleProcess, &mut out, &config).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("97.0% 0.0% 1 big [region]"));
    assert!(!text.contains("small"));
    assert!(text.starts_with("\nBEGIN PROFILING REPORT:\n"));
    assert!(text.ends_with("END PROFILING REPORT.\n"));
}

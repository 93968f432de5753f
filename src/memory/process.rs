//! Process resident-memory high-water mark.

use log::debug;

/// Peak resident set size in kB.
///
/// Reads `VmHWM` from `/proc/self/status`, falling back to `VmRSS`. Returns
/// 0 where neither is available.
pub fn peak_rss_kb() -> u64 {
    let status = match std::fs::read_to_string("/proc/self/status") {
        Ok(status) => status,
        Err(e) => {
            debug!("Process memory statistics unavailable: {}", e);
            return 0;
        }
    };

    parse_status_kb(&status, "VmHWM:")
        .or_else(|| parse_status_kb(&status, "VmRSS:"))
        .unwrap_or(0)
}

fn parse_status_kb(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}

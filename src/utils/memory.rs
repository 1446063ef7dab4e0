//! Resident memory of the current process, for the run summary.

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, get_current_pid};

/// Resident set size in bytes, or `None` when the platform does not report it.
pub fn current_rss_bytes() -> Option<u64> {
    let pid = get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    sys.process(pid).map(|p| p.memory())
}

/// Signed difference `after - before`; `None` if either sample is missing.
pub fn rss_delta(before: Option<u64>, after: Option<u64>) -> Option<i64> {
    Some(after? as i64 - before? as i64)
}

/// Human-readable signed byte count (`+12.3 MB`, `-512 KB`).
pub fn format_delta(delta: Option<i64>) -> String {
    let Some(d) = delta else {
        return "n/a".to_string();
    };
    let sign = if d < 0 { "-" } else { "+" };
    let abs = d.unsigned_abs() as f64;
    if abs >= 1024.0 * 1024.0 {
        format!("{sign}{:.1} MB", abs / (1024.0 * 1024.0))
    } else {
        format!("{sign}{:.0} KB", abs / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_formatting() {
        assert_eq!(format_delta(None), "n/a");
        assert_eq!(format_delta(Some(3 * 1024 * 1024)), "+3.0 MB");
        assert_eq!(format_delta(Some(-2048)), "-2 KB");
        assert_eq!(rss_delta(Some(10), Some(4)), Some(-6));
        assert_eq!(rss_delta(None, Some(4)), None);
    }
}

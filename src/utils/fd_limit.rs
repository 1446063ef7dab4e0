//! File descriptor limit detection for capping the reader pool (Unix).

/// Descriptors a reader holds at once: the CSV being read plus headroom for the precheck pass.
pub const FDS_PER_READER: usize = 2;

/// Fraction of the process FD limit the pool may use.
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Soft limit for open file descriptors, or `None` if unavailable or unlimited.
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Largest reader count that stays under ~80% of the FD limit. `None` when there is no limit.
pub fn max_readers_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = (limit as f64 * FD_LIMIT_FRACTION) as usize;
    Some((usable / FDS_PER_READER).max(1))
}

/// Cap `requested` by the FD limit, logging when it bites.
pub fn cap_by_fd_limit(requested: usize) -> usize {
    match max_readers_by_fd_limit() {
        Some(cap) if cap < requested => {
            log::debug!("Capping readers {} -> {} (FD limit ~80%)", requested, cap);
            cap
        }
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_never_returns_zero_or_more_than_requested() {
        assert_eq!(cap_by_fd_limit(1), 1);
        let capped = cap_by_fd_limit(10_000_000);
        assert!(capped >= 1 && capped <= 10_000_000);
    }
}

//! Progress bar utilities for the read phase

use kdam::{Animation, Bar, BarExt};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )))
}

/// Bar for `total` files when requested and stderr is a terminal.
pub fn reading_bar(enabled: bool, total: usize) -> Option<ProgressBar> {
    (enabled && total > 0 && std::io::stderr().is_terminal()).then(|| {
        create_progress_bar(ProgressBarConfig::new(total, "Reading", Animation::Classic))
    })
}

/// Uses try_lock so a contended bar never blocks the caller; the next update catches up.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Push the bar to its total. `shown` is how many updates were already applied.
pub fn finish_progress_bar(pb: &ProgressBar, shown: usize) {
    if let Ok(mut pb) = pb.lock() {
        let remaining = pb.total.saturating_sub(shown);
        if remaining > 0 {
            let _ = pb.update(remaining);
        }
        let _ = pb.refresh();
        eprintln!();
    }
}

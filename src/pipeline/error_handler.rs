use super::merge::MergeStats;

/// Summarize excluded files after a merge. Individual failures were already reported per file.
pub fn report_failures(stats: &MergeStats) {
    let rejected = stats.candidates.saturating_sub(stats.files_validated);
    if rejected > 0 {
        log::info!(
            "{} of {} files lacked required columns or had no readable header",
            rejected,
            stats.candidates
        );
    }
    if stats.files_failed > 0 {
        log::warn!(
            "Skipped {} files due to read failures ({} timed out)",
            stats.files_failed,
            stats.files_timed_out
        );
    }
}

//! Gate 1: change-size limit.
//!
//! Small surgical rewrites are reviewable and revertable; wholesale
//! rewrites are rejected regardless of content.

use crate::error::ValidationError;

const CAP_FRACTION: f64 = 0.6;
const CAP_MIN: usize = 20;
const CAP_MAX: usize = 80;

/// The per-proposal cap: 60% of the old line count, clamped to [20, 80].
pub fn change_cap(old_lines: usize) -> usize {
    ((old_lines as f64 * CAP_FRACTION).round() as usize).clamp(CAP_MIN, CAP_MAX)
}

/// Count changed lines: the line-count delta plus the number of positions
/// whose content differs, the shorter sequence padded with empty lines.
pub fn changed_lines(old_source: &str, new_source: &str) -> usize {
    let old: Vec<&str> = old_source.lines().collect();
    let new: Vec<&str> = new_source.lines().collect();
    let delta = old.len().abs_diff(new.len());
    let max_len = old.len().max(new.len());
    let differing = (0..max_len)
        .filter(|&i| old.get(i).copied().unwrap_or("") != new.get(i).copied().unwrap_or(""))
        .count();
    delta + differing
}

/// Run the gate: reject when the change exceeds the cap.
pub fn size_gate(old_source: &str, new_source: &str) -> Result<(), ValidationError> {
    let changed = changed_lines(old_source, new_source);
    let cap = change_cap(old_source.lines().count());
    if changed > cap {
        return Err(ValidationError::TooManyChanges { changed, cap });
    }
    Ok(())
}

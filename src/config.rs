//! Tunable constants for the consistency checks.
//!
//! The chapter-oracle window and the per-packet audio sync window are
//! empirically derived and vary with disc authoring patterns, so they
//! are carried as configuration rather than hard constants.

/// Tolerances applied by the non-fatal consistency checks.
#[derive(Debug, Clone)]
pub struct Tolerances {
    /// Maximum chapter/oracle discrepancy, in frame durations, before a
    /// mismatch is logged.
    pub chapter_check_frames: u32,
    /// PTS ticks (90 kHz) covered by one AC3 PES packet, used for the
    /// audio/video offset computation.
    pub sync_window_pts: u64,
    /// Maximum audio/video length delta, in seconds, before an
    /// alignment warning is logged.
    pub av_length_delta: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            chapter_check_frames: 20,
            sync_window_pts: 2880,
            av_length_delta: 0.04,
        }
    }
}

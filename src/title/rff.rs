//! Telecine reconciliation.
//!
//! Encoded DVD frames carry a repeat-first-field bit: a frame displays
//! 2 fields (RFF clear) or 3 fields (RFF set) in real time. This module
//! either materializes that expansion frame by frame or folds it into
//! timing metadata on the unexpanded stream.

use crate::av::{FrameFlag, Fps, VideoStream};
use crate::error::{DvdError, Result};

/// How encoded-frame telecine flags are reconciled into a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RffMode {
    /// Duplicate each encoded frame 2x or 3x per its RFF bit and tag
    /// the result with the nominal rate.
    #[default]
    Exact,
    /// Keep the stream unexpanded and inject per-frame durations and
    /// absolute timestamps instead.
    PerFrameDurations,
    /// Keep the stream unexpanded and tag it with a single averaged
    /// constant rate.
    AveragedRate,
}

/// Picks the nominal rate (PAL 25 or NTSC 30000/1001) closest to the
/// handle's reported rate.
///
/// A zero-valued rate means the host pipeline reported variable frame
/// rate, which the timeline math cannot work with.
pub fn nominal_fps(reported: Fps) -> Result<Fps> {
    if reported.num == 0 || reported.den == 0 {
        return Err(DvdError::StructuralParse(
            "video handle reports a variable frame rate".to_string(),
        ));
    }
    let rate = reported.as_f64();
    if (25.0 - rate).abs() < (30.0 - rate).abs() {
        Ok(Fps::PAL)
    } else {
        Ok(Fps::NTSC_FILM)
    }
}

/// Expands an encoded-frame stream into the real-time frame sequence:
/// each frame is repeated twice, or three times when its RFF bit is
/// set. The result is tagged with `nominal`.
pub fn expand_rff_video<V: VideoStream>(video: &V, flags: &[FrameFlag], nominal: Fps) -> V {
    let mut out: Option<V> = None;
    for (i, flag) in flags.iter().enumerate() {
        let frame = video.slice(i..i + 1);
        let repeats = if flag.rff { 3 } else { 2 };
        for _ in 0..repeats {
            out = Some(match out {
                Some(acc) => acc.concat(&frame),
                None => frame.clone(),
            });
        }
    }
    match out {
        Some(v) => v.with_fps(nominal),
        None => video.with_fps(nominal),
    }
}

/// Expands the per-encoded-frame (vob_id, cell_id) tags in lockstep
/// with [`expand_rff_video`].
pub fn expand_rff_tags(flags: &[FrameFlag]) -> Vec<(u16, u8)> {
    let mut out = Vec::with_capacity(flags.len() * 2);
    for flag in flags {
        let repeats = if flag.rff { 3 } else { 2 };
        for _ in 0..repeats {
            out.push(flag.vob_cell());
        }
    }
    out
}

/// One averaged constant rate for an unexpanded stream:
/// `nominal * n * 2 / (3 * set + 2 * (n - set))` where `set` counts
/// frames with RFF set.
pub fn averaged_fps(nominal: Fps, flags: &[FrameFlag]) -> Result<Fps> {
    if flags.is_empty() {
        return Err(DvdError::StructuralParse(
            "cannot average a frame rate over zero frames".to_string(),
        ));
    }
    let n = flags.len() as u64;
    let set = flags.iter().filter(|f| f.rff).count() as u64;
    Ok(Fps::new(
        nominal.num * n * 2,
        nominal.den * (3 * set + 2 * (n - set)),
    ))
}

/// Per-encoded-frame durations in seconds, as exact fractions:
/// `den * (rff + 2) / (num * 2)` of the nominal rate.
pub fn rff_timecodes(nominal: Fps, flags: &[FrameFlag]) -> Vec<Fps> {
    flags
        .iter()
        .map(|f| {
            let fields = if f.rff { 3 } else { 2 };
            Fps::new(nominal.den * fields, nominal.num * 2)
        })
        .collect()
}

/// Cumulative start times from a duration table: entry `i` is the sum
/// of durations `0..i`, so entry 0 is always 0.
pub fn absolute_times_from_durations(durations: &[Fps]) -> Vec<f64> {
    let mut out = Vec::with_capacity(durations.len());
    let mut acc = 0.0;
    for i in 0..durations.len() {
        if i > 0 {
            acc += durations[i - 1].as_f64();
        }
        out.push(acc);
    }
    out
}

/// Start times for a constant-rate stream of `len` frames.
pub fn absolute_times_constant(fps: Fps, len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64 * fps.frame_duration()).collect()
}

/// A contiguous frame run owned by one (vob_id, cell_id) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRun {
    /// Owning VOB id.
    pub vob: u16,
    /// Owning cell id.
    pub cell: u8,
    /// First frame of the run.
    pub start: usize,
    /// One past the last frame of the run.
    pub end: usize,
}

/// Collects the (vob, cell) frame runs of a flag array in one linear
/// scan. Adjacent frames with the same owner join the open run.
pub fn vobid_runs(flags: &[FrameFlag]) -> Vec<CellRun> {
    let mut runs: Vec<CellRun> = Vec::new();
    for (i, flag) in flags.iter().enumerate() {
        let (vob, cell) = flag.vob_cell();
        match runs.last_mut() {
            Some(run) if run.vob == vob && run.cell == cell && run.end == i => {
                run.end = i + 1;
            }
            _ => runs.push(CellRun {
                vob,
                cell,
                start: i,
                end: i + 1,
            }),
        }
    }
    runs
}

/// The frame ranges belonging to an ordered cell list, in cell order.
/// A cell may own several disjoint runs; all are taken, in scan order.
pub fn frame_ranges_for_cells(
    runs: &[CellRun],
    cells: &[(u16, u8)],
) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::new();
    for &(vob, cell) in cells {
        let before = ranges.len();
        for run in runs.iter().filter(|r| r.vob == vob && r.cell == cell) {
            ranges.push((run.start, run.end));
        }
        if ranges.len() == before {
            return Err(DvdError::StructuralParse(format!(
                "no indexed frames for vob {} cell {}",
                vob, cell
            )));
        }
    }
    Ok(ranges)
}

/// Cuts a stream down to the given frame ranges, concatenated in order.
pub fn cut_video_on_ranges<V: VideoStream>(video: &V, ranges: &[(usize, usize)]) -> V {
    let mut out: Option<V> = None;
    for &(start, end) in ranges {
        let piece = video.slice(start..end);
        out = Some(match out {
            Some(acc) => acc.concat(&piece),
            None => piece,
        });
    }
    out.unwrap_or_else(|| video.slice(0..0))
}

/// Cuts a flag array down to the given frame ranges.
pub fn cut_flags_on_ranges(flags: &[FrameFlag], ranges: &[(usize, usize)]) -> Vec<FrameFlag> {
    let mut out = Vec::new();
    for &(start, end) in ranges {
        out.extend_from_slice(&flags[start..end]);
    }
    out
}

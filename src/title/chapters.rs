use crate::av::Fps;
use crate::error::{DvdError, Result};
use log::warn;

/// Chapter boundaries derived for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSet {
    /// Frame indices of chapter boundaries. Starts at 0 and ends on
    /// the title's final frame, always.
    pub chapters: Vec<usize>,
    /// Raw cell-change frame indices (final frame appended); kept for
    /// diagnostics and hosts that want cell granularity.
    pub cell_changes: Vec<usize>,
    /// When the authored last boundary did not land on the final
    /// frame, its original value before being overwritten.
    pub patched_end_chapter: Option<usize>,
}

/// Derives chapter frame boundaries from a per-frame cell tag array
/// and the resolver's chapter flags.
///
/// `tags` holds one (vob_id, cell_id) owner per timeline frame.
/// `is_chapter` holds one flag per taken cell; the number of tag runs
/// must match it, which ties the index back to the navigation data.
pub fn derive_chapters(tags: &[(u16, u8)], is_chapter: &[bool]) -> Result<ChapterSet> {
    if tags.is_empty() {
        return Err(DvdError::StructuralParse(
            "cannot derive chapters from an empty frame timeline".to_string(),
        ));
    }

    let mut changes = Vec::new();
    for i in 1..tags.len() {
        if tags[i] != tags[i - 1] {
            changes.push(i);
        }
    }
    let final_frame = tags.len() - 1;
    changes.push(final_frame);

    if changes.len() != is_chapter.len() {
        return Err(DvdError::StructuralParse(format!(
            "frame timeline holds {} cell runs but the title took {} cells",
            changes.len(),
            is_chapter.len()
        )));
    }

    let last_flagged = match is_chapter.iter().rposition(|&c| c) {
        Some(i) => i,
        None => {
            return Err(DvdError::StructuralParse(
                "title has no chapter-flagged cells".to_string(),
            ))
        }
    };

    // A chapter's end boundary is the change index just before the
    // next flagged cell; runs of unflagged cells collapse into it.
    let mut chapters = Vec::new();
    for i in 0..is_chapter.len() {
        if !is_chapter[i] {
            continue;
        }
        let boundary = match (i + 1..is_chapter.len()).find(|&j| is_chapter[j]) {
            Some(j) => changes[j - 1],
            None => changes[last_flagged],
        };
        chapters.push(boundary);
    }

    chapters.insert(0, 0);

    let mut patched_end_chapter = None;
    if *chapters.last().unwrap() != final_frame {
        patched_end_chapter = Some(*chapters.last().unwrap());
        *chapters.last_mut().unwrap() = final_frame;
    }

    Ok(ChapterSet {
        chapters,
        cell_changes: changes,
        patched_end_chapter,
    })
}

/// Cross-checks derived boundaries against an independently computed
/// chapter-time oracle. Mismatches are logged, never fatal.
///
/// `boundaries` are the pre-patch chapter end boundaries (no leading
/// zero), matching what navigation-level tools report. An NTSC oracle
/// is rescaled by 1.001 to the 30000/1001 timebase first.
pub fn check_against_oracle(
    boundaries: &[usize],
    absolute_time: &[f64],
    oracle: &[f64],
    nominal: Fps,
    tolerance_frames: u32,
) -> Vec<String> {
    let mut diffs = Vec::new();

    let oracle: Vec<f64> = if nominal.den == 1001 {
        oracle.iter().map(|t| t * 1.001).collect()
    } else {
        oracle.to_vec()
    };

    let ours: Vec<f64> = boundaries
        .iter()
        .filter_map(|&b| absolute_time.get(b).copied())
        .collect();

    if ours.len() != oracle.len() {
        diffs.push(format!(
            "oracle reports {} chapters, derived {}",
            oracle.len(),
            ours.len()
        ));
    } else {
        let tolerance = nominal.frame_duration() * tolerance_frames as f64;
        for (i, (a, b)) in ours.iter().zip(oracle.iter()).enumerate() {
            if (a - b).abs() > tolerance {
                diffs.push(format!(
                    "chapter {} at {:.3}s, oracle says {:.3}s",
                    i + 1,
                    a,
                    b
                ));
                break;
            }
        }
    }

    for d in &diffs {
        warn!("chapter oracle mismatch: {}", d);
    }
    diffs
}

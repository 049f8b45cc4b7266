use crate::av::{AudioStream, VideoStream};
use crate::error::{DvdError, Result};

/// Validates a split list: strictly increasing integers in
/// `[1, num_chapters]`. Split value `k` cuts after chapter `k - 1`.
/// Returns the number of output pieces.
pub fn sanitize_splits(splits: &[usize], num_chapters: usize) -> Result<usize> {
    let mut last = 0usize;
    for &s in splits {
        if s == 0 || s <= last {
            return Err(DvdError::Configuration(format!(
                "split list must be strictly increasing and 1-based, got {:?}",
                splits
            )));
        }
        if s > num_chapters {
            return Err(DvdError::Configuration(format!(
                "split point {} exceeds chapter count {}",
                s, num_chapters
            )));
        }
        last = s;
    }
    Ok(splits.len() + 1)
}

/// The (from, to) chapter-index pair of each output piece, 0-based and
/// inclusive on both ends.
pub fn piece_boundaries(splits: &[usize], num_chapters: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(splits.len() + 1);
    let mut last = 0usize;
    for &s in splits {
        let index = s - 1;
        out.push((last, index));
        last = index;
    }
    out.push((last, num_chapters - 1));
    out
}

/// Partitions a chapter list at the split points, rebasing each piece
/// to start at frame 0 of its first retained chapter.
pub fn split_chapters(chapters: &[usize], splits: &[usize]) -> Vec<Vec<usize>> {
    let mut out = Vec::with_capacity(splits.len() + 1);
    let mut rebase = chapters[0];
    let mut piece = Vec::new();

    for (i, &c) in chapters.iter().enumerate() {
        piece.push(c - rebase);
        if splits.contains(&(i + 1)) {
            rebase = c;
            out.push(std::mem::replace(&mut piece, vec![0]));
        }
    }
    if !piece.is_empty() {
        out.push(piece);
    }
    out
}

/// Slices the video handle into one piece per split boundary pair.
/// Each piece covers `chapters[from]..chapters[to]`, half-open.
pub fn split_video<V: VideoStream>(video: &V, chapters: &[usize], splits: &[usize]) -> Vec<V> {
    piece_boundaries(splits, chapters.len())
        .into_iter()
        .map(|(f, t)| video.slice(chapters[f]..chapters[t]))
        .collect()
}

/// Slices an audio handle into one piece per split boundary pair,
/// converting chapter frames to samples via the absolute-time table.
/// Sample positions are rounded and clamped to the handle's length.
pub fn split_audio<A: AudioStream>(
    audio: &A,
    chapters: &[usize],
    absolute_time: &[f64],
    splits: &[usize],
) -> Vec<A> {
    let sample_at = |chapter_idx: usize| -> usize {
        let frame = chapters[chapter_idx];
        let t = absolute_time.get(frame).copied().unwrap_or(0.0);
        let s = (t * audio.sample_rate() as f64).round() as usize;
        s.min(audio.num_samples())
    };
    piece_boundaries(splits, chapters.len())
        .into_iter()
        .map(|(f, t)| audio.slice(sample_at(f)..sample_at(t)))
        .collect()
}

//! Title extraction: from parsed navigation data to a playable,
//! splittable timeline.
//!
//! [`get_title`] is the main entry point. It resolves a title's cells
//! through the angle blocks, cuts the indexed video down to those
//! cells, reconciles telecine flags into a timeline, and derives
//! chapter boundaries.

use crate::av::{AudioStream, VideoStream, VtsIndexer};
use crate::codec::ac3::{split_es, SplitAudio};
use crate::config::Tolerances;
use crate::error::{DvdError, Result};
use crate::format::ps::{dump_cache_path, PsDemuxer};
use crate::format::SectorSource;
use crate::ifo::{DiscStructure, VtsIfo};
use log::warn;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

mod chapters;
mod resolver;
mod rff;
mod split;

pub use chapters::{check_against_oracle, derive_chapters, ChapterSet};
pub use resolver::{resolve_title, AudioTrack, ResolvedTitle};
pub use rff::{
    absolute_times_constant, absolute_times_from_durations, averaged_fps, cut_flags_on_ranges,
    cut_video_on_ranges, expand_rff_tags, expand_rff_video, frame_ranges_for_cells, nominal_fps,
    rff_timecodes, vobid_runs, CellRun, RffMode,
};
pub use split::{piece_boundaries, sanitize_splits, split_audio, split_chapters, split_video};

/// A fully resolved title: video timeline, chapter boundaries, timing
/// table, and the navigation context needed for raw audio extraction.
#[derive(Debug, Clone)]
pub struct Title<V: VideoStream> {
    /// The title's video timeline.
    pub video: V,
    /// Chapter boundary frame indices; first is 0, last is the final
    /// frame.
    pub chapters: Vec<usize>,
    /// Raw cell-change frame indices, for hosts that want cell
    /// granularity.
    pub cell_changes: Vec<usize>,
    /// Start time of every frame in seconds.
    pub absolute_time: Vec<f64>,
    /// Per-track audio descriptors.
    pub audios: Vec<AudioTrack>,
    /// Original last boundary when it had to be moved to the final
    /// frame.
    pub patched_end_chapter: Option<usize>,
    /// Title number, 1-based.
    pub title_nr: usize,
    /// Owning title set, 1-based.
    pub vts_nr: usize,
    /// Taken (vob_id, cell_id) pairs in playback order.
    pub cells: Vec<(u16, u8)>,
}

/// One piece of a split title.
#[derive(Debug, Clone)]
pub struct SplitTitle<V: VideoStream> {
    /// Video slice of the piece.
    pub video: V,
    /// Chapter indices rebased to the piece's first frame.
    pub chapters: Vec<usize>,
}

/// Resolves and assembles one title.
///
/// `indexer` supplies the encoded-frame index of a whole title set;
/// `mode` picks how telecine flags become a timeline; `oracle`, when
/// given, is an independently computed chapter-time list to
/// cross-check against (mismatches are logged, never fatal).
pub fn get_title<V, I>(
    disc: &DiscStructure,
    indexer: &mut I,
    title_nr: usize,
    angle_nr: Option<usize>,
    mode: RffMode,
    tolerances: &Tolerances,
    oracle: Option<&[f64]>,
) -> Result<Title<V>>
where
    V: VideoStream,
    I: VtsIndexer<V>,
{
    let resolved = resolve_title(disc, title_nr, angle_nr)?;

    let index = indexer.index(resolved.vts_nr)?;
    if index.flags.len() != index.video.len() {
        return Err(DvdError::StructuralParse(format!(
            "index has {} flags for {} frames",
            index.flags.len(),
            index.video.len()
        )));
    }
    if index.flags.iter().all(|f| f.vob_cell() == (0, 0)) {
        return Err(DvdError::StructuralParse(
            "index carries only zero vob/cell ids; the title set was indexed \
             without cell information"
                .to_string(),
        ));
    }

    let runs = vobid_runs(&index.flags);
    let ranges = frame_ranges_for_cells(&runs, &resolved.cells)?;
    let video = cut_video_on_ranges(&index.video, &ranges);
    let flags = cut_flags_on_ranges(&index.flags, &ranges);

    let nominal = nominal_fps(video.fps())?;

    let (video, tags, absolute_time) = match mode {
        RffMode::Exact => {
            let tags = expand_rff_tags(&flags);
            let video = expand_rff_video(&video, &flags, nominal);
            let absolute = absolute_times_constant(nominal, video.len());
            (video, tags, absolute)
        }
        RffMode::PerFrameDurations => {
            let tags: Vec<(u16, u8)> = flags.iter().map(|f| f.vob_cell()).collect();
            let timecodes = rff_timecodes(nominal, &flags);
            let absolute = absolute_times_from_durations(&timecodes);
            let video = video.with_timecodes(&timecodes, &absolute);
            (video, tags, absolute)
        }
        RffMode::AveragedRate => {
            let tags: Vec<(u16, u8)> = flags.iter().map(|f| f.vob_cell()).collect();
            let avg = averaged_fps(nominal, &flags)?;
            let video = video.with_fps(avg);
            let absolute = absolute_times_constant(avg, video.len());
            (video, tags, absolute)
        }
    };

    let set = derive_chapters(&tags, &resolved.is_chapter)?;

    // The oracle reports authored boundaries, so compare against the
    // pre-patch values. Per-frame-duration timelines drift from the
    // constant-rate times the oracle assumes and are skipped.
    if let Some(oracle) = oracle {
        if mode != RffMode::PerFrameDurations {
            let mut authored: Vec<usize> = set.chapters[1..].to_vec();
            if let (Some(p), Some(last)) = (set.patched_end_chapter, authored.last_mut()) {
                *last = p;
            }
            check_against_oracle(
                &authored,
                &absolute_time,
                oracle,
                nominal,
                tolerances.chapter_check_frames,
            );
        }
    }

    Ok(Title {
        video,
        chapters: set.chapters,
        cell_changes: set.cell_changes,
        absolute_time,
        audios: resolved.audios,
        patched_end_chapter: set.patched_end_chapter,
        title_nr,
        vts_nr: resolved.vts_nr,
        cells: resolved.cells,
    })
}

impl<V: VideoStream> Title<V> {
    /// Splits the title at the given chapter points. Split value `k`
    /// cuts after chapter `k - 1`; output count is `splits.len() + 1`.
    pub fn split(&self, splits: &[usize]) -> Result<Vec<SplitTitle<V>>> {
        sanitize_splits(splits, self.chapters.len())?;
        let videos = split_video(&self.video, &self.chapters, splits);
        let chapters = split_chapters(&self.chapters, splits);
        Ok(videos
            .into_iter()
            .zip(chapters)
            .map(|(video, chapters)| SplitTitle { video, chapters })
            .collect())
    }

    /// Extracts the inclusive 1-based chapter range `from..=to` as one
    /// piece. `to = -1` selects the last chapter.
    pub fn split_range(&self, from: usize, to: isize) -> Result<SplitTitle<V>> {
        let last = self.chapters.len() - 1;
        let to = if to == -1 { last } else { to as usize };

        if from == 1 && to == last {
            return Ok(self.split(&[])?.remove(0));
        }
        if from == 1 {
            return Ok(self.split(&[to + 1])?.remove(0));
        }
        if to == last {
            return Ok(self.split(&[from])?.remove(1));
        }
        Ok(self.split(&[from, to + 1])?.remove(1))
    }

    /// Splits a host-decoded audio handle in lockstep with
    /// [`Title::split`], converting chapter frames to samples through
    /// the absolute-time table.
    pub fn split_audio_stream<A: AudioStream>(
        &self,
        audio: &A,
        splits: &[usize],
        tolerances: &Tolerances,
    ) -> Result<Vec<A>> {
        sanitize_splits(splits, self.chapters.len())?;
        self.check_audio_alignment(audio, tolerances);
        Ok(split_audio(audio, &self.chapters, &self.absolute_time, splits))
    }

    /// Compares the audio handle's duration with the video timeline
    /// and warns when they diverge noticeably.
    pub fn check_audio_alignment<A: AudioStream>(&self, audio: &A, tolerances: &Tolerances) -> f64 {
        let video_len = self.absolute_time.last().copied().unwrap_or(0.0);
        let audio_len = audio.num_samples() as f64 / audio.sample_rate() as f64;
        let delta = (video_len - audio_len).abs();
        if delta > tolerances.av_length_delta {
            warn!(
                "audio/video length delta of {:.3}s on title {}",
                delta, self.title_nr
            );
        }
        delta
    }

    /// Dumps the byte-exact AC3 elementary stream of `track` into
    /// `out`. Returns the diagnostic audio offset in seconds.
    pub fn dump_ac3<S: SectorSource>(
        &self,
        vts: &VtsIfo,
        source: &mut S,
        track: usize,
        tolerances: &Tolerances,
        out: &mut dyn std::io::Write,
    ) -> Result<f64> {
        match self.audios.get(track) {
            Some(a) if a.is_ac3() => {}
            Some(a) => {
                return Err(DvdError::Configuration(format!(
                    "audio track {} is {}, not ac3",
                    track, a
                )))
            }
            None => {
                return Err(DvdError::Configuration(format!(
                    "audio track {} out of range",
                    track
                )))
            }
        }
        let mut demuxer = PsDemuxer::new(source, tolerances.clone());
        demuxer.dump_ac3(self.vts_nr, vts, &self.cells, track, out)
    }

    /// Splits the raw AC3 stream of `track` at the given chapter
    /// points, producing one byte-exact file per piece.
    ///
    /// The whole-title dump is cached under `cache_dir`, keyed by
    /// `disc_id`, the cell list, the title set and the track, so
    /// repeated splits demux only once. `dest_paths` must hold
    /// `splits.len() + 1` paths.
    #[allow(clippy::too_many_arguments)]
    pub fn split_ac3<S: SectorSource>(
        &self,
        vts: &VtsIfo,
        source: &mut S,
        track: usize,
        splits: &[usize],
        disc_id: &str,
        cache_dir: &Path,
        dest_paths: &[&Path],
        tolerances: &Tolerances,
    ) -> Result<Vec<SplitAudio>> {
        sanitize_splits(splits, self.chapters.len())?;
        if dest_paths.len() != splits.len() + 1 {
            return Err(DvdError::Configuration(format!(
                "{} splits need {} destination paths, got {}",
                splits.len(),
                splits.len() + 1,
                dest_paths.len()
            )));
        }

        let cache = dump_cache_path(cache_dir, disc_id, &self.cells, self.vts_nr, track);
        if !cache.exists() {
            // Dump under a scratch name and move into place only once
            // complete, so a demux that fails partway can never be
            // mistaken for a cached whole-title stream.
            let scratch = cache.with_extension("part");
            let dumped = (|| -> Result<()> {
                let mut out = BufWriter::new(File::create(&scratch)?);
                self.dump_ac3(vts, source, track, tolerances, &mut out)?;
                out.flush()?;
                Ok(())
            })();
            match dumped {
                Ok(()) => std::fs::rename(&scratch, &cache)?,
                Err(e) => {
                    let _ = std::fs::remove_file(&scratch);
                    return Err(e);
                }
            }
        }

        let split_times: Vec<f64> = splits
            .iter()
            .map(|&s| self.absolute_time[self.chapters[s - 1]])
            .collect();
        let start_time = self.absolute_time[self.chapters[0]];

        split_es(File::open(&cache)?, &split_times, start_time, dest_paths)
    }
}

fn format_time(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{}:{:02}:{:02}.{:03}", h, m, s, ms)
}

impl<V: VideoStream> fmt::Display for Title<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chapters:")?;
        let mut bounds = self.chapters.clone();
        bounds.push(self.video.len().saturating_sub(1));
        for (i, &c) in self.chapters.iter().enumerate() {
            let start = self.absolute_time.get(c).copied().unwrap_or(0.0);
            let end = self
                .absolute_time
                .get(bounds[i + 1])
                .copied()
                .unwrap_or(start);
            write!(
                f,
                "{:02} {:>13} {:>13} {}",
                i + 1,
                format_time(start),
                format_time(end - start),
                c
            )?;
            if i == 0 {
                write!(f, " (faked)")?;
            }
            if let Some(p) = self.patched_end_chapter {
                if i == self.chapters.len() - 1 {
                    write!(f, " (originally {} delta {})", p, c - p)?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "cellchange: {:?}", self.cell_changes)?;
        writeln!(f)?;
        writeln!(f, "Audios:")?;
        for (i, a) in self.audios.iter().enumerate() {
            writeln!(f, "{} {}", i, a)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{Fps, MemoryVideo};
    use pretty_assertions::assert_eq;

    fn title(chapters: Vec<usize>, frames: usize) -> Title<MemoryVideo> {
        let fps = Fps::PAL;
        Title {
            video: MemoryVideo::new(frames, fps),
            absolute_time: absolute_times_constant(fps, frames),
            cell_changes: chapters[1..].to_vec(),
            chapters,
            audios: vec![],
            patched_end_chapter: None,
            title_nr: 1,
            vts_nr: 1,
            cells: vec![(1, 1)],
        }
    }

    #[test]
    fn test_split_counts_and_round_trip() {
        let t = title(vec![0, 100, 200, 299], 300);
        let pieces = t.split(&[2]).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].chapters, vec![0, 100]);
        assert_eq!(pieces[1].chapters, vec![0, 100, 199]);

        let rejoined = pieces[0].video.concat(&pieces[1].video);
        assert_eq!(rejoined.ids(), t.video.slice(0..299).ids());
    }

    #[test]
    fn test_split_range_cases() {
        let t = title(vec![0, 100, 200, 299], 300);

        let whole = t.split_range(1, -1).unwrap();
        assert_eq!(whole.video.len(), 299);

        let head = t.split_range(1, 1).unwrap();
        assert_eq!(head.video.ids(), (0..100).collect::<Vec<_>>());

        let tail = t.split_range(3, -1).unwrap();
        assert_eq!(tail.video.ids(), (200..299).collect::<Vec<_>>());

        let mid = t.split_range(2, 2).unwrap();
        assert_eq!(mid.video.ids(), (100..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_bad_lists() {
        let t = title(vec![0, 100, 200, 299], 300);
        assert!(matches!(
            t.split(&[3, 2]).unwrap_err(),
            DvdError::Configuration(_)
        ));
        assert!(matches!(
            t.split(&[9]).unwrap_err(),
            DvdError::Configuration(_)
        ));
    }

    #[test]
    fn test_display_marks_patched_end() {
        let mut t = title(vec![0, 100, 299], 300);
        t.patched_end_chapter = Some(250);
        let s = format!("{}", t);
        assert!(s.contains("(faked)"));
        assert!(s.contains("(originally 250 delta 49)"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00:00.000");
        assert_eq!(format_time(3661.25), "1:01:01.250");
    }
}

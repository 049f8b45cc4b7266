use super::parser::{parse_sync_info, SAMPLES_PER_FRAME};
use crate::error::{DvdError, Result};
use log::warn;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const READ_CHUNK: usize = 8192;

/// One split output file plus the alignment data a downstream muxer
/// needs to line it back up with the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAudio {
    /// Path the piece was written to.
    pub path: PathBuf,
    /// Offset of the piece's first sample relative to its video piece,
    /// in samples. Fractional for the first piece, whole otherwise.
    pub sample_offset: f64,
    /// Sample rate of the stream.
    pub sample_rate: u32,
}

impl SplitAudio {
    /// The sample offset expressed in seconds.
    pub fn time_offset(&self) -> f64 {
        self.sample_offset / self.sample_rate as f64
    }
}

/// Re-frames a dumped AC3 elementary stream into one file per split
/// piece.
///
/// `split_times` are the absolute start times of pieces 1..n (piece 0
/// starts at `start_time`); `dest_paths` must hold one path per piece.
/// The frame straddling each boundary is written to both the outgoing
/// and the incoming file so every file starts on a decodable frame,
/// and the duplication is accounted for in the recorded sample offset.
pub fn split_es<R: Read>(
    mut input: R,
    split_times: &[f64],
    start_time: f64,
    dest_paths: &[&Path],
) -> Result<Vec<SplitAudio>> {
    if dest_paths.len() != split_times.len() + 1 {
        return Err(DvdError::Configuration(format!(
            "{} split points need {} destination paths, got {}",
            split_times.len(),
            split_times.len() + 1,
            dest_paths.len()
        )));
    }

    let mut buffer: Vec<u8> = Vec::with_capacity(READ_CHUNK * 2);
    let mut chunk = [0u8; READ_CHUNK];

    let mut sample_rate: Option<u32> = None;
    let mut split_samples: Vec<f64> = Vec::new();
    let mut sample_offsets: Vec<f64> = Vec::new();

    let mut current_split = 0usize;
    let mut current_frame = 0usize;
    let mut last_frame = Vec::new();
    let mut current_file: Option<BufWriter<File>> = None;

    loop {
        let n = input.read(&mut chunk)?;
        buffer.extend_from_slice(&chunk[..n]);

        loop {
            if buffer.len() < 5 {
                break;
            }
            let info = parse_sync_info(&buffer)?;

            match sample_rate {
                None => {
                    sample_rate = Some(info.sample_rate);
                    split_samples = split_times
                        .iter()
                        .map(|t| t * info.sample_rate as f64)
                        .collect();
                    sample_offsets.push(start_time * info.sample_rate as f64);
                    current_file = Some(BufWriter::new(File::create(dest_paths[0])?));
                }
                Some(sr) if sr != info.sample_rate => {
                    return Err(DvdError::StructuralParse(format!(
                        "ac3 sample rate changed mid-stream: {} then {}",
                        sr, info.sample_rate
                    )));
                }
                Some(_) => {}
            }

            if buffer.len() < info.frame_size {
                break;
            }

            let frame: Vec<u8> = buffer.drain(..info.frame_size).collect();
            let sample_end = (current_frame + 1) * SAMPLES_PER_FRAME;

            let out = current_file.as_mut().unwrap();
            out.write_all(&frame)?;

            if current_split < split_samples.len()
                && sample_end as f64 >= split_samples[current_split]
            {
                current_split += 1;
                let mut next = BufWriter::new(File::create(dest_paths[current_split])?);
                next.write_all(&last_frame)?;
                next.write_all(&frame)?;
                sample_offsets.push(
                    (SAMPLES_PER_FRAME as f64 + sample_end as f64
                        - split_samples[current_split - 1])
                        .round(),
                );
                let mut done = std::mem::replace(current_file.as_mut().unwrap(), next);
                done.flush()?;
            }

            last_frame = frame;
            current_frame += 1;
        }

        if n == 0 {
            break;
        }
    }

    if !buffer.is_empty() {
        warn!("dropping {} trailing bytes of incomplete ac3 frame", buffer.len());
    }

    let sr = sample_rate.ok_or_else(|| {
        DvdError::StructuralParse("no ac3 frames found in elementary stream".to_string())
    })?;

    if let Some(mut f) = current_file {
        f.flush()?;
    }

    if sample_offsets.len() != dest_paths.len() {
        return Err(DvdError::StructuralParse(format!(
            "stream ended inside piece {} of {}: split times past the audio end",
            sample_offsets.len(),
            dest_paths.len()
        )));
    }

    Ok(sample_offsets
        .into_iter()
        .zip(dest_paths.iter())
        .map(|(sample_offset, path)| SplitAudio {
            path: path.to_path_buf(),
            sample_offset,
            sample_rate: sr,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    // frmsizecod 18 at 48 kHz: 640-byte frames, 160 kbit/s.
    fn frame(tag: u8) -> Vec<u8> {
        let mut f = vec![0u8; 640];
        f[0] = 0x0B;
        f[1] = 0x77;
        f[4] = 18;
        f[5] = tag;
        f
    }

    fn stream(n: usize) -> Vec<u8> {
        (0..n).flat_map(|i| frame(i as u8)).collect()
    }

    #[test]
    fn test_no_splits_single_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("0.ac3");
        let es = stream(4);
        let pieces = split_es(&es[..], &[], 0.0, &[out.as_path()]).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].sample_offset, 0.0);
        assert_eq!(pieces[0].sample_rate, 48_000);
        assert_eq!(std::fs::read(&out).unwrap(), es);
    }

    #[test]
    fn test_straddling_frame_written_to_both_files() {
        let dir = tempdir().unwrap();
        let p0 = dir.path().join("0.ac3");
        let p1 = dir.path().join("1.ac3");
        // Split at exactly 2 frames worth of time: 3072 samples at
        // 48 kHz is 0.064 s. Frame 1 (sample_end 3072) straddles.
        let es = stream(4);
        let pieces = split_es(&es[..], &[0.064], 0.0, &[p0.as_path(), p1.as_path()]).unwrap();
        assert_eq!(pieces.len(), 2);

        let a = std::fs::read(&p0).unwrap();
        let b = std::fs::read(&p1).unwrap();
        // Piece 0 holds frames 0..=1; piece 1 re-starts with frames
        // 0 and 1 duplicated, then 2 and 3.
        assert_eq!(a.len(), 2 * 640);
        assert_eq!(b.len(), 4 * 640);
        assert_eq!(&b[..1280], &a[..]);

        // Concatenating and dropping the duplicated leading frames
        // reproduces the original stream.
        let mut joined = a.clone();
        joined.extend_from_slice(&b[1280..]);
        assert_eq!(joined, es);

        // Boundary landed exactly on the frame edge, so the incoming
        // file leads by its two duplicated frames minus nothing:
        // 1536 + 3072 - 3072 = 1536 samples.
        assert_eq!(pieces[1].sample_offset, 1536.0);
    }

    #[test]
    fn test_sample_rate_change_is_fatal() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("0.ac3");
        let mut es = stream(1);
        let mut other = frame(9);
        other[4] = (2 << 6) | 0; // 32 kHz
        es.extend(&other);
        assert!(matches!(
            split_es(&es[..], &[], 0.0, &[out.as_path()]).unwrap_err(),
            DvdError::StructuralParse(_)
        ));
    }

    #[test]
    fn test_destination_count_checked() {
        let es = stream(2);
        assert!(matches!(
            split_es(&es[..], &[1.0], 0.0, &[]).unwrap_err(),
            DvdError::Configuration(_)
        ));
    }

    #[test]
    fn test_empty_stream_is_fatal() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("0.ac3");
        assert!(split_es(&[][..], &[], 0.0, &[out.as_path()]).is_err());
    }
}

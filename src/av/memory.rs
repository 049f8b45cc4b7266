use super::{AudioStream, Fps, VideoStream};
use std::ops::Range;

/// An index-range view over materialized frame metadata.
///
/// Every frame remembers the source-frame id it was sliced from, so
/// tests can verify round-trip properties exactly. Hosts without a
/// live pipeline can also use it as a lightweight adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryVideo {
    frames: Vec<usize>,
    fps: Fps,
    durations: Option<Vec<Fps>>,
    absolute: Option<Vec<f64>>,
}

impl MemoryVideo {
    /// Creates a view of `len` frames with ids `0..len`.
    pub fn new(len: usize, fps: Fps) -> Self {
        Self {
            frames: (0..len).collect(),
            fps,
            durations: None,
            absolute: None,
        }
    }

    /// Creates a view from explicit source-frame ids.
    pub fn from_ids(frames: Vec<usize>, fps: Fps) -> Self {
        Self {
            frames,
            fps,
            durations: None,
            absolute: None,
        }
    }

    /// The source-frame ids backing this view.
    pub fn ids(&self) -> &[usize] {
        &self.frames
    }

    /// Injected per-frame durations, if any.
    pub fn durations(&self) -> Option<&[Fps]> {
        self.durations.as_deref()
    }

    /// Injected absolute timestamps, if any.
    pub fn absolute_times(&self) -> Option<&[f64]> {
        self.absolute.as_deref()
    }
}

impl VideoStream for MemoryVideo {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn fps(&self) -> Fps {
        self.fps
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            frames: self.frames[range].to_vec(),
            fps: self.fps,
            durations: None,
            absolute: None,
        }
    }

    fn concat(&self, other: &Self) -> Self {
        let mut frames = self.frames.clone();
        frames.extend_from_slice(&other.frames);
        Self {
            frames,
            fps: self.fps,
            durations: None,
            absolute: None,
        }
    }

    fn with_fps(&self, fps: Fps) -> Self {
        Self {
            fps,
            ..self.clone()
        }
    }

    fn with_timecodes(&self, durations: &[Fps], absolute: &[f64]) -> Self {
        Self {
            frames: self.frames.clone(),
            fps: self.fps,
            durations: Some(durations.to_vec()),
            absolute: Some(absolute.to_vec()),
        }
    }
}

/// An index-range view over materialized sample metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAudio {
    samples: Range<usize>,
    sample_rate: u32,
}

impl MemoryAudio {
    /// Creates a view of `num_samples` samples at `sample_rate` Hz.
    pub fn new(num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: 0..num_samples,
            sample_rate,
        }
    }

    /// The absolute sample range this view covers.
    pub fn range(&self) -> Range<usize> {
        self.samples.clone()
    }
}

impl AudioStream for MemoryAudio {
    fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            samples: self.samples.start + range.start..self.samples.start + range.end,
            sample_rate: self.sample_rate,
        }
    }
}

use crate::error::Result;
use std::ops::Range;

/// A frame rate (or any exact rational rate) as a reduced fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fps {
    /// Numerator.
    pub num: u64,
    /// Denominator.
    pub den: u64,
}

impl Fps {
    /// PAL nominal rate, 25 fps.
    pub const PAL: Fps = Fps { num: 25, den: 1 };
    /// NTSC film-carrier nominal rate, 30000/1001 fps.
    pub const NTSC_FILM: Fps = Fps {
        num: 30000,
        den: 1001,
    };

    /// Creates a rate and reduces it to lowest terms.
    pub fn new(num: u64, den: u64) -> Self {
        Fps { num, den }.reduced()
    }

    /// Returns the rate reduced to lowest terms.
    pub fn reduced(self) -> Self {
        fn gcd(a: u64, b: u64) -> u64 {
            if b == 0 {
                a
            } else {
                gcd(b, a % b)
            }
        }
        let g = gcd(self.num.max(1), self.den.max(1));
        Fps {
            num: self.num / g,
            den: self.den / g,
        }
    }

    /// The rate as a floating point value.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        self.den as f64 / self.num as f64
    }

    /// The reciprocal fraction (seconds per frame).
    pub fn invert(self) -> Self {
        Fps {
            num: self.den,
            den: self.num,
        }
    }
}

/// A video stream handle supplied by a host media pipeline.
///
/// The core never decodes pixels; it only slices, concatenates and
/// re-tags handles. Implementations are expected to be cheap views
/// (lazy slicing), not frame copies.
pub trait VideoStream: Clone {
    /// Number of frames in the stream.
    fn len(&self) -> usize;

    /// Returns true when the stream holds no frames.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stream's reported frame rate.
    fn fps(&self) -> Fps;

    /// Returns the half-open frame range `range` as a new handle.
    fn slice(&self, range: Range<usize>) -> Self;

    /// Returns the concatenation `self + other`.
    fn concat(&self, other: &Self) -> Self;

    /// Returns the stream re-tagged with a constant frame rate.
    fn with_fps(&self, fps: Fps) -> Self;

    /// Injects per-frame durations and absolute timestamps.
    ///
    /// Both slices are frame-aligned with the stream. Used when
    /// per-frame timing fidelity is requested instead of a constant
    /// rate.
    fn with_timecodes(&self, durations: &[Fps], absolute: &[f64]) -> Self;
}

/// An audio stream handle supplied by a host media pipeline.
pub trait AudioStream: Clone {
    /// Total number of samples.
    fn num_samples(&self) -> usize;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Returns the half-open sample range `range` as a new handle.
    fn slice(&self, range: Range<usize>) -> Self;
}

/// Per-encoded-frame flags produced by the indexing collaborator.
///
/// One packed byte per frame plus the owning (vob_id, cell_id) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFlag {
    /// Repeat-first-field bit: the frame expands to 3 real-time frames
    /// instead of 2.
    pub rff: bool,
    /// Top-field-first bit.
    pub tff: bool,
    /// Progressive frame bit.
    pub progressive: bool,
    /// Progressive sequence bit.
    pub progressive_sequence: bool,
    /// Owning VOB id.
    pub vob: u16,
    /// Owning cell id.
    pub cell: u8,
}

impl FrameFlag {
    /// Decodes the packed flag byte: bit0 = RFF, bit1 = TFF,
    /// bit6 = progressive, bit7 = progressive sequence.
    pub fn from_byte(flags: u8, vob: u16, cell: u8) -> Self {
        Self {
            rff: flags & 0x01 != 0,
            tff: flags & 0x02 != 0,
            progressive: flags & 0x40 != 0,
            progressive_sequence: flags & 0x80 != 0,
            vob,
            cell,
        }
    }

    /// The owning (vob_id, cell_id) pair.
    pub fn vob_cell(&self) -> (u16, u8) {
        (self.vob, self.cell)
    }
}

/// One video-title-set worth of indexed frames: an encoded-frame video
/// handle aligned 1:1 with its flag array.
#[derive(Debug, Clone)]
pub struct VtsIndex<V: VideoStream> {
    /// Encoded-frame video handle for the whole VTS.
    pub video: V,
    /// Per-encoded-frame flags, same length as `video`.
    pub flags: Vec<FrameFlag>,
}

/// The indexing collaborator seam: given a VTS number, produce the
/// frame index for that title set.
pub trait VtsIndexer<V: VideoStream> {
    /// Index video title set `vts` (1-based, as stored in the title
    /// table).
    fn index(&mut self, vts: usize) -> Result<VtsIndex<V>>;
}

impl<V: VideoStream, F> VtsIndexer<V> for F
where
    F: FnMut(usize) -> Result<VtsIndex<V>>,
{
    fn index(&mut self, vts: usize) -> Result<VtsIndex<V>> {
        self(vts)
    }
}

mod memory;
pub use memory::{MemoryAudio, MemoryVideo};

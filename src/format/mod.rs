//! Container format handling.

use crate::error::Result;
use bytes::Bytes;

pub mod ps;

/// DVD data domain a sector read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Menu VOB data.
    Menu,
    /// Title VOB data.
    Title,
}

/// Raw sector access seam: returns exactly the requested 2048-byte
/// sectors of one title set, concatenated in request order.
///
/// Implementations range from direct VOB file reads to a native disc
/// reader; the demuxer does not care which.
pub trait SectorSource {
    /// Reads `sectors` (title-set-relative sector numbers) from the
    /// given domain of title set `vts` (1-based).
    fn read_sectors(&mut self, vts: usize, domain: Domain, sectors: &[u32]) -> Result<Bytes>;
}

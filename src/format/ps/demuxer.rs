use super::pes::{parse_pci_times, parse_pes_header, Packet, PacketCursor};
use super::types::*;
use crate::config::Tolerances;
use crate::error::{DvdError, Result};
use crate::format::{Domain, SectorSource};
use crate::ifo::VtsIfo;
use log::{debug, info};
use md5::{Digest, Md5};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extracts elementary streams from the program stream of one title's
/// cell sectors.
pub struct PsDemuxer<'a, S: SectorSource> {
    source: &'a mut S,
    tolerances: Tolerances,
}

impl<'a, S: SectorSource> PsDemuxer<'a, S> {
    /// Creates a demuxer over a sector source.
    pub fn new(source: &'a mut S, tolerances: Tolerances) -> Self {
        Self { source, tolerances }
    }

    /// Dumps the AC3 elementary stream of `track` for the given cell
    /// list into `out`, byte-exact.
    ///
    /// Returns the audio offset relative to the video in seconds,
    /// derived from the first audio packet's PTS against the playback
    /// unit start time. Diagnostic only; the stream is not shifted.
    pub fn dump_ac3(
        &mut self,
        vts_nr: usize,
        vts: &VtsIfo,
        cells: &[(u16, u8)],
        track: usize,
        out: &mut dyn Write,
    ) -> Result<f64> {
        let mut sectors = vts.sectors_for_cells(cells);
        if sectors.is_empty() {
            return Err(DvdError::Resource(format!(
                "no sectors mapped for cells {:?} of vts {}",
                cells, vts_nr
            )));
        }
        let last_real_sector_i = sectors.len() - 1;

        let extra = self.read_ahead(vts_nr, vts, *sectors.last().unwrap(), track)?;
        if !extra.is_empty() {
            debug!("read-ahead appends {} trailing sectors", extra.len());
        }
        sectors.extend(extra);

        let data = self.source.read_sectors(vts_nr, Domain::Title, &sectors)?;
        let mut cursor = PacketCursor::new(&data);

        // Unit times default to 0 until the first navigation packet,
        // mirroring how a missing PCI shows up as a sync failure on
        // the first video packet rather than a silent skip.
        let mut start_pts = 0u64;
        let mut end_pts = 0u64;
        let mut first_video = true;
        let mut first_audio = true;
        let mut audio_offset = 0.0f64;
        let window = self.tolerances.sync_window_pts;

        while let Some((pkt_start, pkt)) = cursor.next_packet()? {
            let ii = cursor.sector_index(pkt_start) + 1;
            match pkt {
                Packet::Pack | Packet::System => {}
                Packet::Private2(body) => match body.first() {
                    Some(&NAV_PCI) if ii <= last_real_sector_i => {
                        let times = parse_pci_times(&body[1..])?;
                        start_pts = times.start_pts;
                        end_pts = times.end_pts;
                    }
                    // PCI past the real cell range and DSI seek tables
                    // carry nothing this walk needs.
                    Some(&NAV_PCI) | Some(&NAV_DSI) => {}
                    other => {
                        return Err(DvdError::StructuralParse(format!(
                            "unknown navigation sub-stream id {:?}",
                            other.copied()
                        )))
                    }
                },
                Packet::Video(body) => {
                    let hdr = parse_pes_header(body)?;
                    if first_video {
                        if hdr.pts != Some(start_pts) {
                            return Err(DvdError::StructuralParse(format!(
                                "first video packet pts {:?} does not match unit start {}",
                                hdr.pts, start_pts
                            )));
                        }
                        first_video = false;
                    }
                }
                Packet::Private1(body) => {
                    let hdr = parse_pes_header(body)?;
                    let payload = hdr.payload;
                    let Some(&id) = payload.first() else { continue };
                    if !(SUBSTREAM_AC3_FIRST..=SUBSTREAM_AC3_LAST).contains(&id)
                        || (id - SUBSTREAM_AC3_FIRST) as usize != track
                    {
                        continue;
                    }
                    if payload.len() < 4 {
                        return Err(DvdError::StructuralParse(
                            "audio sub-stream header truncated".to_string(),
                        ));
                    }
                    let pts = hdr.pts.ok_or_else(|| {
                        DvdError::StructuralParse(
                            "audio sub-stream packet without pts".to_string(),
                        )
                    })?;
                    let first_acc_unit =
                        u16::from_be_bytes([payload[2], payload[3]]) as usize;

                    let mut write = true;
                    let mut skip = 0usize;
                    let packet_end_pts = pts + window;

                    if first_audio {
                        if packet_end_pts > start_pts {
                            audio_offset = (window as f64 - packet_end_pts as f64
                                + start_pts as f64)
                                / PTS_HZ as f64;
                            info!("audio offset: {}", audio_offset);
                            skip = first_acc_unit.saturating_sub(1);
                            first_audio = false;
                        } else {
                            // Packet ends before the unit starts; its
                            // frames belong to an earlier cell.
                            write = false;
                        }
                    }

                    if write {
                        if ii >= last_real_sector_i && pts >= end_pts {
                            // Trailing packet: only the bytes up to
                            // the first access unit belong to us.
                            let end = (4 + first_acc_unit.saturating_sub(1)).min(payload.len());
                            out.write_all(&payload[4..end])?;
                            break;
                        }
                        let from = (4 + skip).min(payload.len());
                        out.write_all(&payload[from..])?;
                    }
                }
            }
        }

        Ok(audio_offset)
    }

    /// Decides whether the last cell's final audio frame spills past
    /// its declared sectors and, if so, which playback-unit sectors to
    /// append.
    ///
    /// Scans the first playback unit behind the cell range until an
    /// audio packet of `track` starts at or after the unit start time.
    /// A first audio packet already aligned with the unit start means
    /// the cut is seamless and nothing extra is needed.
    fn read_ahead(
        &mut self,
        vts_nr: usize,
        vts: &VtsIfo,
        last_sector: u32,
        track: usize,
    ) -> Result<Vec<u32>> {
        let Some(first_behind) = vts.vobu_admap.iter().position(|&s| s > last_sector) else {
            return Ok(Vec::new());
        };
        let first = vts.vobu_admap[first_behind];
        let second = if first_behind + 1 < vts.vobu_admap.len() {
            vts.vobu_admap[first_behind + 1]
        } else {
            vts.last_sector()
        };
        let vobu_sectors: Vec<u32> = (first..=second).collect();

        let data = self
            .source
            .read_sectors(vts_nr, Domain::Title, &vobu_sectors)?;
        let mut cursor = PacketCursor::new(&data);

        let mut start_pts: Option<u64> = None;
        let mut needs_extra = false;
        let mut first_audio = true;
        let mut end_sector = None;

        while let Some((pkt_start, pkt)) = cursor.next_packet()? {
            match pkt {
                Packet::Pack | Packet::System | Packet::Video(_) => {}
                Packet::Private2(body) => match body.first() {
                    Some(&NAV_PCI) => {
                        start_pts = Some(parse_pci_times(&body[1..])?.start_pts);
                    }
                    Some(&NAV_DSI) => {}
                    other => {
                        return Err(DvdError::StructuralParse(format!(
                            "unknown navigation sub-stream id {:?}",
                            other.copied()
                        )))
                    }
                },
                Packet::Private1(body) => {
                    let hdr = parse_pes_header(body)?;
                    let Some(&id) = hdr.payload.first() else { continue };
                    if !(SUBSTREAM_AC3_FIRST..=SUBSTREAM_AC3_LAST).contains(&id)
                        || (id - SUBSTREAM_AC3_FIRST) as usize != track
                    {
                        continue;
                    }
                    let pts = hdr.pts.ok_or_else(|| {
                        DvdError::StructuralParse(
                            "audio sub-stream packet without pts".to_string(),
                        )
                    })?;
                    let unit_start = start_pts.ok_or_else(|| {
                        DvdError::StructuralParse(
                            "audio packet before any navigation packet".to_string(),
                        )
                    })?;
                    if first_audio {
                        needs_extra = unit_start != pts;
                        first_audio = false;
                    }
                    if unit_start <= pts {
                        end_sector = Some(cursor.sector_index(pkt_start) + 1);
                        break;
                    }
                }
            }
        }

        match (needs_extra, end_sector) {
            (true, Some(n)) => Ok(vobu_sectors[..n].to_vec()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Content-addressed cache path for a whole-title AC3 dump, so that
/// repeated splits of the same title reuse one demux pass.
pub fn dump_cache_path(
    cache_dir: &Path,
    disc: &str,
    cells: &[(u16, u8)],
    vts: usize,
    track: usize,
) -> PathBuf {
    let mut hasher = Md5::new();
    hasher.update(disc.as_bytes());
    for &(vob, cell) in cells {
        hasher.update(vob.to_be_bytes());
        hasher.update([cell]);
    }
    hasher.update((vts as u64).to_be_bytes());
    hasher.update((track as u64).to_be_bytes());
    cache_dir.join(format!("{:x}.ac3", hasher.finalize()))
}

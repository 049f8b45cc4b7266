use crate::av::Fps;

/// Block mode of a cell within an angle block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Cell is not part of an angle block; always played.
    NotInBlock,
    /// First cell of an angle block (angle 1).
    FirstCell,
    /// Interior cell of an angle block.
    InBlock,
    /// Last cell of an angle block.
    LastCell,
}

impl BlockMode {
    /// Decodes the two block-mode bits of the cell playback flags.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => BlockMode::NotInBlock,
            1 => BlockMode::FirstCell,
            2 => BlockMode::InBlock,
            _ => BlockMode::LastCell,
        }
    }
}

/// BCD-free representation of a cell's declared playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTime {
    /// Hours component.
    pub hour: u8,
    /// Minutes component.
    pub minute: u8,
    /// Seconds component.
    pub second: u8,
    /// Frame count within the last second.
    pub frames: u8,
    /// Frame rate encoded in the time field (PAL or NTSC).
    pub fps: Fps,
}

/// One entry of a PGC's cell position table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    /// Owning VOB id.
    pub vob_id: u16,
    /// Cell id within the VOB.
    pub cell_id: u8,
}

impl CellPosition {
    /// The (vob_id, cell_id) pair.
    pub fn vob_cell(&self) -> (u16, u8) {
        (self.vob_id, self.cell_id)
    }
}

/// One entry of a PGC's cell playback table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPlayback {
    /// Angle block mode.
    pub block_mode: BlockMode,
    /// Angle block type.
    pub block_type: u8,
    /// Seamless playback flag.
    pub seamless_play: bool,
    /// Interleaved cell flag.
    pub interleaved: bool,
    /// Seamless angle change flag.
    pub seamless_angle: bool,
    /// Declared playback time of the cell.
    pub playback_time: PlaybackTime,
    /// First sector of the cell.
    pub first_sector: u32,
    /// End sector of the first interleaved unit.
    pub first_ilvu_end_sector: u32,
    /// Start sector of the last VOBU.
    pub last_vobu_start_sector: u32,
    /// Last sector of the cell.
    pub last_sector: u32,
}

/// Per-track audio availability entry of a PGC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioControl {
    /// Whether the track is present in this PGC.
    pub available: bool,
    /// Sub-stream number of the track.
    pub number: u8,
}

/// An ordered playback sequence of cells plus navigation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramChain {
    /// 1-based cell indices marking program (chapter) starts.
    pub program_map: Vec<u8>,
    /// Cell position table; same length as `cell_playback`.
    pub cell_position: Vec<CellPosition>,
    /// Cell playback table; same length as `cell_position`.
    pub cell_playback: Vec<CellPlayback>,
    /// Eight audio track availability entries.
    pub audio_control: Vec<AudioControl>,
    /// Next PGC number.
    pub next_pgc_nr: u16,
    /// Previous PGC number.
    pub prev_pgc_nr: u16,
    /// Group ("go up") PGC number.
    pub group_pgc_nr: u16,
    /// Still-time navigation field (volatile between readers).
    pub still_time: u8,
    /// Playback-mode navigation field (volatile between readers).
    pub playback_mode: u8,
}

/// One row of the VTS cell address table: an inclusive sector range
/// owned by a (vob_id, cell_id) pair. A pair may own several rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    /// Owning VOB id.
    pub vob_id: u16,
    /// Cell id within the VOB.
    pub cell_id: u8,
    /// First sector of the range.
    pub start_sector: u32,
    /// Last sector of the range, inclusive.
    pub last_sector: u32,
}

/// Audio coding of a VTS audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// Dolby AC3.
    Ac3,
    /// Linear PCM.
    Lpcm,
    /// Any other coding (MPEG audio, DTS, ...), carried as the raw
    /// format code.
    Other(u8),
}

/// Format and language of one VTS audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAttr {
    /// Audio coding.
    pub codec: AudioCodec,
    /// ISO-639 language code, `"xx"` when the disc declares none.
    pub language: String,
}

/// Video attributes of a title set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoAttr {
    /// MPEG version code (0 = MPEG-1, 1 = MPEG-2).
    pub mpeg_version: u8,
    /// Video format code (0 = NTSC, 1 = PAL).
    pub video_format: u8,
    /// Picture size code.
    pub picture_size: u8,
}

/// One chapter pointer: (pgc number, program number), both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PttEntry {
    /// Program chain number.
    pub pgcn: u16,
    /// Program number within the chain.
    pub pgn: u16,
}

/// One entry of the global title table (VMG `tt_srpt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleInfo {
    /// Number of angles authored for the title.
    pub nr_of_angles: u8,
    /// Number of chapter pointers (part-of-title entries).
    pub nr_of_ptts: u16,
    /// Owning video title set, 1-based.
    pub title_set_nr: u8,
    /// Title number within the owning VTS, 1-based.
    pub vts_ttn: u8,
    /// Start sector of the owning VTS.
    pub title_set_sector: u32,
}

/// Parsed navigation structures of one video title set.
#[derive(Debug, Clone, PartialEq)]
pub struct VtsIfo {
    /// Title-set video attributes.
    pub video_attr: VideoAttr,
    /// Per-track audio attributes.
    pub audio_attr: Vec<AudioAttr>,
    /// Program chain table.
    pub program_chains: Vec<ProgramChain>,
    /// Cell address table: (vob, cell) to sector range(s).
    pub cell_adt: Vec<CellAddress>,
    /// Sector offsets of the title set's playback units (VOBUs).
    pub vobu_admap: Vec<u32>,
    /// Per-title chapter pointer lists.
    pub ptt_srpt: Vec<Vec<PttEntry>>,
}

impl VtsIfo {
    /// All inclusive sector ranges owned by one (vob_id, cell_id) pair,
    /// in table order.
    pub fn sector_ranges(&self, vob_id: u16, cell_id: u8) -> Vec<(u32, u32)> {
        self.cell_adt
            .iter()
            .filter(|e| e.vob_id == vob_id && e.cell_id == cell_id)
            .map(|e| (e.start_sector, e.last_sector))
            .collect()
    }

    /// Flattens the sector ranges of an ordered cell list into one
    /// ordered sector list.
    pub fn sectors_for_cells(&self, cells: &[(u16, u8)]) -> Vec<u32> {
        let mut sectors = Vec::new();
        for &(vob, cell) in cells {
            for (start, last) in self.sector_ranges(vob, cell) {
                sectors.extend(start..=last);
            }
        }
        sectors
    }

    /// The highest sector addressed by the cell address table.
    pub fn last_sector(&self) -> u32 {
        self.cell_adt.iter().map(|e| e.last_sector).max().unwrap_or(0)
    }
}

/// The parsed navigation metadata of a whole disc.
///
/// Immutable once parsed; resolver calls borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscStructure {
    /// Global title table from the VMG.
    pub titles: Vec<TitleInfo>,
    /// Per-title-set structures, `vts[0]` being VTS 1.
    pub vts: Vec<VtsIfo>,
}

impl DiscStructure {
    /// Looks up a title set by its 1-based number.
    pub fn vts(&self, title_set_nr: usize) -> crate::Result<&VtsIfo> {
        if title_set_nr == 0 || title_set_nr > self.vts.len() {
            return Err(crate::DvdError::StructuralParse(format!(
                "title set {} out of range (disc has {})",
                title_set_nr,
                self.vts.len()
            )));
        }
        Ok(&self.vts[title_set_nr - 1])
    }
}

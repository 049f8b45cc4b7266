use crate::error::{DvdError, Result};
use crate::ifo::{AudioCodec, BlockMode, DiscStructure, ProgramChain};
use log::warn;

/// One audio track slot of a resolved title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioTrack {
    /// Track present in the PGC, with its coding and language.
    Present {
        /// Audio coding of the track.
        codec: AudioCodec,
        /// Declared language.
        language: String,
    },
    /// Track slot not used by this PGC.
    None,
}

impl AudioTrack {
    /// Whether the track carries AC3 audio.
    pub fn is_ac3(&self) -> bool {
        matches!(
            self,
            AudioTrack::Present {
                codec: AudioCodec::Ac3,
                ..
            }
        )
    }
}

impl std::fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioTrack::Present { codec, language } => {
                let name = match codec {
                    AudioCodec::Ac3 => "ac3",
                    AudioCodec::Lpcm => "lpcm",
                    AudioCodec::Other(_) => "unk",
                };
                write!(f, "{}({})", name, language)
            }
            AudioTrack::None => write!(f, "none"),
        }
    }
}

/// The ordered cells actually played for one title/angle, before any
/// frame-level work.
#[derive(Debug, Clone)]
pub struct ResolvedTitle {
    /// Title number, 1-based.
    pub title_nr: usize,
    /// Owning title set, 1-based.
    pub vts_nr: usize,
    /// PGC index within the title set, 0-based.
    pub pgc_idx: usize,
    /// Taken (vob_id, cell_id) pairs in playback order.
    pub cells: Vec<(u16, u8)>,
    /// Parallel chapter flags; same length as `cells`.
    pub is_chapter: Vec<bool>,
    /// Per-track audio descriptors.
    pub audios: Vec<AudioTrack>,
}

/// Walks one program chain and selects the ordered cells (and chapter
/// flags) belonging to `title_nr` (1-based) at the requested angle.
///
/// An angle number is mandatory when the title has more than one angle.
/// Titles whose chapter pointers span multiple PGCs are unsupported and
/// rejected as malformed.
pub fn resolve_title(
    disc: &DiscStructure,
    title_nr: usize,
    angle_nr: Option<usize>,
) -> Result<ResolvedTitle> {
    if title_nr == 0 || title_nr > disc.titles.len() {
        return Err(DvdError::Configuration(format!(
            "title {} out of range (disc has {} titles)",
            title_nr,
            disc.titles.len()
        )));
    }
    let tt = &disc.titles[title_nr - 1];

    if tt.nr_of_angles != 1 && angle_nr.is_none() {
        return Err(DvdError::Configuration(format!(
            "title {} has {} angles, an angle number is required",
            title_nr, tt.nr_of_angles
        )));
    }
    if let Some(angle) = angle_nr {
        if angle == 0 || angle > tt.nr_of_angles as usize {
            return Err(DvdError::Configuration(format!(
                "angle {} out of range for title {} ({} angles)",
                angle, title_nr, tt.nr_of_angles
            )));
        }
    }

    let vts_nr = tt.title_set_nr as usize;
    let vts = disc.vts(vts_nr)?;

    let ptts = vts.ptt_srpt.get(tt.vts_ttn as usize - 1).ok_or_else(|| {
        DvdError::StructuralParse(format!(
            "title {}: vts_ttn {} missing from chapter pointer table of vts {}",
            title_nr, tt.vts_ttn, vts_nr
        ))
    })?;

    if ptts.len() != tt.nr_of_ptts as usize {
        return Err(DvdError::StructuralParse(format!(
            "title {}: title table declares {} chapter pointers, vts holds {}",
            title_nr,
            tt.nr_of_ptts,
            ptts.len()
        )));
    }
    if ptts.is_empty() {
        return Err(DvdError::StructuralParse(format!(
            "title {}: empty chapter pointer list",
            title_nr
        )));
    }

    let pgcn = ptts[0].pgcn;
    if ptts.iter().any(|p| p.pgcn != pgcn) {
        return Err(DvdError::StructuralParse(format!(
            "title {} spans multiple program chains (unsupported)",
            title_nr
        )));
    }

    let pgc_idx = pgcn as usize - 1;
    let pgc = vts.program_chains.get(pgc_idx).ok_or_else(|| {
        DvdError::StructuralParse(format!(
            "title {}: program chain {} missing from vts {}",
            title_nr, pgcn, vts_nr
        ))
    })?;

    let title_programs: Vec<u16> = ptts.iter().map(|p| p.pgn).collect();

    if title_programs[0] != 1 || pgc.program_map.first() != Some(&1) {
        warn!("title {} does not start at the first cell", title_nr);
    }

    // Programs of the chain that this title's chapter pointers reference.
    let target_programs: Vec<u8> = pgc
        .program_map
        .iter()
        .enumerate()
        .filter(|(i, _)| title_programs.contains(&(*i as u16 + 1)))
        .map(|(_, &p)| p)
        .collect();

    if target_programs != pgc.program_map {
        warn!(
            "title {}: chapter pointers do not cover the full program map",
            title_nr
        );
    }

    let (cells, is_chapter) = walk_angle_block(pgc, angle_nr, &target_programs);

    if cells.len() != is_chapter.len() {
        return Err(DvdError::StructuralParse(format!(
            "title {}: taken cell list and chapter flags diverged ({} vs {})",
            title_nr,
            cells.len(),
            is_chapter.len()
        )));
    }

    let audios = audio_tracks(vts, pgc);

    Ok(ResolvedTitle {
        title_nr,
        vts_nr,
        pgc_idx,
        cells,
        is_chapter,
        audios,
    })
}

/// Selects cells across angle blocks. `NotInBlock` cells are always
/// taken; inside a block, only the cell whose running angle counter
/// matches the requested angle is.
fn walk_angle_block(
    pgc: &ProgramChain,
    angle_nr: Option<usize>,
    target_programs: &[u8],
) -> (Vec<(u16, u8)>, Vec<bool>) {
    let mut cells = Vec::new();
    let mut is_chapter = Vec::new();

    let mut current_angle = 1usize;
    let mut angle_start_idx = 0usize;

    for (cell_idx, (position, playback)) in pgc
        .cell_position
        .iter()
        .zip(pgc.cell_playback.iter())
        .enumerate()
    {
        match playback.block_mode {
            BlockMode::FirstCell => {
                current_angle = 1;
                angle_start_idx = cell_idx;
            }
            BlockMode::InBlock | BlockMode::LastCell => {
                current_angle += 1;
            }
            BlockMode::NotInBlock => {}
        }

        let take = if playback.block_mode == BlockMode::NotInBlock {
            angle_start_idx = cell_idx;
            true
        } else {
            Some(current_angle) == angle_nr
        };

        if take {
            cells.push(position.vob_cell());
            is_chapter.push(target_programs.contains(&(angle_start_idx as u8 + 1)));
        }
    }

    (cells, is_chapter)
}

fn audio_tracks(vts: &crate::ifo::VtsIfo, pgc: &ProgramChain) -> Vec<AudioTrack> {
    pgc.audio_control
        .iter()
        .enumerate()
        .map(|(i, control)| {
            if !control.available {
                return AudioTrack::None;
            }
            match vts.audio_attr.get(i) {
                Some(attr) => AudioTrack::Present {
                    codec: attr.codec,
                    language: attr.language.clone(),
                },
                None => AudioTrack::None,
            }
        })
        .collect()
}

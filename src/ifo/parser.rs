use super::types::*;
use crate::av::Fps;
use crate::error::{DvdError, Result};
use crate::utils::{BeReader, BitReader};

// Sector pointers in the VMG / VTSI management tables.
const VMG_TT_SRPT: usize = 0x00C4;
const VTS_PTT_SRPT: usize = 0x00C8;
const VTS_PGCI: usize = 0x00CC;
const VTS_C_ADT: usize = 0x00E0;
const VTS_VOBU_ADMAP: usize = 0x00E4;

// Absolute offsets in the VTSI_MAT.
const VTSI_VIDEO_ATTR: usize = 0x0200;
const VTSI_NR_AUDIO: usize = 0x0202;
const VMG_NR_VTS: usize = 0x003E;

/// Parses the VMG navigation file (VIDEO_TS.IFO): the number of title
/// sets and the global title table.
pub fn parse_ifo0(data: &[u8]) -> Result<(u16, Vec<TitleInfo>)> {
    let mut r = BeReader::new(data);

    r.seek(VMG_NR_VTS)?;
    let num_vts = r.read_u16()?;

    r.goto_sector_ptr(VMG_TT_SRPT)?;
    let num_titles = r.read_u16()?;
    r.skip(2)?; // reserved
    let _end = r.read_u32()?;

    let mut titles = Vec::with_capacity(num_titles as usize);
    for _ in 0..num_titles {
        let _title_type = r.read_u8()?;
        let nr_of_angles = r.read_u8()?;
        let nr_of_ptts = r.read_u16()?;
        r.skip(2)?; // parental mask
        let title_set_nr = r.read_u8()?;
        let vts_ttn = r.read_u8()?;
        let title_set_sector = r.read_u32()?;

        titles.push(TitleInfo {
            nr_of_angles,
            nr_of_ptts,
            title_set_nr,
            vts_ttn,
            title_set_sector,
        });
    }

    Ok((num_vts, titles))
}

/// Parses one VTS navigation file (VTS_xx_0.IFO).
pub fn parse_vts(data: &[u8]) -> Result<VtsIfo> {
    let (video_attr, audio_attr) = parse_vtsi_mat(data)?;
    let program_chains = parse_pgci(data)?;
    let vobu_admap = parse_vobu_admap(data)?;
    let cell_adt = parse_c_adt(data)?;
    let ptt_srpt = parse_ptt_srpt(data)?;

    Ok(VtsIfo {
        video_attr,
        audio_attr,
        program_chains,
        cell_adt,
        vobu_admap,
        ptt_srpt,
    })
}

fn parse_vtsi_mat(data: &[u8]) -> Result<(VideoAttr, Vec<AudioAttr>)> {
    let mut r = BeReader::new(data);

    r.seek(VTSI_VIDEO_ATTR)?;
    let vb0 = r.read_u8()?;
    let vb1 = r.read_u8()?;
    let video_attr = VideoAttr {
        mpeg_version: (vb0 & 0b1100_0000) >> 6,
        video_format: (vb0 & 0b0011_0000) >> 4,
        picture_size: (vb1 & 0b0011_0000) >> 4,
    };

    r.seek(VTSI_NR_AUDIO)?;
    let num_audio = r.read_u16()?;
    if num_audio > 8 {
        return Err(DvdError::StructuralParse(format!(
            "title set declares {} audio streams, at most 8 are addressable",
            num_audio
        )));
    }

    let mut audio_attr = Vec::with_capacity(num_audio as usize);
    for _ in 0..num_audio {
        let buf = r.read_bytes(8)?;

        let mut bits = BitReader::new(buf);
        let format_code = bits.read_bits(3)? as u8;
        bits.skip_bits(1)?; // multichannel extension
        let lang_type = bits.read_bits(2)? as u8;

        let codec = match format_code {
            0 => AudioCodec::Ac3,
            4 => AudioCodec::Lpcm,
            other => AudioCodec::Other(other),
        };

        let language = if lang_type != 0 {
            String::from_utf8_lossy(&buf[2..4]).into_owned()
        } else {
            "xx".to_string()
        };

        audio_attr.push(AudioAttr { codec, language });
    }

    Ok((video_attr, audio_attr))
}

fn parse_pgci(data: &[u8]) -> Result<Vec<ProgramChain>> {
    let mut r = BeReader::new(data);
    r.goto_sector_ptr(VTS_PGCI)?;
    let table_base = r.position();

    let nr_pgcs = r.read_u16()?;
    r.skip(2)?; // reserved
    let _end = r.read_u32()?;

    let mut pgcs = Vec::with_capacity(nr_pgcs as usize);
    for _ in 0..nr_pgcs {
        let _category = r.read_u32()?;
        let offset = r.read_u32()? as usize;
        let next_entry = r.position();

        let pgc_base = table_base + offset;
        r.seek(pgc_base)?;
        r.skip(2)?; // reserved
        let num_programs = r.read_u8()?;
        let num_cells = r.read_u8()?;
        r.skip(8)?; // playback time + prohibited user ops

        let mut audio_control = Vec::with_capacity(8);
        for _ in 0..8 {
            let ac = r.read_u8()?;
            r.skip(1)?;
            audio_control.push(AudioControl {
                available: ac & 0x80 != 0,
                number: ac & 0x07,
            });
        }

        r.skip(32 * 4)?; // subpicture stream control

        let next_pgc_nr = r.read_u16()?;
        let prev_pgc_nr = r.read_u16()?;
        let group_pgc_nr = r.read_u16()?;
        let playback_mode = r.read_u8()?;
        let still_time = r.read_u8()?;

        r.skip(16 * 4)?; // color palette

        let _offset_commands = r.read_u16()?;
        let offset_program = r.read_u16()? as usize;
        let offset_playback = r.read_u16()? as usize;
        let offset_position = r.read_u16()? as usize;

        r.seek(pgc_base + offset_program)?;
        let mut program_map = Vec::with_capacity(num_programs as usize);
        for _ in 0..num_programs {
            program_map.push(r.read_u8()?);
        }

        r.seek(pgc_base + offset_position)?;
        let mut cell_position = Vec::with_capacity(num_cells as usize);
        for _ in 0..num_cells {
            let vob_id = r.read_u16()?;
            r.skip(1)?;
            let cell_id = r.read_u8()?;
            cell_position.push(CellPosition { vob_id, cell_id });
        }

        r.seek(pgc_base + offset_playback)?;
        let mut cell_playback = Vec::with_capacity(num_cells as usize);
        for _ in 0..num_cells {
            let flags = r.read_u8()?;
            r.skip(3)?; // block flags reserved + still time + command nr
            let hour = r.read_u8()?;
            let minute = r.read_u8()?;
            let second = r.read_u8()?;
            let frame_u = r.read_u8()?;
            let first_sector = r.read_u32()?;
            let first_ilvu_end_sector = r.read_u32()?;
            let last_vobu_start_sector = r.read_u32()?;
            let last_sector = r.read_u32()?;

            cell_playback.push(CellPlayback {
                block_mode: BlockMode::from_bits((flags & 0b1100_0000) >> 6),
                block_type: (flags & 0b0011_0000) >> 4,
                seamless_play: flags & 0b1000 != 0,
                interleaved: flags & 0b0100 != 0,
                seamless_angle: flags & 0b0001 != 0,
                playback_time: playback_time(hour, minute, second, frame_u)?,
                first_sector,
                first_ilvu_end_sector,
                last_vobu_start_sector,
                last_sector,
            });
        }

        pgcs.push(ProgramChain {
            program_map,
            cell_position,
            cell_playback,
            audio_control,
            next_pgc_nr,
            prev_pgc_nr,
            group_pgc_nr,
            still_time,
            playback_mode,
        });

        r.seek(next_entry)?;
    }

    Ok(pgcs)
}

/// Decodes a cell playback time field. The two rate bits of the frame
/// byte admit exactly the PAL (0b01) and NTSC (0b11) encodings.
fn playback_time(hour: u8, minute: u8, second: u8, frame_u: u8) -> Result<PlaybackTime> {
    let fps = match frame_u >> 6 {
        0b01 => Fps::PAL,
        0b11 => Fps::NTSC_FILM,
        code => {
            return Err(DvdError::StructuralParse(format!(
                "unrecognized frame rate code {:#04b} in cell playback time",
                code
            )))
        }
    };

    Ok(PlaybackTime {
        hour,
        minute,
        second,
        frames: frame_u & 0x3F,
        fps,
    })
}

fn parse_vobu_admap(data: &[u8]) -> Result<Vec<u32>> {
    let mut r = BeReader::new(data);
    r.goto_sector_ptr(VTS_VOBU_ADMAP)?;
    let end = r.read_u32()? as usize;

    let count = (end + 1).checked_sub(4).ok_or_else(|| {
        DvdError::StructuralParse("vobu_admap end offset shorter than its header".into())
    })? / 4;

    let mut admap = Vec::with_capacity(count);
    for _ in 0..count {
        admap.push(r.read_u32()?);
    }
    Ok(admap)
}

fn parse_c_adt(data: &[u8]) -> Result<Vec<CellAddress>> {
    let mut r = BeReader::new(data);
    r.goto_sector_ptr(VTS_C_ADT)?;
    let _nr_vobs = r.read_u16()?;
    r.skip(2)?; // reserved
    let end = r.read_u32()? as usize;

    let count = (end + 1).checked_sub(6).ok_or_else(|| {
        DvdError::StructuralParse("cell address table end offset shorter than its header".into())
    })? / 12;

    let mut table = Vec::with_capacity(count);
    for _ in 0..count {
        let vob_id = r.read_u16()?;
        let cell_id = r.read_u8()?;
        r.skip(1)?; // reserved
        let start_sector = r.read_u32()?;
        let last_sector = r.read_u32()?;
        table.push(CellAddress {
            vob_id,
            cell_id,
            start_sector,
            last_sector,
        });
    }
    Ok(table)
}

fn parse_ptt_srpt(data: &[u8]) -> Result<Vec<Vec<PttEntry>>> {
    let mut r = BeReader::new(data);
    r.goto_sector_ptr(VTS_PTT_SRPT)?;
    let num_titles = r.read_u16()? as usize;
    r.skip(2)?; // reserved
    let end = r.read_u32()? as usize;

    // Title offsets are relative to the table start; rebase them onto
    // the flat chapter-pointer array that follows the offset block.
    let correction = num_titles * 4 + 8;

    let mut starts = Vec::with_capacity(num_titles);
    for _ in 0..num_titles {
        let off = r.read_u32()? as usize;
        let rebased = off.checked_sub(correction).ok_or_else(|| {
            DvdError::StructuralParse("chapter pointer offset before table body".into())
        })?;
        starts.push(rebased / 4);
    }

    let total_ptts = (end + 1).checked_sub(correction).ok_or_else(|| {
        DvdError::StructuralParse("chapter pointer table end offset shorter than its header".into())
    })? / 4;

    let mut all_ptts = Vec::with_capacity(total_ptts);
    for _ in 0..total_ptts {
        let pgcn = r.read_u16()?;
        let pgn = r.read_u16()?;
        all_ptts.push(PttEntry { pgcn, pgn });
    }

    starts.push(all_ptts.len());
    let mut titles = Vec::with_capacity(num_titles);
    for i in 0..num_titles {
        let (lo, hi) = (starts[i], starts[i + 1]);
        if lo > hi || hi > all_ptts.len() {
            return Err(DvdError::StructuralParse(format!(
                "chapter pointer slice {}..{} out of bounds for title {}",
                lo,
                hi,
                i + 1
            )));
        }
        titles.push(all_ptts[lo..hi].to_vec());
    }
    Ok(titles)
}

impl DiscStructure {
    /// Parses a disc from the raw bytes of its navigation files:
    /// the VMG file plus one file per title set, in title-set order.
    pub fn parse<B: AsRef<[u8]>>(ifo0: &[u8], vts_files: &[B]) -> Result<Self> {
        let (num_vts, titles) = parse_ifo0(ifo0)?;

        if vts_files.is_empty() && num_vts > 0 {
            return Err(DvdError::Resource(
                "no title set navigation files supplied".into(),
            ));
        }
        if vts_files.len() != num_vts as usize {
            return Err(DvdError::Resource(format!(
                "disc declares {} title sets, {} navigation files supplied",
                num_vts,
                vts_files.len()
            )));
        }

        let mut vts = Vec::with_capacity(vts_files.len());
        for file in vts_files {
            vts.push(parse_vts(file.as_ref())?);
        }

        Ok(DiscStructure { titles, vts })
    }
}

//! DVD-Video navigation (IFO) parsing.
//!
//! Decodes the binary navigation files of a disc into a
//! [`DiscStructure`]: the global title table plus, per title set, the
//! program chains, cell address table, playback-unit sector map, audio
//! attributes and chapter pointer table. Parsing is purely sequential
//! seek/read over sector-granular pointers; there are no heuristics.

mod parser;
mod types;

pub use parser::{parse_ifo0, parse_vts};
pub use types::*;

use log::warn;

/// Structurally compares two parses of the same disc, one of them
/// typically produced by an alternate authority (e.g. a native
/// libdvdread-based reader).
///
/// Two navigation fields alternate readers are known to disagree on
/// (`playback_mode`, `still_time`) are normalized away before the
/// comparison. Every mismatch is logged and returned; a mismatch is a
/// diagnostic, never an error.
pub fn cross_check(ours: &DiscStructure, theirs: &DiscStructure) -> Vec<String> {
    let mut diffs = Vec::new();

    if ours.titles != theirs.titles {
        diffs.push("title table differs".to_string());
    }
    if ours.vts.len() != theirs.vts.len() {
        diffs.push(format!(
            "title set count differs: {} vs {}",
            ours.vts.len(),
            theirs.vts.len()
        ));
    }

    for (i, (a, b)) in ours.vts.iter().zip(theirs.vts.iter()).enumerate() {
        let nr = i + 1;
        if a.video_attr != b.video_attr {
            diffs.push(format!("vts {}: video attributes differ", nr));
        }
        if a.audio_attr != b.audio_attr {
            diffs.push(format!("vts {}: audio attributes differ", nr));
        }
        if a.cell_adt != b.cell_adt {
            diffs.push(format!("vts {}: cell address table differs", nr));
        }
        if a.vobu_admap != b.vobu_admap {
            diffs.push(format!("vts {}: vobu address map differs", nr));
        }
        if a.ptt_srpt != b.ptt_srpt {
            diffs.push(format!("vts {}: chapter pointer table differs", nr));
        }

        if a.program_chains.len() != b.program_chains.len() {
            diffs.push(format!("vts {}: program chain count differs", nr));
            continue;
        }
        for (j, (pa, pb)) in a
            .program_chains
            .iter()
            .zip(b.program_chains.iter())
            .enumerate()
        {
            if normalize_pgc(pa) != normalize_pgc(pb) {
                diffs.push(format!("vts {}: program chain {} differs", nr, j + 1));
            }
        }
    }

    for diff in &diffs {
        warn!("disc structure cross-check: {}", diff);
    }
    diffs
}

fn normalize_pgc(pgc: &ProgramChain) -> ProgramChain {
    let mut pgc = pgc.clone();
    pgc.playback_mode = 0;
    pgc.still_time = 0;
    pgc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Fps;
    use crate::error::DvdError;
    use crate::utils::SECTOR_SIZE;
    use pretty_assertions::assert_eq;

    fn put_u16(buf: &mut [u8], at: usize, v: u16) {
        buf[at..at + 2].copy_from_slice(&v.to_be_bytes());
    }

    fn put_u32(buf: &mut [u8], at: usize, v: u32) {
        buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// VMG image: one title set, one title with 3 chapter pointers.
    fn build_vmg() -> Vec<u8> {
        let mut buf = vec![0u8; SECTOR_SIZE * 2];
        put_u16(&mut buf, 0x3E, 1); // nr of title sets
        put_u32(&mut buf, 0xC4, 1); // tt_srpt at sector 1

        let base = SECTOR_SIZE;
        put_u16(&mut buf, base, 1); // one title
        put_u32(&mut buf, base + 4, 0); // end (unused)

        let t = base + 8;
        buf[t] = 0; // title type
        buf[t + 1] = 1; // angles
        put_u16(&mut buf, t + 2, 3); // nr of ptts
        buf[t + 6] = 1; // title set nr
        buf[t + 7] = 1; // vts ttn
        put_u32(&mut buf, t + 8, 0); // title set sector
        buf
    }

    /// VTS image: one PGC of three single-range cells, program map
    /// [1,2,3], AC3 English on track 0.
    fn build_vts() -> Vec<u8> {
        let mut buf = vec![0u8; SECTOR_SIZE * 5];

        // VTSI_MAT: video attr (MPEG-2, PAL), one audio stream (AC3, "en")
        buf[0x200] = 0b0101_0000;
        put_u16(&mut buf, 0x202, 1);
        buf[0x204] = 0b0000_0100; // format 0 (AC3), lang type 1
        buf[0x206] = b'e';
        buf[0x207] = b'n';

        put_u32(&mut buf, 0xCC, 1); // pgci
        put_u32(&mut buf, 0xE4, 2); // vobu admap
        put_u32(&mut buf, 0xE0, 3); // cell address table
        put_u32(&mut buf, 0xC8, 4); // chapter pointers

        // PGCI
        let base = SECTOR_SIZE;
        put_u16(&mut buf, base, 1); // one pgc
        put_u32(&mut buf, base + 8, 0); // category
        put_u32(&mut buf, base + 12, 16); // pgc offset

        let pgc = base + 16;
        buf[pgc + 2] = 3; // programs
        buf[pgc + 3] = 3; // cells
        buf[pgc + 12] = 0x80; // audio track 0 available
        let tail = pgc + 4 + 8 + 16 + 128; // after subpic stream control
        put_u16(&mut buf, tail, 0); // next pgc
        put_u16(&mut buf, tail + 2, 0); // prev pgc
        put_u16(&mut buf, tail + 4, 0); // group pgc
        buf[tail + 6] = 0; // playback mode
        buf[tail + 7] = 0; // still time
        let offsets = tail + 8 + 64;
        put_u16(&mut buf, offsets, 0); // commands
        put_u16(&mut buf, offsets + 2, 236); // program map
        put_u16(&mut buf, offsets + 4, 251); // cell playback
        put_u16(&mut buf, offsets + 6, 239); // cell position

        buf[pgc + 236] = 1;
        buf[pgc + 237] = 2;
        buf[pgc + 238] = 3;

        for (i, vob) in [1u16, 2, 3].iter().enumerate() {
            let p = pgc + 239 + i * 4;
            put_u16(&mut buf, p, *vob);
            buf[p + 3] = 1; // cell id
        }

        for (i, last) in [99u32, 199, 299].iter().enumerate() {
            let p = pgc + 251 + i * 24;
            buf[p] = 0; // flags: not in block
            buf[p + 6] = 10; // seconds
            buf[p + 7] = 0b0100_0000 | 15; // PAL rate code, 15 frames
            put_u32(&mut buf, p + 8, if i == 0 { 0 } else { *last - 99 });
            put_u32(&mut buf, p + 20, *last);
        }

        // VOBU address map: 4 units
        let admap = SECTOR_SIZE * 2;
        put_u32(&mut buf, admap, 4 + 4 * 4 - 1);
        for (i, s) in [0u32, 80, 160, 240].iter().enumerate() {
            put_u32(&mut buf, admap + 4 + i * 4, *s);
        }

        // Cell address table: one range per cell
        let cadt = SECTOR_SIZE * 3;
        put_u16(&mut buf, cadt, 3);
        put_u32(&mut buf, cadt + 4, 6 + 12 * 3 - 1);
        for (i, (vob, start, last)) in [(1u16, 0u32, 99u32), (2, 100, 199), (3, 200, 299)]
            .iter()
            .enumerate()
        {
            let p = cadt + 8 + i * 12;
            put_u16(&mut buf, p, *vob);
            buf[p + 2] = 1;
            put_u32(&mut buf, p + 4, *start);
            put_u32(&mut buf, p + 8, *last);
        }

        // Chapter pointers: title 1 -> (pgc 1, programs 1..=3)
        let ptt = SECTOR_SIZE * 4;
        put_u16(&mut buf, ptt, 1);
        put_u32(&mut buf, ptt + 4, 23); // end: 12 (correction) + 3*4 - 1
        put_u32(&mut buf, ptt + 8, 12); // title 1 offset
        for pgn in 1u16..=3 {
            let p = ptt + 12 + (pgn as usize - 1) * 4;
            put_u16(&mut buf, p, 1);
            put_u16(&mut buf, p + 2, pgn);
        }

        buf
    }

    pub(crate) fn build_disc() -> DiscStructure {
        DiscStructure::parse(&build_vmg(), &[build_vts()]).unwrap()
    }

    #[test]
    fn test_parse_vmg() {
        let (num_vts, titles) = parse_ifo0(&build_vmg()).unwrap();
        assert_eq!(num_vts, 1);
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].nr_of_angles, 1);
        assert_eq!(titles[0].nr_of_ptts, 3);
        assert_eq!(titles[0].title_set_nr, 1);
        assert_eq!(titles[0].vts_ttn, 1);
    }

    #[test]
    fn test_parse_vts_tables() {
        let vts = parse_vts(&build_vts()).unwrap();

        assert_eq!(vts.video_attr.mpeg_version, 1);
        assert_eq!(vts.video_attr.video_format, 1);
        assert_eq!(
            vts.audio_attr,
            vec![AudioAttr {
                codec: AudioCodec::Ac3,
                language: "en".to_string()
            }]
        );

        assert_eq!(vts.program_chains.len(), 1);
        let pgc = &vts.program_chains[0];
        assert_eq!(pgc.program_map, vec![1, 2, 3]);
        assert_eq!(pgc.cell_position.len(), pgc.cell_playback.len());
        assert_eq!(pgc.cell_position[1].vob_cell(), (2, 1));
        assert_eq!(pgc.cell_playback[2].last_sector, 299);
        assert_eq!(pgc.cell_playback[0].block_mode, BlockMode::NotInBlock);
        assert_eq!(pgc.cell_playback[0].playback_time.fps, Fps::PAL);
        assert!(pgc.audio_control[0].available);
        assert!(!pgc.audio_control[1].available);

        assert_eq!(vts.vobu_admap, vec![0, 80, 160, 240]);
        assert_eq!(vts.cell_adt.len(), 3);
        assert_eq!(vts.sector_ranges(2, 1), vec![(100, 199)]);
        assert_eq!(vts.last_sector(), 299);

        assert_eq!(vts.ptt_srpt.len(), 1);
        assert_eq!(vts.ptt_srpt[0].len(), 3);
        assert_eq!(vts.ptt_srpt[0][2], PttEntry { pgcn: 1, pgn: 3 });
    }

    #[test]
    fn test_sectors_for_cells_order() {
        let vts = parse_vts(&build_vts()).unwrap();
        let sectors = vts.sectors_for_cells(&[(2, 1), (1, 1)]);
        assert_eq!(sectors.len(), 200);
        assert_eq!(sectors[0], 100);
        assert_eq!(sectors[100], 0);
    }

    #[test]
    fn test_bad_frame_rate_code_is_fatal() {
        let mut image = build_vts();
        // First cell playback entry: zero out the rate bits.
        let p = SECTOR_SIZE + 16 + 251 + 7;
        image[p] = 15;
        let err = parse_vts(&image).unwrap_err();
        assert!(matches!(err, DvdError::StructuralParse(_)));
    }

    #[test]
    fn test_pointer_past_eof_is_fatal() {
        let mut image = build_vts();
        put_u32(&mut image, 0xCC, 100);
        assert!(matches!(
            parse_vts(&image).unwrap_err(),
            DvdError::StructuralParse(_)
        ));
    }

    #[test]
    fn test_cross_check_normalizes_volatile_fields() {
        let a = build_disc();
        let mut b = a.clone();
        b.vts[0].program_chains[0].still_time = 0xFF;
        b.vts[0].program_chains[0].playback_mode = 0x7F;
        assert!(cross_check(&a, &b).is_empty());

        b.vts[0].cell_adt[0].last_sector = 98;
        let diffs = cross_check(&a, &b);
        assert_eq!(diffs, vec!["vts 1: cell address table differs"]);
    }

    #[test]
    fn test_vts_count_mismatch() {
        let vmg = build_vmg();
        let none: &[Vec<u8>] = &[];
        assert!(matches!(
            DiscStructure::parse(&vmg, none).unwrap_err(),
            DvdError::Resource(_)
        ));
    }
}

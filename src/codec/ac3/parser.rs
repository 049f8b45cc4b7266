use crate::error::{DvdError, Result};
use crate::utils::BitReader;

/// Decoded samples per AC3 frame: 6 audio blocks of 256 samples.
pub const SAMPLES_PER_FRAME: usize = 6 * 256;

/// Nominal bit rates in kbit/s, indexed by `frmsizecod >> 1`.
const BIT_RATES: [u32; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

/// Parsed AC3 synchronization info: everything needed to walk the
/// elementary stream frame by frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Total frame size in bytes, sync word included.
    pub frame_size: usize,
    /// Nominal bit rate in bit/s.
    pub bit_rate: u32,
}

/// Parses the syncinfo at the start of `buf`.
///
/// Requires the 5 syncinfo bytes: sync word, CRC1, and the packed
/// fscod/frmsizecod byte.
pub fn parse_sync_info(buf: &[u8]) -> Result<SyncInfo> {
    if buf.len() < 5 {
        return Err(DvdError::StructuralParse(format!(
            "ac3 syncinfo needs 5 bytes, got {}",
            buf.len()
        )));
    }
    if buf[0] != 0x0B || buf[1] != 0x77 {
        return Err(DvdError::StructuralParse(format!(
            "bad ac3 sync word {:02x}{:02x}",
            buf[0], buf[1]
        )));
    }

    let mut reader = BitReader::new(&buf[4..5]);
    let fscod = reader.read_bits(2)? as u8;
    let frmsizecod = reader.read_bits(6)? as u32;

    if frmsizecod >= 38 {
        return Err(DvdError::StructuralParse(format!(
            "ac3 frame size code {} out of range",
            frmsizecod
        )));
    }
    let bit_rate_kbps = BIT_RATES[(frmsizecod >> 1) as usize];

    let (sample_rate, frame_size) = match fscod {
        0 => (48_000, 4 * bit_rate_kbps as usize),
        1 => (
            44_100,
            2 * (320 * bit_rate_kbps as usize / 147 + (frmsizecod & 1) as usize),
        ),
        2 => (32_000, 6 * bit_rate_kbps as usize),
        _ => {
            return Err(DvdError::StructuralParse(
                "reserved ac3 sample rate code".to_string(),
            ))
        }
    };

    Ok(SyncInfo {
        sample_rate,
        frame_size,
        bit_rate: bit_rate_kbps * 1000,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(fscod: u8, frmsizecod: u8) -> [u8; 5] {
        [0x0B, 0x77, 0, 0, (fscod << 6) | (frmsizecod & 63)]
    }

    #[test]
    fn test_48khz_frame_size() {
        // frmsizecod 18 -> bitrate index 9 -> 160 kbit/s.
        let info = parse_sync_info(&header(0, 18)).unwrap();
        assert_eq!(
            info,
            SyncInfo {
                sample_rate: 48_000,
                frame_size: 640,
                bit_rate: 160_000,
            }
        );
    }

    #[test]
    fn test_44khz_odd_code_pads_one_word() {
        let even = parse_sync_info(&header(1, 18)).unwrap();
        let odd = parse_sync_info(&header(1, 19)).unwrap();
        assert_eq!(even.sample_rate, 44_100);
        assert_eq!(odd.frame_size, even.frame_size + 2);
    }

    #[test]
    fn test_32khz_frame_size() {
        let info = parse_sync_info(&header(2, 0)).unwrap();
        assert_eq!(info.sample_rate, 32_000);
        assert_eq!(info.frame_size, 6 * 32);
    }

    #[test]
    fn test_bad_sync_word() {
        assert!(matches!(
            parse_sync_info(&[0xFF, 0x77, 0, 0, 0]).unwrap_err(),
            DvdError::StructuralParse(_)
        ));
    }

    #[test]
    fn test_reserved_fscod_and_frmsizecod() {
        assert!(parse_sync_info(&header(3, 0)).is_err());
        assert!(parse_sync_info(&header(0, 38)).is_err());
    }
}

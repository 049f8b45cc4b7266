use super::types::*;
use crate::error::{DvdError, Result};
use crate::utils::SECTOR_SIZE;

/// One packet pulled off the program stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// Pack header; fixed-length, no payload of interest.
    Pack,
    /// System or padding header; skipped.
    System,
    /// Video PES packet body (declared-length bytes after the length
    /// field).
    Video(&'a [u8]),
    /// Private stream 1 body: audio sub-streams.
    Private1(&'a [u8]),
    /// Private stream 2 body: navigation (PCI/DSI).
    Private2(&'a [u8]),
}

/// Walks packets over a concatenated sector buffer.
///
/// DVD packs are sector-aligned and packets never span sectors, so a
/// single forward cursor suffices; no backtracking.
pub struct PacketCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketCursor<'a> {
    /// Creates a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Sector index (into the request list) of the most recently
    /// returned packet's first byte.
    pub fn sector_index(&self, packet_start: usize) -> usize {
        packet_start / SECTOR_SIZE
    }

    /// Byte offset of the next packet.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Pulls the next packet, or `None` at end of input.
    ///
    /// Anything but a known start code is malformed input: skipping it
    /// silently would desynchronize downstream sample offsets.
    pub fn next_packet(&mut self) -> Result<Option<(usize, Packet<'a>)>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let start = self.pos;
        let rest = &self.data[self.pos..];
        if rest.len() < 4 || rest[0] != 0 || rest[1] != 0 || rest[2] != 1 {
            return Err(DvdError::StructuralParse(format!(
                "no start code at byte offset {}",
                self.pos
            )));
        }
        let code = rest[3];

        if code == PACK_START_CODE {
            if rest.len() < 4 + PACK_HEADER_LEN {
                return Err(DvdError::StructuralParse(
                    "truncated pack header".to_string(),
                ));
            }
            self.pos += 4 + PACK_HEADER_LEN;
            return Ok(Some((start, Packet::Pack)));
        }

        if rest.len() < 6 {
            return Err(DvdError::StructuralParse(
                "truncated packet length field".to_string(),
            ));
        }
        let len = u16::from_be_bytes([rest[4], rest[5]]) as usize;
        if rest.len() < 6 + len {
            return Err(DvdError::StructuralParse(format!(
                "packet at offset {} declares {} bytes past end of input",
                self.pos, len
            )));
        }
        let body = &rest[6..6 + len];
        self.pos += 6 + len;

        let packet = match code {
            SYSTEM_HEADER_CODE | PADDING_STREAM_CODE => Packet::System,
            VIDEO_STREAM_CODE => Packet::Video(body),
            PRIVATE_STREAM_1 => Packet::Private1(body),
            PRIVATE_STREAM_2 => Packet::Private2(body),
            other => {
                return Err(DvdError::StructuralParse(format!(
                    "unexpected start code {:#04x} at byte offset {}",
                    other, start
                )))
            }
        };
        Ok(Some((start, packet)))
    }
}

/// PES extension header fields of a video or private-1 packet body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesHeader<'a> {
    /// Presentation timestamp, when flagged.
    pub pts: Option<u64>,
    /// Decode timestamp, when flagged.
    pub dts: Option<u64>,
    /// Packet payload after the extension header.
    pub payload: &'a [u8],
}

/// Parses the MPEG-2 PES extension header at the start of `body`.
pub fn parse_pes_header(body: &[u8]) -> Result<PesHeader<'_>> {
    if body.len() < 3 {
        return Err(DvdError::StructuralParse(
            "pes body too short for extension header".to_string(),
        ));
    }
    let flags = body[1];
    let header_data_len = body[2] as usize;
    if body.len() < 3 + header_data_len {
        return Err(DvdError::StructuralParse(
            "pes extension header past end of body".to_string(),
        ));
    }

    let has_pts = flags & 0x80 != 0;
    let has_dts = flags & 0x40 != 0;

    let mut pts = None;
    let mut dts = None;
    if has_pts {
        pts = Some(timestamp(&body[3..])?);
    }
    if has_dts {
        dts = Some(timestamp(&body[8..])?);
    }

    Ok(PesHeader {
        pts,
        dts,
        payload: &body[3 + header_data_len..],
    })
}

/// Decodes a 33-bit timestamp from its 5-byte marker-interleaved form.
fn timestamp(b: &[u8]) -> Result<u64> {
    if b.len() < 5 {
        return Err(DvdError::StructuralParse(
            "truncated pes timestamp".to_string(),
        ));
    }
    Ok(((b[0] as u64 & 0x0E) << 29)
        | ((b[1] as u64) << 22)
        | ((b[2] as u64 >> 1) << 15)
        | ((b[3] as u64) << 7)
        | (b[4] as u64 >> 1))
}

/// Start and end presentation times of a playback unit, from a PCI
/// navigation sub-packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciTimes {
    /// Unit start PTS.
    pub start_pts: u64,
    /// Unit end PTS.
    pub end_pts: u64,
}

/// Reads the unit start/end timestamps of a PCI sub-packet body (the
/// bytes after the navigation id byte).
pub fn parse_pci_times(body: &[u8]) -> Result<PciTimes> {
    if body.len() < 0x14 {
        return Err(DvdError::StructuralParse(
            "pci packet too short".to_string(),
        ));
    }
    let start_pts = u32::from_be_bytes([body[0xC], body[0xD], body[0xE], body[0xF]]) as u64;
    let end_pts = u32::from_be_bytes([body[0x10], body[0x11], body[0x12], body[0x13]]) as u64;
    Ok(PciTimes { start_pts, end_pts })
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Synthetic packet builders shared by the demuxer tests.

    use super::*;

    pub fn encode_timestamp(pts: u64) -> [u8; 5] {
        [
            0x21 | (((pts >> 30) as u8 & 0x7) << 1),
            (pts >> 22) as u8,
            0x01 | (((pts >> 15) as u8 & 0x7F) << 1),
            (pts >> 7) as u8,
            0x01 | ((pts as u8 & 0x7F) << 1),
        ]
    }

    pub fn pes_body(pts: Option<u64>, payload: &[u8]) -> Vec<u8> {
        let mut body = vec![0x80u8];
        match pts {
            Some(p) => {
                body.push(0x80);
                body.push(5);
                body.extend_from_slice(&encode_timestamp(p));
            }
            None => {
                body.push(0);
                body.push(0);
            }
        }
        body.extend_from_slice(payload);
        body
    }

    pub fn packet(code: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0, 0, 1, code];
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    pub fn pack_header() -> Vec<u8> {
        let mut out = vec![0, 0, 1, PACK_START_CODE];
        out.extend_from_slice(&[0u8; PACK_HEADER_LEN]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timestamp_round_trip() {
        for &pts in &[0u64, 90_000, 0x1_FFFF_FFFF] {
            let enc = encode_timestamp(pts);
            assert_eq!(timestamp(&enc).unwrap(), pts);
        }
    }

    #[test]
    fn test_cursor_walks_packets() {
        let mut data = pack_header();
        data.extend(packet(SYSTEM_HEADER_CODE, &[0; 6]));
        data.extend(packet(VIDEO_STREAM_CODE, &pes_body(Some(1234), &[9, 9])));

        let mut cursor = PacketCursor::new(&data);
        assert!(matches!(
            cursor.next_packet().unwrap(),
            Some((0, Packet::Pack))
        ));
        assert!(matches!(
            cursor.next_packet().unwrap(),
            Some((_, Packet::System))
        ));
        match cursor.next_packet().unwrap() {
            Some((_, Packet::Video(body))) => {
                let hdr = parse_pes_header(body).unwrap();
                assert_eq!(hdr.pts, Some(1234));
                assert_eq!(hdr.payload, &[9, 9]);
            }
            other => panic!("expected video packet, got {:?}", other),
        }
        assert!(cursor.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_unknown_start_code_is_fatal() {
        let data = packet(0xC0, &[0; 4]);
        let mut cursor = PacketCursor::new(&data);
        assert!(cursor.next_packet().is_err());
    }

    #[test]
    fn test_pci_times() {
        let mut body = vec![0u8; 0x14];
        body[0xC..0x10].copy_from_slice(&1000u32.to_be_bytes());
        body[0x10..0x14].copy_from_slice(&2000u32.to_be_bytes());
        let t = parse_pci_times(&body).unwrap();
        assert_eq!(
            t,
            PciTimes {
                start_pts: 1000,
                end_pts: 2000
            }
        );
    }
}

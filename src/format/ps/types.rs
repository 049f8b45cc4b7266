/// MPEG program stream start codes (the byte after `00 00 01`).
pub const PACK_START_CODE: u8 = 0xBA;
/// System header start code.
pub const SYSTEM_HEADER_CODE: u8 = 0xBB;
/// Padding stream start code.
pub const PADDING_STREAM_CODE: u8 = 0xBE;
/// First MPEG video elementary stream id.
pub const VIDEO_STREAM_CODE: u8 = 0xE0;
/// Private stream 1: multiplexed audio sub-streams.
pub const PRIVATE_STREAM_1: u8 = 0xBD;
/// Private stream 2: DVD navigation packets (PCI/DSI).
pub const PRIVATE_STREAM_2: u8 = 0xBF;

/// First AC3 sub-stream id within private stream 1.
pub const SUBSTREAM_AC3_FIRST: u8 = 0x80;
/// Last AC3 sub-stream id within private stream 1.
pub const SUBSTREAM_AC3_LAST: u8 = 0x87;

/// Navigation sub-packet id of presentation control info.
pub const NAV_PCI: u8 = 0;
/// Navigation sub-packet id of data search info.
pub const NAV_DSI: u8 = 1;

/// PTS/DTS clock frequency in Hz.
pub const PTS_HZ: u64 = 90_000;

/// Fixed payload length of a pack header after its start code.
pub const PACK_HEADER_LEN: usize = 10;

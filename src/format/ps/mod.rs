//! MPEG program stream demultiplexing over DVD sector data.
//!
//! DVD VOBs are MPEG-2 program streams with one pack per 2048-byte
//! sector. Packets never cross sector boundaries, so the whole layer
//! is a forward walk over concatenated sectors; the only wrinkle is a
//! bounded read-ahead past the last cell to find audio frames that
//! spill over the cell's declared sector range.

mod demuxer;
mod pes;
mod source;
mod types;

pub use demuxer::{dump_cache_path, PsDemuxer};
pub use pes::{parse_pci_times, parse_pes_header, Packet, PacketCursor, PciTimes, PesHeader};
pub use source::VobFileSource;
pub use types::*;

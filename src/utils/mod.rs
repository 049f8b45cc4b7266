mod bits;
mod bytes;

pub use bits::BitReader;
pub use bytes::{BeReader, SECTOR_SIZE};

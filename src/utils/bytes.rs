use crate::error::{DvdError, Result};

/// Sector size of a DVD-Video disc, in bytes.
pub const SECTOR_SIZE: usize = 2048;

/// A bounds-checked big-endian byte cursor over a navigation file.
///
/// All multi-byte integers in IFO files are fixed-width big-endian and
/// tables are reached via sector-granular pointers (pointer value ×
/// sector size = byte offset from file start). Any seek or read past
/// end-of-file is a hard parse error.
pub struct BeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BeReader<'a> {
    /// Creates a new reader positioned at the start of the file.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seeks to an absolute byte offset.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(DvdError::StructuralParse(format!(
                "seek to {:#x} past end of file ({:#x} bytes)",
                pos,
                self.data.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.seek(self.pos + n)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(DvdError::StructuralParse(format!(
                "read of {} bytes at {:#x} past end of file ({:#x} bytes)",
                n,
                self.pos,
                self.data.len()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Reads a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Follows the sector pointer stored at absolute offset `at`:
    /// reads a u32 there and seeks to `value * SECTOR_SIZE`.
    pub fn goto_sector_ptr(&mut self, at: usize) -> Result<()> {
        self.seek(at)?;
        let sector = self.read_u32()? as usize;
        self.seek(sector * SECTOR_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut r = BeReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0203);
        assert_eq!(r.read_u32().unwrap(), 0x04050607);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn test_sector_ptr() {
        let mut data = vec![0u8; SECTOR_SIZE * 2];
        // pointer at 0x10 -> sector 1
        data[0x13] = 0x01;
        data[SECTOR_SIZE] = 0xAB;
        let mut r = BeReader::new(&data);
        r.goto_sector_ptr(0x10).unwrap();
        assert_eq!(r.position(), SECTOR_SIZE);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
    }

    #[test]
    fn test_sector_ptr_past_eof() {
        let mut data = vec![0u8; 32];
        data[3] = 0x10; // sector 16, way past eof
        let mut r = BeReader::new(&data);
        assert!(r.goto_sector_ptr(0).is_err());
    }
}

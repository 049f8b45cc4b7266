use crate::error::{DvdError, Result};
use crate::format::{Domain, SectorSource};
use crate::utils::SECTOR_SIZE;
use bytes::Bytes;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Direct sector reads against a title set's VOB files, which together
/// form one contiguous sector address space.
#[derive(Debug)]
pub struct VobFileSource {
    files: Vec<VobFile>,
}

#[derive(Debug)]
struct VobFile {
    file: File,
    first_sector: u32,
    sector_count: u32,
}

impl VobFileSource {
    /// Opens the title set's VOB files, in on-disc order.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            return Err(DvdError::Resource(
                "no video object files found".to_string(),
            ));
        }
        let mut files = Vec::with_capacity(paths.len());
        let mut next_sector = 0u32;
        for path in paths {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            let sector_count = (len / SECTOR_SIZE as u64) as u32;
            files.push(VobFile {
                file,
                first_sector: next_sector,
                sector_count,
            });
            next_sector += sector_count;
        }
        Ok(Self { files })
    }
}

impl SectorSource for VobFileSource {
    fn read_sectors(&mut self, _vts: usize, _domain: Domain, sectors: &[u32]) -> Result<Bytes> {
        let mut out = Vec::with_capacity(sectors.len() * SECTOR_SIZE);
        let mut buf = [0u8; SECTOR_SIZE];
        for &sector in sectors {
            let vob = self
                .files
                .iter_mut()
                .find(|f| sector >= f.first_sector && sector < f.first_sector + f.sector_count)
                .ok_or_else(|| {
                    DvdError::Resource(format!("sector {} beyond the title set's vob files", sector))
                })?;
            let offset = (sector - vob.first_sector) as u64 * SECTOR_SIZE as u64;
            vob.file.seek(SeekFrom::Start(offset))?;
            vob.file.read_exact(&mut buf)?;
            out.extend_from_slice(&buf);
        }
        Ok(out.into())
    }
}

//! Memory-mapped catalog reader.
//!
//! A catalog file has three contiguous sections:
//!
//! 1. **Header** (32 bytes), see [`super::header`]
//! 2. **Zone index** (`zones × 4` bytes) - record count per zone
//! 3. **Star data** - fixed-width packed records grouped by zone
//!
//! Open a catalog with [`CatalogReader::open`], then fetch raw zone bytes
//! with [`CatalogReader::zone_bytes`]. Decoding is left to the owning
//! component, which knows the mesh the zones belong to.

use super::header::{CatalogHeader, HEADER_SIZE};
use super::index::ZoneIndex;
use crate::error::{CatalogError, Result};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only handle to one catalog file.
///
/// The file stays mapped for the lifetime of this value. Every call to
/// [`zone_bytes`](Self::zone_bytes) bumps a read counter so callers can
/// verify which zones a query actually touched.
pub struct CatalogReader {
    path: PathBuf,
    mmap: Mmap,
    header: CatalogHeader,
    index: ZoneIndex,
    reads: AtomicU64,
}

impl CatalogReader {
    /// Open and memory-map a catalog file.
    ///
    /// Validates the header (magic, variant, depth, magnitude table) and the
    /// zone index against the file length. No star data is touched.
    ///
    /// # Errors
    /// `Open` if the file cannot be opened or mapped, `Truncated` if it is
    /// shorter than its header and index declare, and the header errors of
    /// [`CatalogHeader::parse`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CatalogError::open(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| CatalogError::open(path, e))?
            .len();
        if len < HEADER_SIZE as u64 {
            return Err(CatalogError::Truncated {
                expected: HEADER_SIZE as u64,
                actual: len,
            });
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| CatalogError::open(path, e))?;
        let header = CatalogHeader::parse(&mmap)?;
        let index = ZoneIndex::parse(&header, &mmap)?;

        log::debug!(
            "Mapped catalog {:?}: {} bytes, {}, {} stars",
            path,
            mmap.len(),
            header.variant,
            index.total_stars()
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            header,
            index,
            reads: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &CatalogHeader {
        &self.header
    }

    pub fn index(&self) -> &ZoneIndex {
        &self.index
    }

    /// Raw record bytes of `zone`, a whole number of records long.
    pub fn zone_bytes(&self, zone: usize) -> Result<&[u8]> {
        let range = self.index.byte_range(zone)?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(&self.mmap[range])
    }

    /// Number of [`zone_bytes`](Self::zone_bytes) calls so far.
    pub fn zone_reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the total size of the memory-mapped file in bytes.
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }
}

impl fmt::Debug for CatalogReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogReader")
            .field("path", &self.path)
            .field("variant", &self.header.variant)
            .field("depth", &self.header.depth)
            .field("stars", &self.index.total_stars())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::header::{Endianness, MagnitudeTable, RecordVariant};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(header: &CatalogHeader, counts: &[u32], fill: u8) -> NamedTempFile {
        let mut buf = header.to_bytes().to_vec();
        for &count in counts {
            let mut entry = [0u8; 4];
            header.endianness.write_u32(&mut entry, count);
            buf.extend_from_slice(&entry);
        }
        let total: u32 = counts.iter().sum();
        buf.resize(buf.len() + total as usize * header.variant.record_size(), fill);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&buf).unwrap();
        file.flush().unwrap();
        file
    }

    fn header(endianness: Endianness) -> CatalogHeader {
        CatalogHeader {
            endianness,
            ..CatalogHeader::new(RecordVariant::Star8, 1, MagnitudeTable::new(0, 3100, 31))
        }
    }

    #[test]
    fn test_open_valid_catalog() {
        let mut counts = vec![0u32; 80];
        counts[5] = 3;
        counts[79] = 2;
        let file = write_catalog(&header(Endianness::Big), &counts, 0x11);

        let reader = CatalogReader::open(file.path()).unwrap();
        assert_eq!(reader.header().variant, RecordVariant::Star8);
        assert_eq!(reader.header().endianness, Endianness::Big);
        assert_eq!(reader.index().total_stars(), 5);
        assert_eq!(reader.file_size(), HEADER_SIZE + 80 * 4 + 40);
        assert_eq!(reader.zone_reads(), 0);

        assert_eq!(reader.zone_bytes(5).unwrap().len(), 24);
        assert!(reader.zone_bytes(6).unwrap().is_empty());
        assert_eq!(reader.zone_bytes(79).unwrap(), &[0x11; 16]);
        assert_eq!(reader.zone_reads(), 3);
    }

    #[test]
    fn test_open_missing_file() {
        let err = CatalogReader::open("/nonexistent/stars_9.cat").unwrap_err();
        assert!(err.is_recoverable());
        let msg = err.to_string();
        assert!(msg.contains("stars_9.cat"), "unexpected error: {}", msg);
    }

    #[test]
    fn test_open_truncated_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 20]).unwrap();
        file.flush().unwrap();

        let msg = CatalogReader::open(file.path()).unwrap_err().to_string();
        assert!(msg.contains("truncated"), "unexpected error: {}", msg);
    }

    #[test]
    fn test_open_bad_magic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x42u8; 64]).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            CatalogReader::open(file.path()),
            Err(CatalogError::CorruptHeader { magic: 0x4242_4242 })
        ));
    }

    #[test]
    fn test_header_only_file_has_zero_index() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&header(Endianness::Little).to_bytes()).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            CatalogReader::open(file.path()),
            Err(CatalogError::ZeroIndexSize)
        ));
    }

    #[test]
    fn test_zone_out_of_range_not_counted() {
        let file = write_catalog(&header(Endianness::Little), &[0u32; 80], 0);
        let reader = CatalogReader::open(file.path()).unwrap();
        assert!(reader.zone_bytes(80).is_err());
        assert_eq!(reader.zone_reads(), 0);
    }
}

//! Zone index: record count and byte range of every zone.
//!
//! The index table follows the header as one `u32` record count per zone.
//! Record data follows the table in zone order, so byte offsets are running
//! sums of `count · record_size` and are never stored in the file.

use super::header::{CatalogHeader, HEADER_SIZE};
use crate::error::{CatalogError, Result};
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct ZoneIndex {
    /// `starts[z]..starts[z + 1]` are the record numbers of zone `z`.
    starts: Vec<u64>,
    data_offset: usize,
    record_size: usize,
    mesh_zones: usize,
}

impl ZoneIndex {
    /// Reads the index table of a file whose header is `header`, checking
    /// that every zone's records lie within `bytes`.
    pub fn parse(header: &CatalogHeader, bytes: &[u8]) -> Result<Self> {
        let entries = header.index_entries();
        let table_end = HEADER_SIZE + entries * 4;

        if bytes.len() <= HEADER_SIZE {
            return Err(CatalogError::ZeroIndexSize);
        }
        if bytes.len() < table_end {
            return Err(CatalogError::Truncated {
                expected: table_end as u64,
                actual: bytes.len() as u64,
            });
        }

        let mut starts = Vec::with_capacity(entries + 1);
        let mut total = 0u64;
        starts.push(0);
        for entry in bytes[HEADER_SIZE..table_end].chunks_exact(4) {
            total += u64::from(header.endianness.read_u32(entry));
            starts.push(total);
        }

        let record_size = header.variant.record_size();
        let expected = table_end as u64 + total * record_size as u64;
        if (bytes.len() as u64) < expected {
            return Err(CatalogError::Truncated {
                expected,
                actual: bytes.len() as u64,
            });
        }

        Ok(Self {
            starts,
            data_offset: table_end,
            record_size,
            mesh_zones: header.mesh_zones(),
        })
    }

    /// Builds an index from per-zone record counts, as a writer lays it out.
    pub fn from_counts(header: &CatalogHeader, counts: &[u32]) -> Self {
        let mut starts = Vec::with_capacity(counts.len() + 1);
        let mut total = 0u64;
        starts.push(0);
        for &count in counts {
            total += u64::from(count);
            starts.push(total);
        }
        Self {
            starts,
            data_offset: HEADER_SIZE + counts.len() * 4,
            record_size: header.variant.record_size(),
            mesh_zones: header.mesh_zones(),
        }
    }

    /// Index entries, including the global zone.
    pub fn len(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mesh_zones(&self) -> usize {
        self.mesh_zones
    }

    /// Index of the extra zone holding stars outside the mesh, if present.
    pub fn global_zone(&self) -> Option<usize> {
        (self.len() > self.mesh_zones).then_some(self.mesh_zones)
    }

    pub fn star_count(&self, zone: usize) -> usize {
        (self.starts[zone + 1] - self.starts[zone]) as usize
    }

    pub fn total_stars(&self) -> u64 {
        self.starts[self.len()]
    }

    /// Byte range of `zone`'s records within the file.
    pub fn byte_range(&self, zone: usize) -> Result<Range<usize>> {
        if zone >= self.len() {
            return Err(CatalogError::ZoneOutOfRange {
                zone,
                zones: self.len(),
            });
        }
        let start = self.data_offset + self.starts[zone] as usize * self.record_size;
        Ok(start..start + self.star_count(zone) * self.record_size)
    }

    /// Total size of a file with this index.
    pub fn file_size(&self) -> u64 {
        self.data_offset as u64 + self.total_stars() * self.record_size as u64
    }
}

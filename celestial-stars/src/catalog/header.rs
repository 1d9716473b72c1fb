//! Catalog file header.
//!
//! ```text
//! offset  size  field
//!      0     4  magic        0x835F040A in the file's byte order
//!      4     4  variant      record format id, see RecordVariant
//!      8     4  major        format major version
//!     12     4  minor        format minor version
//!     16     4  depth        mesh level the zones are defined at
//!     20     4  mag_min      i32, milli-magnitudes
//!     24     4  mag_range    i32, milli-magnitudes
//!     28     4  mag_steps    i32, number of table steps over mag_range
//! ```
//!
//! Little-endian is the native order. A big-endian file stores the same
//! magic, which reads back byte-swapped on a little-endian decode and flags
//! every subsequent multi-byte field for swapping.

use crate::error::{CatalogError, Result};
use crate::mesh::{zone_count, MAX_DEPTH};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;
use std::sync::OnceLock;

pub const CATALOG_MAGIC: u32 = 0x835F_040A;
pub const HEADER_SIZE: usize = 32;
pub const MAGNITUDE_TABLE_SIZE: usize = 4096;

/// Byte order of the multi-byte fields in a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Detects the byte order from the first four bytes of a file.
    pub fn from_magic(bytes: &[u8]) -> Result<Self> {
        let magic = LittleEndian::read_u32(bytes);
        if magic == CATALOG_MAGIC {
            Ok(Self::Little)
        } else if magic == CATALOG_MAGIC.swap_bytes() {
            Ok(Self::Big)
        } else {
            Err(CatalogError::CorruptHeader { magic })
        }
    }

    /// `true` when fields must be swapped relative to the native order.
    pub fn is_foreign(self) -> bool {
        self == Self::Big
    }

    #[inline]
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(buf),
            Self::Big => BigEndian::read_u16(buf),
        }
    }

    #[inline]
    pub fn read_i16(self, buf: &[u8]) -> i16 {
        self.read_u16(buf) as i16
    }

    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(buf),
            Self::Big => BigEndian::read_u32(buf),
        }
    }

    #[inline]
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        self.read_u32(buf) as i32
    }

    #[inline]
    pub fn read_u64(self, buf: &[u8]) -> u64 {
        match self {
            Self::Little => LittleEndian::read_u64(buf),
            Self::Big => BigEndian::read_u64(buf),
        }
    }

    pub fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            Self::Little => LittleEndian::write_u16(buf, value),
            Self::Big => BigEndian::write_u16(buf, value),
        }
    }

    pub fn write_i16(self, buf: &mut [u8], value: i16) {
        self.write_u16(buf, value as u16)
    }

    pub fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Self::Little => LittleEndian::write_u32(buf, value),
            Self::Big => BigEndian::write_u32(buf, value),
        }
    }

    pub fn write_i32(self, buf: &mut [u8], value: i32) {
        self.write_u32(buf, value as u32)
    }

    pub fn write_u64(self, buf: &mut [u8], value: u64) {
        match self {
            Self::Little => LittleEndian::write_u64(buf, value),
            Self::Big => BigEndian::write_u64(buf, value),
        }
    }
}

/// Record layout, fixed when the header is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordVariant {
    /// 32 bytes: 32-bit local coordinates, Hipparcos cross-reference,
    /// proper motion and parallax.
    Star32,
    /// 16 bytes: 20-bit local coordinates, 14-bit proper motion.
    Star16,
    /// 8 bytes: 18-bit local coordinates.
    Star8,
    /// 32 bytes: fixed-point local coordinates, Gaia source id, astrometry.
    Gaia32,
    /// 16 bytes: ra/dec in milli-arcseconds.
    Gaia16,
    /// 8 bytes: ra/dec in 24-bit fields at 100 mas resolution.
    Gaia8,
}

impl RecordVariant {
    pub const ALL: [Self; 6] = [
        Self::Star32,
        Self::Star16,
        Self::Star8,
        Self::Gaia32,
        Self::Gaia16,
        Self::Gaia8,
    ];

    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Star32),
            1 => Ok(Self::Star16),
            2 => Ok(Self::Star8),
            10 => Ok(Self::Gaia32),
            11 => Ok(Self::Gaia16),
            12 => Ok(Self::Gaia8),
            other => Err(CatalogError::UnsupportedFormat { variant: other }),
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Self::Star32 => 0,
            Self::Star16 => 1,
            Self::Star8 => 2,
            Self::Gaia32 => 10,
            Self::Gaia16 => 11,
            Self::Gaia8 => 12,
        }
    }

    pub fn record_size(self) -> usize {
        match self {
            Self::Star32 | Self::Gaia32 => 32,
            Self::Star16 | Self::Gaia16 => 16,
            Self::Star8 | Self::Gaia8 => 8,
        }
    }

    /// Width of the packed local coordinates for variants scaled per zone.
    pub fn coordinate_bits(self) -> Option<u32> {
        match self {
            Self::Star32 => Some(32),
            Self::Star16 => Some(20),
            Self::Star8 => Some(18),
            Self::Gaia32 | Self::Gaia16 | Self::Gaia8 => None,
        }
    }

    /// Largest magnitude code the record can hold.
    pub fn max_mag_code(self) -> u32 {
        match self {
            Self::Star32 => 0xff,
            Self::Star16 | Self::Star8 => 0x1f,
            Self::Gaia32 | Self::Gaia16 => (MAGNITUDE_TABLE_SIZE - 1) as u32,
            Self::Gaia8 => 0x1ff,
        }
    }

    /// Variants storing ra/dec directly carry one extra zone, after the mesh
    /// zones, for stars not assigned to any triangle.
    pub fn has_global_zone(self) -> bool {
        matches!(self, Self::Gaia16 | Self::Gaia8)
    }

    /// Whether positions are reconstructed from a zone's tangent basis.
    pub fn uses_local_basis(self) -> bool {
        matches!(self, Self::Star32 | Self::Star16 | Self::Star8 | Self::Gaia32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Star32 => "star32",
            Self::Star16 => "star16",
            Self::Star8 => "star8",
            Self::Gaia32 => "gaia32",
            Self::Gaia16 => "gaia16",
            Self::Gaia8 => "gaia8",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for RecordVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name(), self.record_size())
    }
}

/// Linear mapping from packed magnitude codes to magnitudes:
/// `mag(i) = (min + i·range/steps) / 1000`.
///
/// The 4096-entry lookup table is materialized on first use.
#[derive(Debug)]
pub struct MagnitudeTable {
    min_mmag: i32,
    range_mmag: i32,
    steps: i32,
    table: OnceLock<Box<[f32]>>,
}

impl Clone for MagnitudeTable {
    fn clone(&self) -> Self {
        Self::new(self.min_mmag, self.range_mmag, self.steps)
    }
}

impl PartialEq for MagnitudeTable {
    fn eq(&self, other: &Self) -> bool {
        self.min_mmag == other.min_mmag
            && self.range_mmag == other.range_mmag
            && self.steps == other.steps
    }
}

impl MagnitudeTable {
    pub fn new(min_mmag: i32, range_mmag: i32, steps: i32) -> Self {
        Self {
            min_mmag,
            range_mmag,
            steps,
            table: OnceLock::new(),
        }
    }

    /// Table spanning `min..min + range` magnitudes in `steps` steps.
    pub fn from_magnitudes(min: f32, range: f32, steps: i32) -> Self {
        Self::new(
            (min * 1000.0).round() as i32,
            (range * 1000.0).round() as i32,
            steps,
        )
    }

    pub fn min_mmag(&self) -> i32 {
        self.min_mmag
    }

    pub fn range_mmag(&self) -> i32 {
        self.range_mmag
    }

    pub fn steps(&self) -> i32 {
        self.steps
    }

    /// Brightest representable magnitude.
    pub fn min_mag(&self) -> f32 {
        self.min_mmag as f32 / 1000.0
    }

    /// Faintest magnitude reached by the declared steps.
    pub fn max_mag(&self) -> f32 {
        (self.min_mmag + self.range_mmag) as f32 / 1000.0
    }

    /// Magnitude for a packed code. Codes beyond the table clamp to its end.
    #[inline]
    pub fn magnitude(&self, code: u32) -> f32 {
        let table = self.table.get_or_init(|| self.build());
        table[(code as usize).min(MAGNITUDE_TABLE_SIZE - 1)]
    }

    /// Nearest code for `mag`, limited to `max_code`.
    pub fn encode(&self, mag: f32, max_code: u32) -> u32 {
        let step = self.range_mmag as f64 / self.steps as f64;
        let code = ((mag as f64 * 1000.0 - self.min_mmag as f64) / step).round();
        code.clamp(0.0, max_code as f64) as u32
    }

    fn build(&self) -> Box<[f32]> {
        let step = self.range_mmag as f64 / self.steps as f64;
        (0..MAGNITUDE_TABLE_SIZE)
            .map(|i| ((self.min_mmag as f64 + i as f64 * step) / 1000.0) as f32)
            .collect()
    }
}

/// Parsed catalog header.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogHeader {
    pub endianness: Endianness,
    pub variant: RecordVariant,
    pub major: u32,
    pub minor: u32,
    pub depth: u32,
    pub magnitudes: MagnitudeTable,
}

impl CatalogHeader {
    pub fn new(variant: RecordVariant, depth: u32, magnitudes: MagnitudeTable) -> Self {
        Self {
            endianness: Endianness::Little,
            variant,
            major: 1,
            minor: 0,
            depth,
            magnitudes,
        }
    }

    /// Parses and validates the first [`HEADER_SIZE`] bytes of a file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CatalogError::Truncated {
                expected: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let endianness = Endianness::from_magic(&bytes[0..4])?;
        let read_u32 = |offset: usize| endianness.read_u32(&bytes[offset..offset + 4]);
        let read_i32 = |offset: usize| endianness.read_i32(&bytes[offset..offset + 4]);

        let variant = RecordVariant::from_id(read_u32(4))?;
        let major = read_u32(8);
        let minor = read_u32(12);
        let depth = read_u32(16);
        if depth > MAX_DEPTH {
            return Err(CatalogError::UnsupportedDepth {
                depth,
                max: MAX_DEPTH,
            });
        }

        let mag_min = read_i32(20);
        let mag_range = read_i32(24);
        let mag_steps = read_i32(28);
        if mag_steps <= 0 {
            return Err(CatalogError::invalid_header(format!(
                "magnitude table needs a positive step count, got {}",
                mag_steps
            )));
        }

        Ok(Self {
            endianness,
            variant,
            major,
            minor,
            depth,
            magnitudes: MagnitudeTable::new(mag_min, mag_range, mag_steps),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        let e = self.endianness;
        e.write_u32(&mut bytes[0..4], CATALOG_MAGIC);
        e.write_u32(&mut bytes[4..8], self.variant.id());
        e.write_u32(&mut bytes[8..12], self.major);
        e.write_u32(&mut bytes[12..16], self.minor);
        e.write_u32(&mut bytes[16..20], self.depth);
        e.write_i32(&mut bytes[20..24], self.magnitudes.min_mmag());
        e.write_i32(&mut bytes[24..28], self.magnitudes.range_mmag());
        e.write_i32(&mut bytes[28..32], self.magnitudes.steps());
        bytes
    }

    /// Mesh zones at this catalog's depth.
    pub fn mesh_zones(&self) -> usize {
        zone_count(self.depth)
    }

    /// Entries in the zone index, including the global zone if any.
    pub fn index_entries(&self) -> usize {
        self.mesh_zones() + usize::from(self.variant.has_global_zone())
    }
}

impl fmt::Display for CatalogHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Record format: {}", self.variant)?;
        writeln!(f, "Version: {}.{}", self.major, self.minor)?;
        writeln!(f, "Byte order: {:?}", self.endianness)?;
        writeln!(f, "Mesh depth: {} ({} zones)", self.depth, self.mesh_zones())?;
        write!(
            f,
            "Magnitudes: {:.2} .. {:.2} in {} steps",
            self.magnitudes.min_mag(),
            self.magnitudes.max_mag(),
            self.magnitudes.steps()
        )
    }
}

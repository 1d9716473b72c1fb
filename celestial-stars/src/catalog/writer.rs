//! Catalog file builder.
//!
//! Assigns stars to mesh zones, orders each zone brightest first and writes
//! header, index and packed records in either byte order.

use super::header::{CatalogHeader, Endianness, MagnitudeTable, RecordVariant};
use super::index::ZoneIndex;
use super::record::{encode_record, ZoneBasis};
use crate::error::{CatalogError, Result};
use crate::geometry::direction_deg;
use crate::mesh::Mesh;
use crate::star::{code_from_b_v, Astrometry, DecodedStar};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// One input star, J2000 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StarEntry {
    pub ra: f64,
    pub dec: f64,
    pub mag: f32,
    pub b_v: f32,
    pub hip: Option<u32>,
    /// Proper motion `(ra·cos δ, dec)` in mas/yr.
    pub pm: Option<(f32, f32)>,
    /// Parallax in mas.
    pub parallax: Option<f32>,
}

impl StarEntry {
    pub fn new(ra: f64, dec: f64, mag: f32) -> Self {
        Self {
            ra,
            dec,
            mag,
            ..Self::default()
        }
    }

    fn to_star(self) -> DecodedStar {
        let astrometry = (self.pm.is_some() || self.parallax.is_some()).then(|| {
            let (pm_ra, pm_dec) = self.pm.unwrap_or_default();
            Astrometry {
                pm_ra,
                pm_dec,
                parallax: self.parallax.unwrap_or_default(),
                source_id: None,
            }
        });
        DecodedStar {
            position: direction_deg(self.ra, self.dec),
            mag: self.mag,
            color: code_from_b_v(self.b_v),
            hip: self.hip,
            astrometry,
        }
    }
}

pub struct CatalogWriter {
    header: CatalogHeader,
    mesh: Arc<Mesh>,
    zones: Vec<Vec<DecodedStar>>,
}

impl CatalogWriter {
    /// Writer for a catalog of `variant` records at mesh `depth`.
    pub fn new(variant: RecordVariant, depth: u32, magnitudes: MagnitudeTable) -> Result<Self> {
        Self::with_mesh(variant, Arc::new(Mesh::build(depth)?), depth, magnitudes)
    }

    /// Writer sharing an existing mesh, which must reach `depth`.
    pub fn with_mesh(
        variant: RecordVariant,
        mesh: Arc<Mesh>,
        depth: u32,
        magnitudes: MagnitudeTable,
    ) -> Result<Self> {
        if depth > mesh.depth() {
            return Err(CatalogError::DepthMismatch {
                catalog: depth,
                mesh: mesh.depth(),
            });
        }
        let header = CatalogHeader::new(variant, depth, magnitudes);
        let zones = vec![Vec::new(); header.index_entries()];
        Ok(Self { header, mesh, zones })
    }

    /// Selects the byte order of the written file.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.header.endianness = endianness;
        self
    }

    pub fn header(&self) -> &CatalogHeader {
        &self.header
    }

    /// Adds a star to the zone containing it; returns that zone.
    pub fn add(&mut self, entry: &StarEntry) -> usize {
        let star = entry.to_star();
        let zone = self.mesh.locate(&star.position, self.header.depth);
        self.zones[zone].push(star);
        zone
    }

    /// Adds a star to the global zone of an ra/dec variant.
    pub fn add_global(&mut self, entry: &StarEntry) -> Result<usize> {
        if !self.header.variant.has_global_zone() {
            return Err(CatalogError::ZoneOutOfRange {
                zone: self.header.mesh_zones(),
                zones: self.header.mesh_zones(),
            });
        }
        let zone = self.header.mesh_zones();
        self.zones[zone].push(entry.to_star());
        Ok(zone)
    }

    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a StarEntry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    pub fn star_count(&self) -> usize {
        self.zones.iter().map(Vec::len).sum()
    }

    /// Serialized catalog.
    pub fn to_bytes(&self) -> Vec<u8> {
        let variant = self.header.variant;
        let e = self.header.endianness;
        let size = variant.record_size();
        let counts: Vec<u32> = self.zones.iter().map(|z| z.len() as u32).collect();
        let index = ZoneIndex::from_counts(&self.header, &counts);

        let mut bytes = Vec::with_capacity(index.file_size() as usize);
        bytes.extend_from_slice(&self.header.to_bytes());
        for &count in &counts {
            let mut entry = [0u8; 4];
            e.write_u32(&mut entry, count);
            bytes.extend_from_slice(&entry);
        }

        let mut record = vec![0u8; size];
        for (zone, stars) in self.zones.iter().enumerate() {
            let basis = if zone < self.header.mesh_zones() {
                ZoneBasis::for_triangle(self.mesh.triangle(self.header.depth, zone), variant)
            } else {
                ZoneBasis::global()
            };
            let mut sorted = stars.clone();
            sorted.sort_by(|a, b| a.mag.total_cmp(&b.mag));
            for star in &sorted {
                encode_record(variant, e, star, &basis, &self.header.magnitudes, &mut record);
                bytes.extend_from_slice(&record);
            }
        }
        bytes
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        out.write_all(&self.to_bytes())?;
        out.flush()?;
        Ok(())
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CatalogError::open(path, e))?;
        self.write_to(BufWriter::new(file))?;
        log::info!(
            "Wrote {} stars to {:?} ({}, depth {}, {:?})",
            self.star_count(),
            path,
            self.header.variant.name(),
            self.header.depth,
            self.header.endianness
        );
        Ok(())
    }
}

//! One catalog layer: a reader, its mesh and a per-zone decode cache.

use crate::catalog::{decode_records, CatalogHeader, CatalogReader, ZoneBasis};
use crate::error::{CatalogError, Result};
use crate::mesh::Mesh;
use crate::star::DecodedStar;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// What happens to decoded zones when the caller asks to free memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Decode every zone at open time and keep it for the component's
    /// lifetime. Meant for the small, bright layers.
    Retain,
    /// Decode zones on first access; [`CatalogComponent::free_mem`] drops
    /// them.
    #[default]
    EvictOnDemand,
}

/// A decoded zone. Shared so that evicting the cache never invalidates
/// stars a caller already holds.
pub type ZoneStars = Arc<[DecodedStar]>;

pub struct CatalogComponent {
    reader: CatalogReader,
    mesh: Arc<Mesh>,
    retention: RetentionPolicy,
    trig_mag: f32,
    cache: RwLock<Vec<Option<ZoneStars>>>,
}

impl CatalogComponent {
    /// Opens the catalog at `path` against a shared mesh.
    ///
    /// Queries with a magnitude limit brighter than `trig_mag` skip the
    /// layer; it defaults to the brightest magnitude the file can hold. A
    /// [`RetentionPolicy::Retain`] layer is fully decoded before returning.
    ///
    /// # Errors
    /// Everything [`CatalogReader::open`] reports, plus `DepthMismatch` if
    /// the file's zones are finer than the mesh.
    pub fn open(
        path: impl AsRef<Path>,
        mesh: Arc<Mesh>,
        retention: RetentionPolicy,
        trig_mag: Option<f32>,
    ) -> Result<Self> {
        Self::from_reader(CatalogReader::open(path)?, mesh, retention, trig_mag)
    }

    /// Wraps an already opened reader; see [`open`](Self::open).
    pub fn from_reader(
        reader: CatalogReader,
        mesh: Arc<Mesh>,
        retention: RetentionPolicy,
        trig_mag: Option<f32>,
    ) -> Result<Self> {
        let header = reader.header();
        if header.depth > mesh.depth() {
            return Err(CatalogError::DepthMismatch {
                catalog: header.depth,
                mesh: mesh.depth(),
            });
        }

        let trig_mag = trig_mag.unwrap_or_else(|| header.magnitudes.min_mag());
        let zones = reader.index().len();
        let component = Self {
            reader,
            mesh,
            retention,
            trig_mag,
            cache: RwLock::new(vec![None; zones]),
        };

        log::info!(
            "Opened catalog layer {:?}: {}, depth {}, {} stars, trig mag {:.2}, {:?}",
            component.path(),
            component.header().variant.name(),
            component.depth(),
            component.star_count(),
            trig_mag,
            retention
        );

        if retention == RetentionPolicy::Retain {
            component.load_static_stars()?;
        }
        Ok(component)
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    pub fn header(&self) -> &CatalogHeader {
        self.reader.header()
    }

    /// Mesh level the layer's zones are defined at.
    pub fn depth(&self) -> u32 {
        self.reader.header().depth
    }

    pub fn trig_mag(&self) -> f32 {
        self.trig_mag
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Whether a query down to `mag_limit` can find anything in this layer.
    pub fn is_relevant(&self, mag_limit: f64) -> bool {
        f64::from(self.trig_mag) <= mag_limit
    }

    pub fn zone_count(&self) -> usize {
        self.reader.index().len()
    }

    pub fn global_zone(&self) -> Option<usize> {
        self.reader.index().global_zone()
    }

    pub fn star_count(&self) -> u64 {
        self.reader.index().total_stars()
    }

    /// Zones read from the file so far, cache hits excluded.
    pub fn zone_reads(&self) -> u64 {
        self.reader.zone_reads()
    }

    /// Zones currently held decoded.
    pub fn cached_zones(&self) -> usize {
        self.cache.read().iter().filter(|z| z.is_some()).count()
    }

    /// Decoded stars of `zone`, from the cache or freshly read.
    pub fn get_zone(&self, zone: usize) -> Result<ZoneStars> {
        if let Some(stars) = self.cache.read().get(zone).and_then(Option::as_ref) {
            return Ok(Arc::clone(stars));
        }

        let decoded = self.decode_zone(zone)?;
        let mut cache = self.cache.write();
        // A concurrent reader may have decoded the same zone meanwhile.
        let slot = &mut cache[zone];
        Ok(Arc::clone(slot.get_or_insert(decoded)))
    }

    fn decode_zone(&self, zone: usize) -> Result<ZoneStars> {
        let bytes = self.reader.zone_bytes(zone)?;
        let header = self.reader.header();
        let basis = if zone < self.reader.index().mesh_zones() {
            ZoneBasis::for_triangle(self.mesh.triangle(header.depth, zone), header.variant)
        } else {
            ZoneBasis::global()
        };
        let stars = decode_records(
            header.variant,
            header.endianness,
            bytes,
            &basis,
            &header.magnitudes,
        );
        log::debug!(
            "Decoded zone {} of {:?}: {} stars",
            zone,
            self.path(),
            stars.len()
        );
        Ok(stars.into())
    }

    /// Decodes every zone once. Zones already cached are kept.
    pub fn load_static_stars(&self) -> Result<()> {
        for zone in 0..self.zone_count() {
            self.get_zone(zone)?;
        }
        log::debug!(
            "Loaded {} stars of {:?} into memory",
            self.star_count(),
            self.path()
        );
        Ok(())
    }

    /// Drops decoded zones of an evictable layer; returns how many were
    /// dropped. Retained layers are left untouched.
    pub fn free_mem(&self) -> usize {
        if self.retention == RetentionPolicy::Retain {
            return 0;
        }
        let mut cache = self.cache.write();
        let freed = cache.iter_mut().filter_map(Option::take).count();
        if freed > 0 {
            log::debug!("Evicted {} zones of {:?}", freed, self.path());
        }
        freed
    }
}

impl fmt::Debug for CatalogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogComponent")
            .field("reader", &self.reader)
            .field("retention", &self.retention)
            .field("trig_mag", &self.trig_mag)
            .finish()
    }
}

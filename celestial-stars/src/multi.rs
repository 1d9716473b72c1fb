//! Layered catalog: several components sharing one mesh.
//!
//! Layers are ordered brightest first. Each is stored at its own mesh depth
//! and declares a trigger magnitude; a query only touches the layers whose
//! trigger magnitude its limit reaches, and only searches the mesh as deep
//! as the deepest of those.

use crate::catalog::CatalogReader;
use crate::component::{CatalogComponent, RetentionPolicy};
use crate::config::{CatalogConfig, LayerConfig};
use crate::error::{CatalogError, Result};
use crate::geometry::{direction_deg, RotationMatrix3, Vector3};
use crate::mesh::{Mesh, ZoneId};
use crate::query::{StarQuery, ZoneSelection};
use crate::star::DecodedStar;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub struct MultiLevelCatalog {
    mesh: Arc<Mesh>,
    components: Vec<CatalogComponent>,
}

impl MultiLevelCatalog {
    /// Opens the layers described by `config`.
    ///
    /// A layer that fails to open is logged and left out; the catalog keeps
    /// working with the remaining layers.
    ///
    /// # Errors
    /// `Config` if the configuration lists no layers or none of them opens.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        if config.layers.is_empty() {
            return Err(CatalogError::config("no catalog layers configured"));
        }

        let mut opened = Vec::with_capacity(config.layers.len());
        for layer in &config.layers {
            match CatalogReader::open(&layer.path) {
                Ok(reader) => opened.push((reader, layer)),
                Err(e) => disable_layer(&layer.path, &e),
            }
        }

        let depth = opened
            .iter()
            .map(|(reader, _)| reader.header().depth)
            .max()
            .unwrap_or(0);
        let mesh = Arc::new(Mesh::build(depth)?);

        let mut components = Vec::with_capacity(opened.len());
        for (reader, layer) in opened {
            let path = reader.path().to_path_buf();
            let component =
                CatalogComponent::from_reader(reader, Arc::clone(&mesh), layer.retention, layer.trig_mag);
            match component {
                Ok(component) => components.push(component),
                Err(e) => disable_layer(&path, &e),
            }
        }

        if components.is_empty() {
            return Err(CatalogError::config(format!(
                "none of the {} configured catalog layers could be opened",
                config.layers.len()
            )));
        }

        log::info!(
            "Opened {} of {} catalog layers, mesh depth {}",
            components.len(),
            config.layers.len(),
            depth
        );
        Ok(Self { mesh, components })
    }

    /// Opens layers from `(path, retention)` pairs with default trigger
    /// magnitudes.
    pub fn open_paths<P: AsRef<Path>>(layers: &[(P, RetentionPolicy)]) -> Result<Self> {
        let config = CatalogConfig {
            layers: layers
                .iter()
                .map(|(path, retention)| LayerConfig::new(path.as_ref(), *retention))
                .collect(),
        };
        Self::from_config(&config)
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn components(&self) -> &[CatalogComponent] {
        &self.components
    }

    pub fn star_count(&self) -> u64 {
        self.components.iter().map(CatalogComponent::star_count).sum()
    }

    /// Stars within `radius` radians of `center = (ra, dec)` (radians, J2000)
    /// down to `mag_limit`, with `precession` applied to returned positions.
    pub fn select_stars(
        &self,
        center: (f64, f64),
        radius: f64,
        mag_limit: f64,
        precession: Option<&RotationMatrix3>,
    ) -> Result<Vec<DecodedStar>> {
        let mut query = StarQuery::new(center.0, center.1, radius, mag_limit);
        query.precession = precession.copied();
        self.query(&query)
    }

    /// Runs `query` over every relevant layer. Results are in layer order,
    /// then zone order, then record order.
    pub fn query(&self, query: &StarQuery) -> Result<Vec<DecodedStar>> {
        let relevant: Vec<&CatalogComponent> = self
            .components
            .iter()
            .filter(|c| c.is_relevant(query.mag_limit))
            .collect();
        let Some(max_level) = relevant.iter().map(|c| c.depth()).max() else {
            log::trace!("No layer reaches magnitude {:.2}", query.mag_limit);
            return Ok(Vec::new());
        };

        let selection = ZoneSelection::search(&self.mesh, &query.direction, query.radius, max_level);
        let mut stars = Vec::new();
        let mut zones = 0;
        for component in relevant {
            zones += query.collect_from(component, &selection, &mut stars)?;
        }

        log::trace!(
            "Query radius {:.5} rad, mag {:.2}: {} zone entries to level {}, {} zones read, {} stars",
            query.radius,
            query.mag_limit,
            selection.zone_entries(),
            max_level,
            zones,
            stars.len()
        );
        Ok(stars)
    }

    /// Zone classification for a cap, searched to `max_level` (clamped to
    /// the mesh depth).
    pub fn select_zones(&self, direction: &Vector3, radius: f64, max_level: u32) -> ZoneSelection {
        ZoneSelection::search(&self.mesh, direction, radius, max_level)
    }

    /// Zone at `level` containing `(ra_deg, dec_deg)`.
    pub fn zone_at(&self, ra_deg: f64, dec_deg: f64, level: u32) -> Result<ZoneId> {
        if level > self.mesh.depth() {
            return Err(CatalogError::UnsupportedDepth {
                depth: level,
                max: self.mesh.depth(),
            });
        }
        let index = self.mesh.locate(&direction_deg(ra_deg, dec_deg), level);
        Ok(ZoneId::new(level, index as u32))
    }

    /// Drops decoded zones of every evictable layer. Returns the number of
    /// zones dropped.
    pub fn free_mem(&self) -> usize {
        self.components.iter().map(CatalogComponent::free_mem).sum()
    }
}

impl fmt::Debug for MultiLevelCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiLevelCatalog")
            .field("mesh_depth", &self.mesh.depth())
            .field("components", &self.components)
            .finish()
    }
}

fn disable_layer(path: &Path, error: &CatalogError) {
    if error.is_recoverable() {
        log::warn!("Catalog layer {:?} unavailable, disabled: {}", path, error);
    } else {
        log::warn!("Catalog layer {:?} is invalid, disabled: {}", path, error);
    }
}

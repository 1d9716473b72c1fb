//! Geodesic-mesh star catalog engine for finder charts.
//!
//! Star catalogs are stored as compact binary files whose records are grouped
//! by the zones of a recursively subdivided icosahedron. A layered catalog
//! combines several such files, from a small bright layer kept in memory to
//! faint layers with hundreds of millions of records decoded zone by zone on
//! demand, and answers "which stars down to magnitude `m` lie within radius
//! `r` of this direction" by a recursive spherical-cap search over the mesh.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`mesh`] | [`Mesh`] construction, [`ZoneId`] numbering, point lookup, [`SphericalCap`](mesh::SphericalCap) |
//! | [`catalog`] | File header, zone index, packed record codecs, [`CatalogReader`](catalog::CatalogReader) and [`CatalogWriter`](catalog::CatalogWriter) |
//! | [`component`] | [`CatalogComponent`]: one layer with its zone cache and [`RetentionPolicy`] |
//! | [`query`] | [`ZoneSelection`](query::ZoneSelection) cap search and [`StarQuery`] |
//! | [`multi`] | [`MultiLevelCatalog`]: layers sharing one mesh, `select_stars` |
//! | [`config`] | JSON layer configuration |
//! | [`star`] | [`DecodedStar`] and color helpers |
//! | [`geometry`] | [`Vector3`](geometry::Vector3), [`RotationMatrix3`](geometry::RotationMatrix3), precession |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_stars::{MultiLevelCatalog, RetentionPolicy};
//! use celestial_stars::geometry::RotationMatrix3;
//!
//! let catalog = MultiLevelCatalog::open_paths(&[
//!     ("stars_0.cat", RetentionPolicy::Retain),
//!     ("stars_1.cat", RetentionPolicy::EvictOnDemand),
//! ])?;
//!
//! let precession = RotationMatrix3::precession_from_j2000(2025.0);
//! let stars = catalog.select_stars(
//!     (83.633_f64.to_radians(), (-5.375_f64).to_radians()),
//!     2.0_f64.to_radians(),
//!     9.5,
//!     Some(&precession),
//! )?;
//!
//! // Between charts, release decoded zones of the faint layers.
//! catalog.free_mem();
//! ```
//!
//! # Features
//!
//! - **`cli`**: enables the `starmesh` binary for inspecting, querying and
//!   building catalog files from the command line.

pub mod catalog;
pub mod component;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod multi;
pub mod query;
pub mod star;

pub use component::{CatalogComponent, RetentionPolicy, ZoneStars};
pub use config::{CatalogConfig, LayerConfig};
pub use error::{CatalogError, Result};
pub use mesh::{Mesh, ZoneId};
pub use multi::MultiLevelCatalog;
pub use query::StarQuery;
pub use star::{Astrometry, DecodedStar};

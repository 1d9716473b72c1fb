//! Star selection by direction, radius and magnitude.
//!
//! - [`search`] classifies mesh zones against a spherical cap
//! - [`StarQuery`] describes one request and gathers matching stars from a
//!   catalog layer using a [`ZoneSelection`]

pub mod search;

pub use search::{LevelZones, ZoneSelection};

use crate::component::CatalogComponent;
use crate::error::Result;
use crate::geometry::{RotationMatrix3, Vector3};
use crate::star::DecodedStar;

/// Parameters for a star selection.
#[derive(Debug, Clone)]
pub struct StarQuery {
    /// Cap center, J2000 unit vector.
    pub direction: Vector3,
    /// Cap radius in radians.
    pub radius: f64,
    /// Faintest magnitude returned (inclusive).
    pub mag_limit: f64,
    /// Applied to the positions of returned stars.
    pub precession: Option<RotationMatrix3>,
}

impl StarQuery {
    /// Query around `(ra, dec)` in radians.
    pub fn new(ra: f64, dec: f64, radius: f64, mag_limit: f64) -> Self {
        Self {
            direction: Vector3::from_spherical(ra, dec),
            radius,
            mag_limit,
            precession: None,
        }
    }

    /// Query around `(ra, dec)` in degrees with a radius in degrees.
    pub fn from_degrees(ra_deg: f64, dec_deg: f64, radius_deg: f64, mag_limit: f64) -> Self {
        Self::new(
            ra_deg.to_radians(),
            dec_deg.to_radians(),
            radius_deg.to_radians(),
            mag_limit,
        )
    }

    pub fn with_precession(mut self, matrix: RotationMatrix3) -> Self {
        self.precession = Some(matrix);
        self
    }

    /// Appends the stars of `component` matching this query to `out`.
    ///
    /// Inside zones are filtered by magnitude only, border zones (and the
    /// global zone, which has no triangle) also by the unpadded radius.
    /// Returns the number of zones visited.
    pub fn collect_from(
        &self,
        component: &CatalogComponent,
        selection: &ZoneSelection,
        out: &mut Vec<DecodedStar>,
    ) -> Result<usize> {
        let depth = component.depth();
        let cos_r = libm::cos(self.radius.max(0.0));
        let whole_sphere = self.radius >= std::f64::consts::PI;

        let mut zones = 0;
        for zone in selection.inside_at(depth) {
            let stars = component.get_zone(zone)?;
            self.push_stars(&stars, None, out);
            zones += 1;
        }

        let bordered = selection.border_at(depth).iter().copied();
        for zone in bordered.chain(component.global_zone()) {
            let stars = component.get_zone(zone)?;
            let cap = (!whole_sphere).then_some(cos_r);
            self.push_stars(&stars, cap, out);
            zones += 1;
        }
        Ok(zones)
    }

    fn push_stars(&self, stars: &[DecodedStar], cos_r: Option<f64>, out: &mut Vec<DecodedStar>) {
        let matching = stars.iter().filter(|s| {
            f64::from(s.mag) <= self.mag_limit
                && cos_r.map_or(true, |c| s.position.dot(&self.direction) > c)
        });
        match &self.precession {
            Some(m) => out.extend(matching.map(|s| s.precessed(m))),
            None => out.extend(matching.copied()),
        }
    }
}

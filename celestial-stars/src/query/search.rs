//! Recursive spherical-cap search over the mesh.
//!
//! The search walks the mesh from the 20 root triangles down to a
//! query-specific `max_level` and sorts every visited node into one of two
//! sets per level:
//!
//! - **inside**: the whole triangle lies within the query radius, so its
//!   stars only need a magnitude test. Recursion stops here.
//! - **border**: the triangle overlaps the cap boundary; its stars must be
//!   tested one by one against the unpadded radius.
//!
//! A node whose center fails the level's padded test is pruned with all its
//! descendants. A node above `max_level` is recorded as border when any of
//! its children was recorded, so layers stored at shallower depths still
//! see it.

use crate::geometry::Vector3;
use crate::mesh::{Mesh, SphericalCap, ZoneId, ROOT_TRIANGLES};

/// Inside and border zones of one mesh level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelZones {
    pub inside: Vec<usize>,
    pub border: Vec<usize>,
}

/// Result of classifying the mesh against one query cap.
#[derive(Debug, Clone)]
pub struct ZoneSelection {
    levels: Vec<LevelZones>,
    direction: Vector3,
    radius: f64,
}

impl ZoneSelection {
    /// Classifies mesh zones against the cap of `radius` radians around
    /// `direction`, down to `max_level` (clamped to the mesh depth).
    pub fn search(mesh: &Mesh, direction: &Vector3, radius: f64, max_level: u32) -> Self {
        let max_level = max_level.min(mesh.depth());
        let direction = direction.normalize();
        let caps: Vec<SphericalCap> = (0..=max_level)
            .map(|level| SphericalCap::new(direction, radius, mesh.max_triangle_size(level)))
            .collect();

        let mut search = CapSearch {
            mesh,
            caps: &caps,
            max_level,
            levels: vec![LevelZones::default(); max_level as usize + 1],
        };

        for root in 0..ROOT_TRIANGLES {
            let triangle = mesh.triangle(0, root);
            if !caps[0].may_intersect(&triangle.center) {
                continue;
            }
            let inside = mesh.corners(triangle).map(|c| caps[0].contains(&c));
            search.visit(0, root, inside);
        }

        Self {
            levels: search.levels,
            direction,
            radius,
        }
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn max_level(&self) -> u32 {
        (self.levels.len() - 1) as u32
    }

    pub fn level(&self, level: u32) -> &LevelZones {
        &self.levels[level as usize]
    }

    /// Zones at `depth` known to lie entirely inside the cap: those recorded
    /// inside at `depth` plus every descendant of zones recorded inside
    /// above it. Zone order is ascending within each source level.
    pub fn inside_at(&self, depth: u32) -> Vec<usize> {
        let depth = depth.min(self.max_level());
        let mut zones = Vec::new();
        for level in 0..depth {
            for &zone in &self.levels[level as usize].inside {
                zones.extend(ZoneId::new(level, zone as u32).descendants_at(depth));
            }
        }
        zones.extend_from_slice(&self.levels[depth as usize].inside);
        zones
    }

    /// Zones at `depth` overlapping the cap boundary.
    pub fn border_at(&self, depth: u32) -> &[usize] {
        &self.levels[depth.min(self.max_level()) as usize].border
    }

    /// Total number of zone entries recorded over all levels.
    pub fn zone_entries(&self) -> usize {
        self.levels
            .iter()
            .map(|l| l.inside.len() + l.border.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.zone_entries() == 0
    }
}

struct CapSearch<'a> {
    mesh: &'a Mesh,
    caps: &'a [SphericalCap],
    max_level: u32,
    levels: Vec<LevelZones>,
}

impl CapSearch<'_> {
    /// Visits a node whose center already passed the padded test. `inside`
    /// holds the inner-cap flags of its three corners. Returns whether the
    /// node was recorded.
    fn visit(&mut self, level: u32, index: usize, inside: [bool; 3]) -> bool {
        let cap = &self.caps[level as usize];
        let triangle = self.mesh.triangle(level, index);

        if inside.iter().all(|&c| c) && cap.encloses_with_corners(&triangle.center) {
            self.levels[level as usize].inside.push(index);
            return true;
        }
        if level == self.max_level {
            self.levels[level as usize].border.push(index);
            return true;
        }

        // The central child has the edge midpoints (t0, t1, t2) as corners.
        let child_level = level + 1;
        let first = index << 2;
        let mid = self.mesh.triangle(child_level, first + 3);
        let next_cap = &self.caps[child_level as usize];
        let [t0, t1, t2] = self.mesh.corners(mid).map(|p| next_cap.contains(&p));
        let [c0, c1, c2] = inside;
        let child_flags = [[c0, t2, t1], [t2, c1, t0], [t1, t0, c2], [t0, t1, t2]];

        let mut any = false;
        for (k, flags) in child_flags.into_iter().enumerate() {
            let child = first + k;
            if next_cap.may_intersect(&self.mesh.triangle(child_level, child).center) {
                any |= self.visit(child_level, child, flags);
            }
        }
        if any {
            self.levels[level as usize].border.push(index);
        }
        any
    }
}

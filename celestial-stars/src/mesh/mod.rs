//! Recursive geodesic triangulation of the celestial sphere.
//!
//! The mesh starts from an icosahedron with vertices at both celestial poles
//! (20 root triangles) and subdivides every triangle into four, `depth`
//! times. For a parent with corners `(c0, c1, c2)` and edge midpoints
//! `t0 = mid(c1, c2)`, `t1 = mid(c2, c0)`, `t2 = mid(c0, c1)` the children are
//!
//! ```text
//! 0: (c0, t2, t1)   1: (t2, c1, t0)   2: (t1, t0, c2)   3: (t0, t1, t2)
//! ```
//!
//! Child 3 is the central sub-triangle; it inherits the parent's center.
//! All triangles are counter-clockwise seen from outside the sphere.
//!
//! Every node carries a local tangent basis (`center`, `axis0`, `axis1`) used
//! to pack star positions as small integers, its angular size (used to pad
//! search radii) and the tangent-plane extent of its corners (used to derive
//! the packed-coordinate scale). The mesh is built once per catalog and
//! shared through `Arc` by every layer.

pub mod cap;
mod zone;

pub use cap::SphericalCap;
pub use zone::{zone_count, ZoneId, ROOT_TRIANGLES};

use crate::error::{CatalogError, Result};
use crate::geometry::Vector3;
use std::collections::HashMap;

/// Deepest mesh the engine will build. Level 10 already holds ~28 million
/// triangles.
pub const MAX_DEPTH: u32 = 10;

/// One node of the mesh.
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Indices into the mesh vertex table.
    pub corners: [u32; 3],
    pub center: Vector3,
    /// Eastward tangent at `center`.
    pub axis0: Vector3,
    /// Northward tangent at `center`.
    pub axis1: Vector3,
    /// Longest edge, as an angle in radians.
    pub size: f64,
    /// Largest gnomonic tangent-plane coordinate of any corner.
    pub extent: f64,
}

impl Triangle {
    /// Tangent-plane coordinates of `p` in this triangle's basis.
    pub fn project(&self, p: &Vector3) -> (f64, f64) {
        let w = p.dot(&self.center);
        (p.dot(&self.axis0) / w, p.dot(&self.axis1) / w)
    }

    /// Direction for tangent-plane coordinates `(u, v)`.
    pub fn unproject(&self, u: f64, v: f64) -> Vector3 {
        (self.center + self.axis0 * u + self.axis1 * v).normalize()
    }
}

pub struct Mesh {
    depth: u32,
    vertices: Vec<Vector3>,
    levels: Vec<Vec<Triangle>>,
    max_size: Vec<f64>,
}

impl Mesh {
    /// Builds all levels `0..=depth`. Cost is `O(4^depth)`.
    pub fn build(depth: u32) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(CatalogError::UnsupportedDepth {
                depth,
                max: MAX_DEPTH,
            });
        }

        let mut vertices = icosahedron_vertices();
        let roots: Vec<Triangle> = ICOSAHEDRON_FACES
            .iter()
            .map(|&corners| {
                let center = centroid(&vertices, corners);
                make_triangle(&vertices, corners, center)
            })
            .collect();

        let mut levels = Vec::with_capacity(depth as usize + 1);
        levels.push(roots);

        for level in 0..depth as usize {
            let parents = &levels[level];
            let mut children = Vec::with_capacity(parents.len() * 4);
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(parents.len() * 2);

            for parent in parents {
                let [c0, c1, c2] = parent.corners;
                let t0 = midpoint(&mut vertices, &mut midpoints, c1, c2);
                let t1 = midpoint(&mut vertices, &mut midpoints, c2, c0);
                let t2 = midpoint(&mut vertices, &mut midpoints, c0, c1);

                for corners in [[c0, t2, t1], [t2, c1, t0], [t1, t0, c2]] {
                    let center = centroid(&vertices, corners);
                    children.push(make_triangle(&vertices, corners, center));
                }
                children.push(make_triangle(&vertices, [t0, t1, t2], parent.center));
            }
            levels.push(children);
        }

        let max_size = levels
            .iter()
            .map(|tris| tris.iter().map(|t| t.size).fold(0.0, f64::max))
            .collect();

        log::debug!(
            "Built geodesic mesh: depth {}, {} vertices, {} leaf zones",
            depth,
            vertices.len(),
            zone_count(depth)
        );

        Ok(Self {
            depth,
            vertices,
            levels,
            max_size,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn zone_count(&self, level: u32) -> usize {
        zone_count(level)
    }

    /// All triangles of `level`, indexed by zone.
    pub fn triangles(&self, level: u32) -> &[Triangle] {
        &self.levels[level as usize]
    }

    pub fn triangle(&self, level: u32, index: usize) -> &Triangle {
        &self.levels[level as usize][index]
    }

    pub fn vertex(&self, index: u32) -> Vector3 {
        self.vertices[index as usize]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn corners(&self, triangle: &Triangle) -> [Vector3; 3] {
        triangle.corners.map(|i| self.vertices[i as usize])
    }

    /// Largest triangle edge at `level`, in radians.
    pub fn max_triangle_size(&self, level: u32) -> f64 {
        self.max_size[level as usize]
    }

    /// Zone at `level` containing `direction` (need not be normalized).
    ///
    /// Descends from the root triangle containing the direction. Points on a
    /// shared edge resolve to whichever neighbour wins the containment
    /// margin, so every direction maps to exactly one zone. A `level` deeper
    /// than the mesh is clamped to [`depth`](Self::depth).
    pub fn locate(&self, direction: &Vector3, level: u32) -> usize {
        let level = level.min(self.depth);
        let p = direction.normalize();
        let mut best = best_candidate(self, 0, 0..ROOT_TRIANGLES, &p);
        for l in 1..=level {
            let first = best << 2;
            best = best_candidate(self, l, first..first + 4, &p);
        }
        best
    }

    /// Whether `direction` lies inside (or on the boundary of) a triangle.
    pub fn contains(&self, triangle: &Triangle, direction: &Vector3) -> bool {
        self.containment_margin(triangle, direction) >= -1e-12
    }

    /// Smallest signed distance (as a sine) from `p` to the great circles of
    /// the triangle's edges; non-negative inside.
    fn containment_margin(&self, triangle: &Triangle, p: &Vector3) -> f64 {
        let [a, b, c] = self.corners(triangle);
        [(a, b), (b, c), (c, a)]
            .iter()
            .map(|(u, v)| u.cross(v).normalize().dot(p))
            .fold(f64::INFINITY, f64::min)
    }
}

fn best_candidate(mesh: &Mesh, level: u32, range: std::ops::Range<usize>, p: &Vector3) -> usize {
    let triangles = mesh.triangles(level);
    let mut best = range.start;
    let mut best_margin = f64::NEG_INFINITY;
    for index in range {
        let margin = mesh.containment_margin(&triangles[index], p);
        if margin > best_margin {
            best = index;
            best_margin = margin;
        }
    }
    best
}

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 1, 2],
    [0, 2, 3],
    [0, 3, 4],
    [0, 4, 5],
    [0, 5, 1],
    [1, 6, 2],
    [2, 7, 3],
    [3, 8, 4],
    [4, 9, 5],
    [5, 10, 1],
    [6, 7, 2],
    [7, 8, 3],
    [8, 9, 4],
    [9, 10, 5],
    [10, 6, 1],
    [11, 7, 6],
    [11, 8, 7],
    [11, 9, 8],
    [11, 10, 9],
    [11, 6, 10],
];

/// North pole, upper ring at ra = 0°, 72°, ..., lower ring offset by 36°,
/// south pole.
fn icosahedron_vertices() -> Vec<Vector3> {
    let ring_dec = libm::atan(0.5);
    let mut vertices = Vec::with_capacity(12);
    vertices.push(Vector3::z_axis());
    for k in 0..5 {
        vertices.push(Vector3::from_spherical((72.0 * k as f64).to_radians(), ring_dec));
    }
    for k in 0..5 {
        vertices.push(Vector3::from_spherical((36.0 + 72.0 * k as f64).to_radians(), -ring_dec));
    }
    vertices.push(-Vector3::z_axis());
    vertices
}

fn centroid(vertices: &[Vector3], corners: [u32; 3]) -> Vector3 {
    let [a, b, c] = corners.map(|i| vertices[i as usize]);
    (a + b + c).normalize()
}

fn midpoint(
    vertices: &mut Vec<Vector3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = (vertices[a as usize] + vertices[b as usize]).normalize();
        vertices.push(mid);
        (vertices.len() - 1) as u32
    })
}

/// East/north tangent basis at `center`. Only a center on the polar axis
/// has no east direction; that cannot occur for an interior point of a mesh
/// with vertices at the poles, but the x axis stands in if it ever does.
fn local_basis(center: &Vector3) -> (Vector3, Vector3) {
    let east = Vector3::z_axis().cross(center);
    let axis0 = if east.magnitude_squared() > 1e-24 {
        east.normalize()
    } else {
        Vector3::x_axis().cross(center).normalize()
    };
    let axis1 = center.cross(&axis0);
    (axis0, axis1)
}

fn make_triangle(vertices: &[Vector3], corners: [u32; 3], center: Vector3) -> Triangle {
    let (axis0, axis1) = local_basis(&center);
    let pts = corners.map(|i| vertices[i as usize]);

    let size = [(0, 1), (1, 2), (2, 0)]
        .iter()
        .map(|&(i, j)| pts[i].angle_to(&pts[j]))
        .fold(0.0, f64::max);

    let extent = pts
        .iter()
        .map(|p| {
            let w = p.dot(&center);
            (p.dot(&axis0).abs() / w).max(p.dot(&axis1).abs() / w)
        })
        .fold(0.0, f64::max);

    Triangle {
        corners,
        center,
        axis0,
        axis1,
        size,
        extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_level_shape() {
        let mesh = Mesh::build(0).unwrap();
        assert_eq!(mesh.triangles(0).len(), 20);
        assert_eq!(mesh.vertex_count(), 12);
        let expected = libm::acos(1.0 / 5.0_f64.sqrt());
        assert!((mesh.max_triangle_size(0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_level_sizes_and_shared_vertices() {
        let mesh = Mesh::build(3).unwrap();
        for level in 0..=3 {
            assert_eq!(mesh.triangles(level).len(), zone_count(level));
        }
        // Euler: V = 10·4^d + 2 for a subdivided icosahedron.
        assert_eq!(mesh.vertex_count(), 10 * 64 + 2);
    }

    #[test]
    fn test_rejects_excessive_depth() {
        match Mesh::build(MAX_DEPTH + 1) {
            Err(CatalogError::UnsupportedDepth { depth, .. }) => assert_eq!(depth, MAX_DEPTH + 1),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_basis_orthonormal() {
        let mesh = Mesh::build(3).unwrap();
        for level in 0..=3 {
            for t in mesh.triangles(level) {
                assert!((t.center.magnitude() - 1.0).abs() < 1e-12);
                assert!((t.axis0.magnitude() - 1.0).abs() < 1e-12);
                assert!((t.axis1.magnitude() - 1.0).abs() < 1e-12);
                assert!(t.axis0.dot(&t.axis1).abs() < 1e-12);
                assert!(t.axis0.dot(&t.center).abs() < 1e-12);
                assert!(t.axis1.dot(&t.center).abs() < 1e-12);
                assert!(t.axis1.z >= -1e-12, "axis1 should point north");
            }
        }
    }

    #[test]
    fn test_center_is_inside_and_close_to_centroid() {
        let mesh = Mesh::build(3).unwrap();
        for level in 0..=3 {
            for t in mesh.triangles(level) {
                assert!(mesh.contains(t, &t.center));
                let [a, b, c] = mesh.corners(t);
                let centroid = (a + b + c).normalize();
                assert!(centroid.angle_to(&t.center) < 0.1 * t.size);
            }
        }
    }

    #[test]
    fn test_children_shrink() {
        let mesh = Mesh::build(4).unwrap();
        for level in 1..=4 {
            let ratio = mesh.max_triangle_size(level) / mesh.max_triangle_size(level - 1);
            assert!(ratio > 0.45 && ratio < 0.6, "level {} ratio {}", level, ratio);
        }
    }

    #[test]
    fn test_locate_returns_own_center() {
        let mesh = Mesh::build(3).unwrap();
        for level in 0..=3 {
            for (index, t) in mesh.triangles(level).iter().enumerate() {
                assert_eq!(mesh.locate(&t.center, level), index, "level {}", level);
            }
        }
    }

    #[test]
    fn test_locate_consistent_across_levels() {
        let mesh = Mesh::build(4).unwrap();
        let p = Vector3::from_spherical(1.234, -0.456);
        let leaf = mesh.locate(&p, 4);
        for level in 0..4 {
            assert_eq!(mesh.locate(&p, level), leaf >> (2 * (4 - level)));
        }
        assert!(mesh.contains(mesh.triangle(4, leaf), &p));
    }

    #[test]
    fn test_locate_clamps_to_mesh_depth() {
        let mesh = Mesh::build(2).unwrap();
        let p = Vector3::from_spherical(4.0, 0.7);
        let leaf = mesh.locate(&p, 2);
        assert_eq!(mesh.locate(&p, 3), leaf);
        assert_eq!(mesh.locate(&p, MAX_DEPTH + 5), leaf);
    }

    #[test]
    fn test_locate_poles() {
        let mesh = Mesh::build(2).unwrap();
        let north = mesh.locate(&Vector3::z_axis(), 2);
        assert!(mesh.contains(mesh.triangle(2, north), &Vector3::z_axis()));
        let south = mesh.locate(&-Vector3::z_axis(), 2);
        assert!(mesh.contains(mesh.triangle(2, south), &-Vector3::z_axis()));
    }

    #[test]
    fn test_extent_bounds_corners() {
        let mesh = Mesh::build(2).unwrap();
        for t in mesh.triangles(2) {
            for corner in mesh.corners(t) {
                let (u, v) = t.project(&corner);
                assert!(u.abs() <= t.extent + 1e-12);
                assert!(v.abs() <= t.extent + 1e-12);
            }
        }
    }

    #[test]
    fn test_project_unproject() {
        let mesh = Mesh::build(2).unwrap();
        let t = mesh.triangle(2, 100);
        let [a, b, c] = mesh.corners(t);
        let p = (a * 0.2 + b * 0.3 + c * 0.5).normalize();
        let (u, v) = t.project(&p);
        assert!(t.unproject(u, v).angle_to(&p) < 1e-14);
    }
}

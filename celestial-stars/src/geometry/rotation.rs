//! 3x3 rotation matrices for precessing catalog positions.
//!
//! Catalog positions are J2000. A chart drawn for another epoch supplies a
//! precession matrix which is applied to the rectangular star positions of a
//! whole zone at once before the caller re-derives ra/dec.

use super::Vector3;
use std::fmt;

/// Row-major 3x3 matrix. `elements[i][j]` is row `i`, column `j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix3 {
    elements: [[f64; 3]; 3],
}

impl RotationMatrix3 {
    pub fn identity() -> Self {
        Self {
            elements: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn from_array(elements: [[f64; 3]; 3]) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[[f64; 3]; 3] {
        &self.elements
    }

    /// Passive rotation about Z by `psi` radians (ERFA sign convention).
    pub fn from_rotation_z(psi: f64) -> Self {
        let (s, c) = libm::sincos(psi);
        Self::from_array([[c, s, 0.0], [-s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Passive rotation about Y by `theta` radians (ERFA sign convention).
    pub fn from_rotation_y(theta: f64) -> Self {
        let (s, c) = libm::sincos(theta);
        Self::from_array([[c, 0.0, -s], [0.0, 1.0, 0.0], [s, 0.0, c]])
    }

    /// Low-precision IAU 1976 precession from J2000 to `epoch_year`
    /// (Julian years). Adequate for chart plotting; not an astrometric
    /// reduction.
    pub fn precession_from_j2000(epoch_year: f64) -> Self {
        const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);
        let t = (epoch_year - 2000.0) / 100.0;
        let zeta = (2306.2181 + (0.30188 + 0.017998 * t) * t) * t * ARCSEC;
        let z = (2306.2181 + (1.09468 + 0.018203 * t) * t) * t * ARCSEC;
        let theta = (2004.3109 - (0.42665 + 0.041833 * t) * t) * t * ARCSEC;
        Self::from_rotation_z(-z) * Self::from_rotation_y(theta) * Self::from_rotation_z(-zeta)
    }

    pub fn multiply(&self, other: &Self) -> Self {
        let mut result = [[0.0; 3]; 3];
        for (i, row) in result.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3)
                    .map(|k| self.elements[i][k] * other.elements[k][j])
                    .sum();
            }
        }
        Self::from_array(result)
    }

    pub fn transpose(&self) -> Self {
        let e = &self.elements;
        Self::from_array([
            [e[0][0], e[1][0], e[2][0]],
            [e[0][1], e[1][1], e[2][1]],
            [e[0][2], e[1][2], e[2][2]],
        ])
    }

    #[inline]
    pub fn apply(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        Vector3::new(
            e[0][0] * v.x + e[0][1] * v.y + e[0][2] * v.z,
            e[1][0] * v.x + e[1][1] * v.y + e[1][2] * v.z,
            e[2][0] * v.x + e[2][1] * v.y + e[2][2] * v.z,
        )
    }
}

impl std::ops::Mul for RotationMatrix3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

impl fmt::Display for RotationMatrix3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.elements {
            writeln!(f, "[{:+.12} {:+.12} {:+.12}]", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_leaves_vector() {
        let v = Vector3::new(0.3, -0.4, 0.5);
        assert_eq!(RotationMatrix3::identity().apply(&v), v);
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let m = RotationMatrix3::from_rotation_z(FRAC_PI_2);
        let v = m.apply(&Vector3::x_axis());
        assert!(v.x.abs() < 1e-15);
        assert!((v.y + 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_transpose_inverts_rotation() {
        let m = RotationMatrix3::precession_from_j2000(2050.0);
        let v = Vector3::from_spherical(1.0, 0.3);
        let back = m.transpose().apply(&m.apply(&v));
        assert!((back - v).magnitude() < 1e-14);
    }

    #[test]
    fn test_precession_at_j2000_is_identity() {
        let m = RotationMatrix3::precession_from_j2000(2000.0);
        let v = Vector3::from_spherical(2.0, -0.7);
        assert!((m.apply(&v) - v).magnitude() < 1e-15);
    }

    #[test]
    fn test_precession_moves_ra_forward() {
        // General precession is ~50.3"/yr in longitude; on the equator at
        // ra=0 the ra rate is m ≈ 46.1"/yr.
        let m = RotationMatrix3::precession_from_j2000(2100.0);
        let (ra, _) = m.apply(&Vector3::from_spherical(0.0, 0.0)).to_spherical();
        let arcsec = ra.to_degrees() * 3600.0;
        assert!((arcsec - 4614.0).abs() < 2.0, "ra drift {}\"", arcsec);
    }
}

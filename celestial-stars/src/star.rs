//! Decoded star records.

use crate::geometry::{RotationMatrix3, Vector3};

/// Number of distinct B−V color codes.
pub const COLOR_CODES: u8 = 128;

const B_V_MIN: f32 = -0.5;
const B_V_SPAN: f32 = 4.0;

/// Representative chart colors by spectral class, hottest first.
/// Each entry is the upper B−V bound of the class and its RGB.
const SPECTRAL_COLORS: [(f32, [u8; 3]); 7] = [
    (-0.30, [155, 176, 255]), // O
    (0.00, [170, 191, 255]),  // B
    (0.30, [202, 215, 255]),  // A
    (0.58, [248, 247, 255]),  // F
    (0.81, [255, 244, 234]),  // G
    (1.40, [255, 210, 161]),  // K
    (f32::INFINITY, [255, 204, 111]), // M
];

/// B−V color index for a 7-bit color code, spread linearly over
/// `-0.5 ..= 3.5`.
pub fn b_v_from_code(code: u8) -> f32 {
    B_V_MIN + B_V_SPAN * f32::from(code.min(COLOR_CODES - 1)) / f32::from(COLOR_CODES - 1)
}

/// Nearest color code for a B−V index.
pub fn code_from_b_v(b_v: f32) -> u8 {
    let scaled = (b_v - B_V_MIN) / B_V_SPAN * f32::from(COLOR_CODES - 1);
    scaled.round().clamp(0.0, f32::from(COLOR_CODES - 1)) as u8
}

pub fn spectral_rgb(b_v: f32) -> [u8; 3] {
    SPECTRAL_COLORS
        .iter()
        .find(|(upper, _)| b_v <= *upper)
        .map(|(_, rgb)| *rgb)
        .unwrap_or(SPECTRAL_COLORS[SPECTRAL_COLORS.len() - 1].1)
}

/// Astrometric extras carried by the richer record variants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Astrometry {
    /// Proper motion toward east (includes the cos δ factor), mas/yr.
    pub pm_ra: f32,
    /// Proper motion toward north, mas/yr.
    pub pm_dec: f32,
    /// Parallax, mas.
    pub parallax: f32,
    /// Gaia DR3 source id, when the record carries one.
    pub source_id: Option<u64>,
}

/// A star as handed to the rendering layer.
///
/// `hip` is a Hipparcos number resolved lazily by the caller against the
/// bright-star name catalog; the engine never loads names itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedStar {
    /// Unit vector, J2000 unless precessed by the query.
    pub position: Vector3,
    pub mag: f32,
    /// 7-bit B−V color code, see [`b_v_from_code`].
    pub color: u8,
    pub hip: Option<u32>,
    pub astrometry: Option<Astrometry>,
}

impl DecodedStar {
    pub fn new(position: Vector3, mag: f32, color: u8) -> Self {
        Self {
            position,
            mag,
            color,
            hip: None,
            astrometry: None,
        }
    }

    /// `(ra, dec)` in radians, `ra` in `[0, 2π)`.
    pub fn ra_dec(&self) -> (f64, f64) {
        self.position.to_spherical()
    }

    pub fn ra_dec_deg(&self) -> (f64, f64) {
        let (ra, dec) = self.ra_dec();
        (ra.to_degrees(), dec.to_degrees())
    }

    pub fn b_v(&self) -> f32 {
        b_v_from_code(self.color)
    }

    pub fn rgb(&self) -> [u8; 3] {
        spectral_rgb(self.b_v())
    }

    pub fn precessed(&self, matrix: &RotationMatrix3) -> Self {
        Self {
            position: matrix.apply(&self.position),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_code_bounds() {
        assert_eq!(b_v_from_code(0), -0.5);
        assert!((b_v_from_code(127) - 3.5).abs() < 1e-6);
        assert_eq!(b_v_from_code(200), b_v_from_code(127));
    }

    #[test]
    fn test_color_code_round_trip() {
        for code in 0..COLOR_CODES {
            assert_eq!(code_from_b_v(b_v_from_code(code)), code);
        }
        assert_eq!(code_from_b_v(-3.0), 0);
        assert_eq!(code_from_b_v(9.0), 127);
    }

    #[test]
    fn test_spectral_rgb_classes() {
        // Vega (A0, B−V 0.0) is blue-white, Betelgeuse (M1, 1.85) orange.
        assert_eq!(spectral_rgb(0.0), [170, 191, 255]);
        assert_eq!(spectral_rgb(1.85), [255, 204, 111]);
        assert_eq!(spectral_rgb(0.65), [255, 244, 234]);
    }

    #[test]
    fn test_ra_dec_deg() {
        let star = DecodedStar::new(crate::geometry::direction_deg(83.633, -5.375), 8.4, 20);
        let (ra, dec) = star.ra_dec_deg();
        assert!((ra - 83.633).abs() < 1e-9);
        assert!((dec + 5.375).abs() < 1e-9);
    }

    #[test]
    fn test_precessed_keeps_photometry() {
        let star = DecodedStar {
            hip: Some(27989),
            ..DecodedStar::new(Vector3::x_axis(), 0.42, 110)
        };
        let m = RotationMatrix3::from_rotation_z(0.1);
        let moved = star.precessed(&m);
        assert_eq!(moved.mag, star.mag);
        assert_eq!(moved.color, star.color);
        assert_eq!(moved.hip, Some(27989));
        assert!((moved.position.angle_to(&star.position) - 0.1).abs() < 1e-12);
    }
}

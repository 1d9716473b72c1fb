//! Unit-sphere geometry shared by the mesh, the decoders and the query engine.

mod rotation;
mod vector;

pub use rotation::RotationMatrix3;
pub use vector::Vector3;

/// Unit vector for a position given in degrees.
pub fn direction_deg(ra_deg: f64, dec_deg: f64) -> Vector3 {
    Vector3::from_spherical(ra_deg.to_radians(), dec_deg.to_radians())
}

/// Angular distance between two points on the sphere using the Vincenty
/// formula. Inputs and result in degrees.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let (sin_lat1, cos_lat1) = libm::sincos(dec1_deg.to_radians());
    let (sin_lat2, cos_lat2) = libm::sincos(dec2_deg.to_radians());
    let (sin_dlon, cos_dlon) = libm::sincos((ra2_deg - ra1_deg).to_radians());

    let num = libm::sqrt(
        (cos_lat2 * sin_dlon).powi(2) + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;

    libm::atan2(num, den).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angular_separation_same_point() {
        assert!(angular_separation_deg(10.0, 20.0, 10.0, 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_angular_separation_pole_to_equator() {
        let dist = angular_separation_deg(0.0, 90.0, 123.0, 0.0);
        assert!((dist - 90.0).abs() < 1e-10);
    }

    #[test]
    fn test_angular_separation_matches_vectors() {
        let a = direction_deg(83.633, -5.375);
        let b = direction_deg(84.1, -4.9);
        let vec_deg = a.angle_to(&b).to_degrees();
        let vin_deg = angular_separation_deg(83.633, -5.375, 84.1, -4.9);
        assert!((vec_deg - vin_deg).abs() < 1e-10);
    }
}

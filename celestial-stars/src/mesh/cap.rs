//! Spherical caps used as query shapes during mesh descent.

use crate::geometry::Vector3;
use std::f64::consts::{FRAC_PI_2, PI};

/// A cap of angular `radius` around `direction`, specialised for one mesh
/// level.
///
/// `inner_cos` is the exact acceptance test for individual points.
/// `outer_cos` pads the radius by the level's largest triangle so that a
/// triangle whose center lies outside the cap but whose area still reaches
/// into it is never discarded. `core_cos` shrinks the radius by the same pad:
/// a triangle whose center passes it lies entirely inside the cap even when
/// the cap is larger than a hemisphere and no longer convex.
#[derive(Debug, Clone, Copy)]
pub struct SphericalCap {
    pub direction: Vector3,
    pub radius: f64,
    pub inner_cos: f64,
    pub outer_cos: f64,
    pub core_cos: f64,
}

impl SphericalCap {
    /// Cap of `radius` radians padded by `pad` radians. Radii at or beyond π
    /// cover the whole sphere; cosines are clamped to `[-1, 1]`.
    pub fn new(direction: Vector3, radius: f64, pad: f64) -> Self {
        let radius = radius.max(0.0);
        Self {
            direction: direction.normalize(),
            radius,
            inner_cos: clamped_cos(radius),
            outer_cos: clamped_cos(radius + pad),
            core_cos: if radius >= PI {
                -1.0
            } else {
                clamped_cos((radius - pad).max(0.0))
            },
        }
    }

    #[inline]
    pub fn contains(&self, p: &Vector3) -> bool {
        p.dot(&self.direction) >= self.inner_cos
    }

    /// Conservative test: `false` guarantees a triangle centered at `center`
    /// does not intersect the cap.
    #[inline]
    pub fn may_intersect(&self, center: &Vector3) -> bool {
        center.dot(&self.direction) >= self.outer_cos
    }

    /// Whether a triangle whose three corners are inside the cap is entirely
    /// inside it. Always true for caps up to a hemisphere, which are convex.
    #[inline]
    pub fn encloses_with_corners(&self, center: &Vector3) -> bool {
        self.radius <= FRAC_PI_2 || center.dot(&self.direction) >= self.core_cos
    }

    pub fn is_whole_sphere(&self) -> bool {
        self.inner_cos <= -1.0
    }
}

fn clamped_cos(angle: f64) -> f64 {
    if angle >= PI {
        -1.0
    } else {
        libm::cos(angle).clamp(-1.0, 1.0)
    }
}

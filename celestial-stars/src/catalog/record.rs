//! Packed star record layouts.
//!
//! All multi-byte fields are read through the file's [`Endianness`] first;
//! bit-packed fields are then extracted from the byte-order-corrected word.
//! Bit 0 is the least significant bit of that word.
//!
//! | Variant | Bytes | Layout |
//! |---------|-------|--------|
//! | `Star32` | 32 | `xref u32` (hip:24, component:8), `x0 i32`, `x1 i32`, `color u8`, `mag u8`, `spectral u16`, `pm0 i32`, `pm1 i32` (0.1 mas/yr), `parallax i32`, `parallax_err u32` (10 µas) |
//! | `Star16` | 16 | `u32 x0:20 color:7 mag:5`, `u32 x1:20`, `u32 pm0:14 pm1:14` (mas/yr), `u32` reserved |
//! | `Star8`  |  8 | `u64 x0:18 x1:18 color:7 mag:5` |
//! | `Gaia32` | 32 | `source_id u64`, `x0 i32`, `x1 i32` (1e-9 tangent units), `pmra i32`, `pmdec i32` (µas/yr), `parallax i32` (µas), `mag u16`, `color u8`, `flags u8` |
//! | `Gaia16` | 16 | `ra u32`, `dec i32` (mas), `pmra i16`, `pmdec i16` (mas/yr), `mag u16`, `color u8`, `flags u8` |
//! | `Gaia8`  |  8 | `u64 ra:24 dec:24 color:7 mag:9` (ra/dec in 100 mas) |

use super::bits::{extract_signed, extract_unsigned, insert_signed, insert_unsigned, signed_max};
use super::header::{Endianness, MagnitudeTable, RecordVariant};
use crate::geometry::Vector3;
use crate::mesh::Triangle;
use crate::star::{Astrometry, DecodedStar, COLOR_CODES};
use std::f64::consts::TAU;

/// Tangent-plane unit of `Gaia32` coordinates.
pub const GAIA32_POSITION_UNIT: f64 = 1.0e-9;

const MAS_PER_RADIAN: f64 = 180.0 * 3_600_000.0 / std::f64::consts::PI;
const GAIA8_UNIT_MAS: f64 = 100.0;
const HIP_MASK: u32 = 0x00ff_ffff;

/// Local frame of one zone, used to turn packed integer coordinates into
/// directions and back.
#[derive(Debug, Clone, Copy)]
pub struct ZoneBasis {
    pub center: Vector3,
    pub axis0: Vector3,
    pub axis1: Vector3,
    /// Tangent-plane length of one coordinate unit.
    pub scale: f64,
}

impl ZoneBasis {
    /// Basis for records of `variant` in `triangle`.
    ///
    /// For per-zone scaled variants the scale is the triangle's tangent
    /// extent divided by the largest coordinate integer, so the full integer
    /// range covers the triangle and nothing much beyond it. Variants that
    /// store ra/dec directly ignore the basis.
    pub fn for_triangle(triangle: &Triangle, variant: RecordVariant) -> Self {
        let scale = match variant.coordinate_bits() {
            Some(bits) => triangle.extent / signed_max(bits) as f64,
            None => GAIA32_POSITION_UNIT,
        };
        Self {
            center: triangle.center,
            axis0: triangle.axis0,
            axis1: triangle.axis1,
            scale,
        }
    }

    /// Basis for the global zone of ra/dec variants, which has no triangle.
    pub fn global() -> Self {
        Self {
            center: Vector3::z_axis(),
            axis0: Vector3::x_axis(),
            axis1: Vector3::y_axis(),
            scale: GAIA32_POSITION_UNIT,
        }
    }

    #[inline]
    pub fn position(&self, x0: i64, x1: i64) -> Vector3 {
        let u = x0 as f64 * self.scale;
        let v = x1 as f64 * self.scale;
        (self.center + self.axis0 * u + self.axis1 * v).normalize()
    }

    /// Unrounded integer coordinates of direction `p`.
    pub fn coordinates(&self, p: &Vector3) -> (f64, f64) {
        let w = p.dot(&self.center) * self.scale;
        (p.dot(&self.axis0) / w, p.dot(&self.axis1) / w)
    }
}

/// Decodes `bytes` (a whole number of records) into stars.
pub fn decode_records(
    variant: RecordVariant,
    endianness: Endianness,
    bytes: &[u8],
    basis: &ZoneBasis,
    magnitudes: &MagnitudeTable,
) -> Vec<DecodedStar> {
    let size = variant.record_size();
    debug_assert_eq!(bytes.len() % size, 0, "partial {} record", variant.name());

    let decoder = RecordDecoder {
        e: endianness,
        basis,
        magnitudes,
    };
    bytes
        .chunks_exact(size)
        .map(|rec| match variant {
            RecordVariant::Star32 => decoder.star32(rec),
            RecordVariant::Star16 => decoder.star16(rec),
            RecordVariant::Star8 => decoder.star8(rec),
            RecordVariant::Gaia32 => decoder.gaia32(rec),
            RecordVariant::Gaia16 => decoder.gaia16(rec),
            RecordVariant::Gaia8 => decoder.gaia8(rec),
        })
        .collect()
}

/// Encodes `star` into `out` (exactly one record). Values beyond a field's
/// range are clamped.
pub fn encode_record(
    variant: RecordVariant,
    endianness: Endianness,
    star: &DecodedStar,
    basis: &ZoneBasis,
    magnitudes: &MagnitudeTable,
    out: &mut [u8],
) {
    debug_assert_eq!(out.len(), variant.record_size());
    out.fill(0);
    let e = endianness;
    let mag = magnitudes.encode(star.mag, variant.max_mag_code());
    let color = u64::from(star.color.min(COLOR_CODES - 1));
    let astrometry = star.astrometry.unwrap_or_default();

    match variant {
        RecordVariant::Star32 => {
            let (x0, x1) = basis.coordinates(&star.position);
            e.write_u32(&mut out[0..4], star.hip.unwrap_or(0) & HIP_MASK);
            e.write_i32(&mut out[4..8], clamp_i32(x0));
            e.write_i32(&mut out[8..12], clamp_i32(x1));
            out[12] = color as u8;
            out[13] = mag as u8;
            e.write_i32(&mut out[16..20], clamp_i32(f64::from(astrometry.pm_ra) * 10.0));
            e.write_i32(&mut out[20..24], clamp_i32(f64::from(astrometry.pm_dec) * 10.0));
            e.write_i32(&mut out[24..28], clamp_i32(f64::from(astrometry.parallax) * 100.0));
        }
        RecordVariant::Star16 => {
            let (x0, x1) = basis.coordinates(&star.position);
            let mut a = 0u64;
            insert_signed(&mut a, 0, 20, x0.round() as i64);
            insert_unsigned(&mut a, 20, 7, color);
            insert_unsigned(&mut a, 27, 5, u64::from(mag));
            let mut b = 0u64;
            insert_signed(&mut b, 0, 20, x1.round() as i64);
            let mut c = 0u64;
            insert_signed(&mut c, 0, 14, f64::from(astrometry.pm_ra).round() as i64);
            insert_signed(&mut c, 14, 14, f64::from(astrometry.pm_dec).round() as i64);
            e.write_u32(&mut out[0..4], a as u32);
            e.write_u32(&mut out[4..8], b as u32);
            e.write_u32(&mut out[8..12], c as u32);
        }
        RecordVariant::Star8 => {
            let (x0, x1) = basis.coordinates(&star.position);
            let mut w = 0u64;
            insert_signed(&mut w, 0, 18, x0.round() as i64);
            insert_signed(&mut w, 18, 18, x1.round() as i64);
            insert_unsigned(&mut w, 36, 7, color);
            insert_unsigned(&mut w, 43, 5, u64::from(mag));
            e.write_u64(&mut out[0..8], w);
        }
        RecordVariant::Gaia32 => {
            let (x0, x1) = basis.coordinates(&star.position);
            e.write_u64(&mut out[0..8], astrometry.source_id.unwrap_or(0));
            e.write_i32(&mut out[8..12], clamp_i32(x0));
            e.write_i32(&mut out[12..16], clamp_i32(x1));
            e.write_i32(&mut out[16..20], clamp_i32(f64::from(astrometry.pm_ra) * 1000.0));
            e.write_i32(&mut out[20..24], clamp_i32(f64::from(astrometry.pm_dec) * 1000.0));
            e.write_i32(&mut out[24..28], clamp_i32(f64::from(astrometry.parallax) * 1000.0));
            e.write_u16(&mut out[28..30], mag as u16);
            out[30] = color as u8;
        }
        RecordVariant::Gaia16 => {
            let (ra, dec) = star.position.to_spherical();
            let ra_mas = (ra * MAS_PER_RADIAN).round() as u64 % (TAU * MAS_PER_RADIAN).round() as u64;
            e.write_u32(&mut out[0..4], ra_mas as u32);
            e.write_i32(&mut out[4..8], clamp_i32(dec * MAS_PER_RADIAN));
            e.write_i16(&mut out[8..10], clamp_i16(f64::from(astrometry.pm_ra)));
            e.write_i16(&mut out[10..12], clamp_i16(f64::from(astrometry.pm_dec)));
            e.write_u16(&mut out[12..14], mag as u16);
            out[14] = color as u8;
        }
        RecordVariant::Gaia8 => {
            let (ra, dec) = star.position.to_spherical();
            let full_turn = (TAU * MAS_PER_RADIAN / GAIA8_UNIT_MAS).round() as u64;
            let ra_units = (ra * MAS_PER_RADIAN / GAIA8_UNIT_MAS).round() as u64 % full_turn;
            let dec_units = (dec * MAS_PER_RADIAN / GAIA8_UNIT_MAS).round() as i64;
            let mut w = 0u64;
            insert_unsigned(&mut w, 0, 24, ra_units);
            insert_signed(&mut w, 24, 24, dec_units);
            insert_unsigned(&mut w, 48, 7, color);
            insert_unsigned(&mut w, 55, 9, u64::from(mag));
            e.write_u64(&mut out[0..8], w);
        }
    }
}

struct RecordDecoder<'a> {
    e: Endianness,
    basis: &'a ZoneBasis,
    magnitudes: &'a MagnitudeTable,
}

impl RecordDecoder<'_> {
    fn color(raw: u64) -> u8 {
        (raw as u8).min(COLOR_CODES - 1)
    }

    fn star32(&self, rec: &[u8]) -> DecodedStar {
        let e = self.e;
        let hip = e.read_u32(&rec[0..4]) & HIP_MASK;
        let x0 = e.read_i32(&rec[4..8]);
        let x1 = e.read_i32(&rec[8..12]);
        DecodedStar {
            position: self.basis.position(x0.into(), x1.into()),
            mag: self.magnitudes.magnitude(rec[13].into()),
            color: Self::color(rec[12].into()),
            hip: (hip != 0).then_some(hip),
            astrometry: Some(Astrometry {
                pm_ra: e.read_i32(&rec[16..20]) as f32 * 0.1,
                pm_dec: e.read_i32(&rec[20..24]) as f32 * 0.1,
                parallax: e.read_i32(&rec[24..28]) as f32 * 0.01,
                source_id: None,
            }),
        }
    }

    fn star16(&self, rec: &[u8]) -> DecodedStar {
        let a = u64::from(self.e.read_u32(&rec[0..4]));
        let b = u64::from(self.e.read_u32(&rec[4..8]));
        let c = u64::from(self.e.read_u32(&rec[8..12]));
        DecodedStar {
            position: self
                .basis
                .position(extract_signed(a, 0, 20), extract_signed(b, 0, 20)),
            mag: self.magnitudes.magnitude(extract_unsigned(a, 27, 5) as u32),
            color: Self::color(extract_unsigned(a, 20, 7)),
            hip: None,
            astrometry: Some(Astrometry {
                pm_ra: extract_signed(c, 0, 14) as f32,
                pm_dec: extract_signed(c, 14, 14) as f32,
                ..Astrometry::default()
            }),
        }
    }

    fn star8(&self, rec: &[u8]) -> DecodedStar {
        let w = self.e.read_u64(&rec[0..8]);
        DecodedStar::new(
            self.basis.position(extract_signed(w, 0, 18), extract_signed(w, 18, 18)),
            self.magnitudes.magnitude(extract_unsigned(w, 43, 5) as u32),
            Self::color(extract_unsigned(w, 36, 7)),
        )
    }

    fn gaia32(&self, rec: &[u8]) -> DecodedStar {
        let e = self.e;
        let source_id = e.read_u64(&rec[0..8]);
        DecodedStar {
            position: self
                .basis
                .position(e.read_i32(&rec[8..12]).into(), e.read_i32(&rec[12..16]).into()),
            mag: self
                .magnitudes
                .magnitude(u32::from(e.read_u16(&rec[28..30]) & 0x0fff)),
            color: Self::color(rec[30].into()),
            hip: None,
            astrometry: Some(Astrometry {
                pm_ra: e.read_i32(&rec[16..20]) as f32 / 1000.0,
                pm_dec: e.read_i32(&rec[20..24]) as f32 / 1000.0,
                parallax: e.read_i32(&rec[24..28]) as f32 / 1000.0,
                source_id: (source_id != 0).then_some(source_id),
            }),
        }
    }

    fn gaia16(&self, rec: &[u8]) -> DecodedStar {
        let e = self.e;
        let ra = f64::from(e.read_u32(&rec[0..4])) / MAS_PER_RADIAN;
        let dec = f64::from(e.read_i32(&rec[4..8])) / MAS_PER_RADIAN;
        DecodedStar {
            position: Vector3::from_spherical(ra, dec),
            mag: self
                .magnitudes
                .magnitude(u32::from(e.read_u16(&rec[12..14]) & 0x0fff)),
            color: Self::color(rec[14].into()),
            hip: None,
            astrometry: Some(Astrometry {
                pm_ra: f32::from(e.read_i16(&rec[8..10])),
                pm_dec: f32::from(e.read_i16(&rec[10..12])),
                ..Astrometry::default()
            }),
        }
    }

    fn gaia8(&self, rec: &[u8]) -> DecodedStar {
        let w = self.e.read_u64(&rec[0..8]);
        let ra = extract_unsigned(w, 0, 24) as f64 * GAIA8_UNIT_MAS / MAS_PER_RADIAN;
        let dec = extract_signed(w, 24, 24) as f64 * GAIA8_UNIT_MAS / MAS_PER_RADIAN;
        DecodedStar::new(
            Vector3::from_spherical(ra, dec),
            self.magnitudes.magnitude(extract_unsigned(w, 55, 9) as u32),
            Self::color(extract_unsigned(w, 48, 7)),
        )
    }
}

fn clamp_i32(value: f64) -> i32 {
    value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

fn clamp_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    fn magnitudes() -> MagnitudeTable {
        MagnitudeTable::new(-2000, 22000, 4095)
    }

    fn coarse_magnitudes() -> MagnitudeTable {
        MagnitudeTable::new(6000, 3100, 31)
    }

    fn table_for(variant: RecordVariant) -> MagnitudeTable {
        match variant {
            RecordVariant::Star32 => MagnitudeTable::new(-2000, 12750, 255),
            RecordVariant::Star16 | RecordVariant::Star8 => coarse_magnitudes(),
            RecordVariant::Gaia8 => MagnitudeTable::new(-2000, 22000, 511),
            RecordVariant::Gaia32 | RecordVariant::Gaia16 => magnitudes(),
        }
    }

    /// Stars spread over the interior of `triangle`.
    fn sample_stars(mesh: &Mesh, level: u32, index: usize) -> Vec<DecodedStar> {
        let [a, b, c] = mesh.corners(mesh.triangle(level, index));
        let weights = [
            (0.33, 0.33, 0.34),
            (0.8, 0.1, 0.1),
            (0.1, 0.8, 0.1),
            (0.05, 0.05, 0.9),
            (0.5, 0.45, 0.05),
        ];
        weights
            .iter()
            .enumerate()
            .map(|(i, &(wa, wb, wc))| DecodedStar {
                position: (a * wa + b * wb + c * wc).normalize(),
                mag: 6.0 + i as f32 * 0.7,
                color: (i * 25) as u8,
                hip: Some(1000 + i as u32),
                astrometry: Some(Astrometry {
                    pm_ra: 12.0 - i as f32 * 7.0,
                    pm_dec: -3.0 + i as f32,
                    parallax: 2.5,
                    source_id: Some(4_295_806_720 + i as u64),
                }),
            })
            .collect()
    }

    fn encode_all(
        variant: RecordVariant,
        e: Endianness,
        stars: &[DecodedStar],
        basis: &ZoneBasis,
        mags: &MagnitudeTable,
    ) -> Vec<u8> {
        let size = variant.record_size();
        let mut bytes = vec![0u8; stars.len() * size];
        for (star, out) in stars.iter().zip(bytes.chunks_exact_mut(size)) {
            encode_record(variant, e, star, basis, mags, out);
        }
        bytes
    }

    fn position_tolerance(variant: RecordVariant, basis: &ZoneBasis) -> f64 {
        match variant {
            RecordVariant::Gaia16 => 1.0 / MAS_PER_RADIAN,
            RecordVariant::Gaia8 => GAIA8_UNIT_MAS / MAS_PER_RADIAN,
            _ => basis.scale * 1.5,
        }
    }

    #[test]
    fn test_decode_matches_encoded_stars() {
        let mesh = Mesh::build(2).unwrap();
        let stars = sample_stars(&mesh, 2, 123);
        for variant in RecordVariant::ALL {
            let basis = ZoneBasis::for_triangle(mesh.triangle(2, 123), variant);
            let mags = table_for(variant);
            let bytes = encode_all(variant, Endianness::Little, &stars, &basis, &mags);
            let decoded = decode_records(variant, Endianness::Little, &bytes, &basis, &mags);

            assert_eq!(decoded.len(), stars.len());
            let tol = position_tolerance(variant, &basis);
            let half_step = mags.range_mmag() as f32 / mags.steps() as f32 / 2000.0;
            for (orig, got) in stars.iter().zip(&decoded) {
                let err = orig.position.angle_to(&got.position);
                assert!(err <= tol, "{}: position error {} > {}", variant.name(), err, tol);
                assert!(
                    (orig.mag - got.mag).abs() <= half_step + 1e-4,
                    "{}: mag {} vs {}",
                    variant.name(),
                    orig.mag,
                    got.mag
                );
                assert_eq!(orig.color, got.color, "{}", variant.name());
            }
        }
    }

    #[test]
    fn test_reencode_reproduces_bits() {
        let mesh = Mesh::build(1).unwrap();
        let stars = sample_stars(&mesh, 1, 7);
        for variant in RecordVariant::ALL {
            for e in [Endianness::Little, Endianness::Big] {
                let basis = ZoneBasis::for_triangle(mesh.triangle(1, 7), variant);
                let mags = table_for(variant);
                let bytes = encode_all(variant, e, &stars, &basis, &mags);
                let decoded = decode_records(variant, e, &bytes, &basis, &mags);
                let again = encode_all(variant, e, &decoded, &basis, &mags);
                assert_eq!(bytes, again, "{} {:?}", variant.name(), e);
            }
        }
    }

    #[test]
    fn test_endian_invariance() {
        let mesh = Mesh::build(2).unwrap();
        let stars = sample_stars(&mesh, 2, 300);
        for variant in RecordVariant::ALL {
            let basis = ZoneBasis::for_triangle(mesh.triangle(2, 300), variant);
            let mags = table_for(variant);
            let le = encode_all(variant, Endianness::Little, &stars, &basis, &mags);
            let be = encode_all(variant, Endianness::Big, &stars, &basis, &mags);
            assert_ne!(le, be, "{} should differ on disk", variant.name());
            let from_le = decode_records(variant, Endianness::Little, &le, &basis, &mags);
            let from_be = decode_records(variant, Endianness::Big, &be, &basis, &mags);
            assert_eq!(from_le, from_be, "{}", variant.name());
        }
    }

    #[test]
    fn test_star32_fields() {
        let mesh = Mesh::build(0).unwrap();
        let basis = ZoneBasis::for_triangle(mesh.triangle(0, 3), RecordVariant::Star32);
        let mags = magnitudes();
        let mut rec = [0u8; 32];
        let e = Endianness::Little;
        e.write_u32(&mut rec[0..4], 0x0200_6a2b); // component 2, hip 27179
        e.write_i32(&mut rec[4..8], -1_000_000);
        e.write_i32(&mut rec[8..12], 2_000_000);
        rec[12] = 40;
        rec[13] = 100;
        e.write_i32(&mut rec[16..20], -123);
        e.write_i32(&mut rec[20..24], 456);
        e.write_i32(&mut rec[24..28], 789);

        let star = decode_records(RecordVariant::Star32, e, &rec, &basis, &mags)[0];
        assert_eq!(star.hip, Some(0x6a2b));
        assert_eq!(star.color, 40);
        assert_eq!(star.mag, mags.magnitude(100));
        let astro = star.astrometry.unwrap();
        assert!((astro.pm_ra + 12.3).abs() < 1e-5);
        assert!((astro.pm_dec - 45.6).abs() < 1e-5);
        assert!((astro.parallax - 7.89).abs() < 1e-5);
        let expected = basis.position(-1_000_000, 2_000_000);
        assert_eq!(star.position, expected);
    }

    #[test]
    fn test_gaia32_fields() {
        let mesh = Mesh::build(1).unwrap();
        let basis = ZoneBasis::for_triangle(mesh.triangle(1, 55), RecordVariant::Gaia32);
        assert_eq!(basis.scale, GAIA32_POSITION_UNIT);
        let mags = magnitudes();
        let mut rec = [0u8; 32];
        let e = Endianness::Big;
        e.write_u64(&mut rec[0..8], 5_853_498_713_190_525_696);
        e.write_i32(&mut rec[8..12], -40_000_000);
        e.write_i32(&mut rec[12..16], 25_000_000);
        e.write_i32(&mut rec[16..20], -3_775_750);
        e.write_i32(&mut rec[20..24], 768_500);
        e.write_i32(&mut rec[24..28], 768_070);
        e.write_u16(&mut rec[28..30], 0xa000 | 2100);
        rec[30] = 110;

        let star = decode_records(RecordVariant::Gaia32, e, &rec, &basis, &mags)[0];
        assert_eq!(star.position, basis.position(-40_000_000, 25_000_000));
        assert_eq!(star.mag, mags.magnitude(2100));
        assert_eq!(star.color, 110);
        let astro = star.astrometry.unwrap();
        assert_eq!(astro.source_id, Some(5_853_498_713_190_525_696));
        assert!((astro.pm_ra + 3775.75).abs() < 1e-3);
        assert!((astro.pm_dec - 768.5).abs() < 1e-3);
        assert!((astro.parallax - 768.07).abs() < 1e-3);
    }

    #[test]
    fn test_star16_fields() {
        let mesh = Mesh::build(2).unwrap();
        let basis = ZoneBasis::for_triangle(mesh.triangle(2, 200), RecordVariant::Star16);
        let mags = coarse_magnitudes();
        let mut a = 0u64;
        insert_signed(&mut a, 0, 20, 123_456);
        insert_unsigned(&mut a, 20, 7, 17);
        insert_unsigned(&mut a, 27, 5, 4);
        let mut b = 0u64;
        insert_signed(&mut b, 0, 20, -77_000);
        let mut c = 0u64;
        insert_signed(&mut c, 0, 14, -812);
        insert_signed(&mut c, 14, 14, 93);
        let mut rec = [0u8; 16];
        let e = Endianness::Little;
        e.write_u32(&mut rec[0..4], a as u32);
        e.write_u32(&mut rec[4..8], b as u32);
        e.write_u32(&mut rec[8..12], c as u32);

        let star = decode_records(RecordVariant::Star16, e, &rec, &basis, &mags)[0];
        assert_eq!(star.position, basis.position(123_456, -77_000));
        assert_eq!(star.mag, mags.magnitude(4));
        assert_eq!(star.color, 17);
        let astro = star.astrometry.unwrap();
        assert_eq!(astro.pm_ra, -812.0);
        assert_eq!(astro.pm_dec, 93.0);
    }

    #[test]
    fn test_star16_negative_coordinates_sign_extended() {
        let mesh = Mesh::build(1).unwrap();
        let t = mesh.triangle(1, 40);
        let basis = ZoneBasis::for_triangle(t, RecordVariant::Star16);
        let mags = coarse_magnitudes();

        let mut a = 0u64;
        insert_signed(&mut a, 0, 20, -300_000);
        insert_unsigned(&mut a, 20, 7, 90);
        insert_unsigned(&mut a, 27, 5, 31);
        let mut b = 0u64;
        insert_signed(&mut b, 0, 20, -5);
        let mut rec = [0u8; 16];
        let e = Endianness::Big;
        e.write_u32(&mut rec[0..4], a as u32);
        e.write_u32(&mut rec[4..8], b as u32);

        let star = decode_records(RecordVariant::Star16, e, &rec, &basis, &mags)[0];
        assert_eq!(star.color, 90);
        assert!((star.mag - 9.1).abs() < 1e-5);
        let (u, v) = t.project(&star.position);
        assert!(u < 0.0, "x0 should be negative, got {}", u);
        assert!(v < 0.0 && v > -10.0 * basis.scale, "x1 should be tiny negative, got {}", v);
    }

    #[test]
    fn test_star_position_scale_covers_triangle() {
        let mesh = Mesh::build(3).unwrap();
        for variant in [RecordVariant::Star32, RecordVariant::Star16, RecordVariant::Star8] {
            let bits = variant.coordinate_bits().unwrap();
            for t in mesh.triangles(3).iter().step_by(37) {
                let basis = ZoneBasis::for_triangle(t, variant);
                for corner in mesh.corners(t) {
                    let (x0, x1) = basis.coordinates(&corner);
                    assert!(x0.abs() <= signed_max(bits) as f64 + 1e-3);
                    assert!(x1.abs() <= signed_max(bits) as f64 + 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_gaia16_ra_dec_direct() {
        let mags = magnitudes();
        let mut rec = [0u8; 16];
        let e = Endianness::Little;
        // ra 90°, dec -30°
        e.write_u32(&mut rec[0..4], 324_000_000);
        e.write_i32(&mut rec[4..8], -108_000_000);
        e.write_u16(&mut rec[12..14], 0xf000 | 500);
        rec[14] = 60;
        let star = decode_records(RecordVariant::Gaia16, e, &rec, &ZoneBasis::global(), &mags)[0];
        let (ra, dec) = star.ra_dec_deg();
        assert!((ra - 90.0).abs() < 1e-9);
        assert!((dec + 30.0).abs() < 1e-9);
        // High nibble of the magnitude field is not part of the code.
        assert_eq!(star.mag, mags.magnitude(500));
    }

    #[test]
    fn test_gaia8_wraps_ra() {
        let mags = magnitudes();
        let star = DecodedStar::new(crate::geometry::direction_deg(359.99999, 45.0), 10.0, 3);
        let mut rec = [0u8; 8];
        let basis = ZoneBasis::global();
        encode_record(RecordVariant::Gaia8, Endianness::Little, &star, &basis, &mags, &mut rec);
        let back = decode_records(RecordVariant::Gaia8, Endianness::Little, &rec, &basis, &mags)[0];
        let (ra, dec) = back.ra_dec_deg();
        assert!(ra < 0.001 || ra > 359.99, "ra {}", ra);
        assert!((dec - 45.0).abs() < 1e-4);
    }
}

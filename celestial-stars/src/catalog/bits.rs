//! Fixed-width bit-field extraction for packed star records.
//!
//! Fields are addressed by `(shift, width)` within a word that has already
//! been read in the file's byte order. Signed fields are stored two's
//! complement in exactly `width` bits and must be sign-extended from that
//! width; widening the raw bits directly would turn every negative
//! coordinate into a large positive one.

#[inline]
pub const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[inline]
pub const fn extract_unsigned(word: u64, shift: u32, width: u32) -> u64 {
    (word >> shift) & mask(width)
}

/// Sign-extends the low `width` bits of `raw`.
#[inline]
pub const fn sign_extend(raw: u64, width: u32) -> i64 {
    let unused = 64 - width;
    ((raw << unused) as i64) >> unused
}

#[inline]
pub const fn extract_signed(word: u64, shift: u32, width: u32) -> i64 {
    sign_extend(extract_unsigned(word, shift, width), width)
}

/// Largest value a signed field of `width` bits can hold.
#[inline]
pub const fn signed_max(width: u32) -> i64 {
    (1i64 << (width - 1)) - 1
}

#[inline]
pub const fn signed_min(width: u32) -> i64 {
    -(1i64 << (width - 1))
}

/// Writes the low `width` bits of `value` at `shift`, replacing what was
/// there.
#[inline]
pub fn insert_unsigned(word: &mut u64, shift: u32, width: u32, value: u64) {
    let m = mask(width) << shift;
    *word = (*word & !m) | ((value << shift) & m);
}

/// Writes `value` clamped to the signed range of `width` bits.
#[inline]
pub fn insert_signed(word: &mut u64, shift: u32, width: u32, value: i64) {
    let clamped = value.clamp(signed_min(width), signed_max(width));
    insert_unsigned(word, shift, width, clamped as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_width(width: u32) {
        let samples = [
            0,
            1,
            -1,
            2,
            -2,
            signed_max(width),
            signed_min(width),
            signed_max(width) / 3,
            signed_min(width) / 7,
        ];
        for shift in [0, 5, 64 - width] {
            for &value in &samples {
                let mut word = u64::MAX;
                insert_signed(&mut word, shift, width, value);
                assert_eq!(
                    extract_signed(word, shift, width),
                    value,
                    "width {} shift {}",
                    width,
                    shift
                );
            }
        }
    }

    #[test]
    fn test_signed_14_bits() {
        check_width(14);
        assert_eq!(sign_extend(0x2000, 14), -8192);
        assert_eq!(sign_extend(0x1fff, 14), 8191);
        assert_eq!(sign_extend(0x3fff, 14), -1);
    }

    #[test]
    fn test_signed_17_bits() {
        check_width(17);
        assert_eq!(sign_extend(0x10000, 17), -65536);
        assert_eq!(sign_extend(0x1ffff, 17), -1);
    }

    #[test]
    fn test_signed_18_bits() {
        check_width(18);
        assert_eq!(sign_extend(0x20000, 18), -131072);
        assert_eq!(sign_extend(0x1ffff, 18), 131071);
        assert_eq!(sign_extend(0x3fffe, 18), -2);
    }

    #[test]
    fn test_signed_20_bits() {
        check_width(20);
        assert_eq!(sign_extend(0x80000, 20), -524288);
        assert_eq!(sign_extend(0xfffff, 20), -1);
        assert_eq!(sign_extend(0x7ffff, 20), 524287);
    }

    #[test]
    fn test_signed_24_and_32_bits() {
        check_width(24);
        check_width(32);
        assert_eq!(sign_extend(0xffff_ffff, 32), -1);
    }

    #[test]
    fn test_naive_widening_is_wrong() {
        // The 18-bit encoding of -5 read without sign extension.
        let mut word = 0u64;
        insert_signed(&mut word, 0, 18, -5);
        assert_eq!(extract_unsigned(word, 0, 18), 0x3fffb);
        assert_eq!(extract_signed(word, 0, 18), -5);
    }

    #[test]
    fn test_insert_clamps_out_of_range() {
        let mut word = 0u64;
        insert_signed(&mut word, 3, 14, 100_000);
        assert_eq!(extract_signed(word, 3, 14), 8191);
        insert_signed(&mut word, 3, 14, -100_000);
        assert_eq!(extract_signed(word, 3, 14), -8192);
    }

    #[test]
    fn test_insert_preserves_neighbours() {
        let mut word = 0u64;
        insert_unsigned(&mut word, 0, 20, 0xabcde);
        insert_unsigned(&mut word, 20, 7, 0x55);
        insert_unsigned(&mut word, 27, 5, 0x1f);
        assert_eq!(extract_unsigned(word, 0, 20), 0xabcde);
        assert_eq!(extract_unsigned(word, 20, 7), 0x55);
        assert_eq!(extract_unsigned(word, 27, 5), 0x1f);
        assert_eq!(word >> 32, 0);
    }
}

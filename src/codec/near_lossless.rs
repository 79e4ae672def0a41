//! Near-lossless preprocessing ahead of lossless encoding.
//!
//! Quantizes non-smooth pixels to reduce color precision slightly, improving
//! lossless compression with bounded quality loss. Quality 100 = exact
//! (disabled), quality 0 = most aggressive quantization.
//!
//! Works on interleaved 8-bit pixels with 3 or 4 channels, in place.

const MIN_DIM_FOR_NEAR_LOSSLESS: usize = 64;

/// Convert near-lossless quality (0-100) to limit_bits.
///    100 -> 0
///  80..99 -> 1
///  60..79 -> 2
///  40..59 -> 3
///  20..39 -> 4
///   0..19 -> 5
#[inline]
fn near_lossless_bits(quality: u8) -> u8 {
    5 - quality.min(100) / 20
}

/// Quantize a value to nearest multiple of `1 << bits` using banker's rounding
/// (round-half-to-even). Clamps to 255.
#[inline]
fn find_closest_discretized(a: u8, bits: u8) -> u8 {
    let a = u32::from(a);
    let mask = (1u32 << bits) - 1;
    let biased = a + (mask >> 1) + ((a >> bits) & 1);
    if biased > 0xff {
        0xff
    } else {
        (biased & !mask) as u8
    }
}

/// Check if every channel of pixels `a` and `b` is within `limit`.
#[inline]
fn is_near(a: &[u8], b: &[u8], limit: i32) -> bool {
    a.iter().zip(b).all(|(&a, &b)| {
        let delta = i32::from(a) - i32::from(b);
        delta < limit && delta > -limit
    })
}

/// Single pass over interior pixels.
///
/// Reads from `src`, writes to `dst`. Border rows and columns are never
/// touched, so `dst` must already hold a copy of `src`.
fn near_lossless_pass(src: &[u8], w: usize, h: usize, channels: usize, bits: u8, dst: &mut [u8]) {
    let limit = 1i32 << bits;
    let stride = w * channels;

    for y in 1..h - 1 {
        let prev_row = &src[(y - 1) * stride..y * stride];
        let curr_row = &src[y * stride..(y + 1) * stride];
        let next_row = &src[(y + 1) * stride..(y + 2) * stride];
        let out_row = &mut dst[y * stride..(y + 1) * stride];

        for x in 1..w - 1 {
            let at = x * channels;
            let px = &curr_row[at..at + channels];
            let smooth = is_near(px, &curr_row[at - channels..at], limit)
                && is_near(px, &curr_row[at + channels..at + 2 * channels], limit)
                && is_near(px, &prev_row[at..at + channels], limit)
                && is_near(px, &next_row[at..at + channels], limit);
            let out = &mut out_row[at..at + channels];
            if smooth {
                out.copy_from_slice(px);
            } else {
                for (o, &v) in out.iter_mut().zip(px) {
                    *o = find_closest_discretized(v, bits);
                }
            }
        }
    }
}

/// Apply near-lossless preprocessing to an interleaved pixel buffer.
///
/// Multi-pass: iterates from `limit_bits` down to 1, each pass refining the
/// previous result. Border pixels are never modified.
///
/// Skips processing if:
/// - quality >= 100 (exact lossless)
/// - both dimensions < 64 (small icon)
/// - height < 3 or width < 3 (too few pixels for a 4-connected neighborhood)
pub(crate) fn apply_near_lossless(pixels: &mut [u8], w: usize, h: usize, channels: usize, quality: u8) {
    let limit_bits = near_lossless_bits(quality);
    if limit_bits == 0 {
        return;
    }
    if (w < MIN_DIM_FOR_NEAR_LOSSLESS && h < MIN_DIM_FOR_NEAR_LOSSLESS) || h < 3 || w < 3 {
        return;
    }
    if pixels.len() < w * h * channels {
        return;
    }

    let mut copy_buffer = pixels.to_vec();
    for bits in (1..=limit_bits).rev() {
        if bits != limit_bits {
            copy_buffer.copy_from_slice(pixels);
        }
        near_lossless_pass(&copy_buffer, w, h, channels, bits, pixels);
    }
}

/// Whether [`apply_near_lossless`] would change anything for this geometry and quality.
pub(crate) fn is_effective(w: usize, h: usize, quality: u8) -> bool {
    near_lossless_bits(quality) != 0
        && !(w < MIN_DIM_FOR_NEAR_LOSSLESS && h < MIN_DIM_FOR_NEAR_LOSSLESS)
        && h >= 3
        && w >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_lossless_bits() {
        assert_eq!(near_lossless_bits(100), 0);
        assert_eq!(near_lossless_bits(99), 1);
        assert_eq!(near_lossless_bits(80), 1);
        assert_eq!(near_lossless_bits(79), 2);
        assert_eq!(near_lossless_bits(40), 3);
        assert_eq!(near_lossless_bits(19), 5);
        assert_eq!(near_lossless_bits(0), 5);
    }

    #[test]
    fn test_find_closest_discretized() {
        // bits=1: round to multiples of 2, ties to even
        assert_eq!(find_closest_discretized(1, 1), 0);
        assert_eq!(find_closest_discretized(3, 1), 4);
        assert_eq!(find_closest_discretized(255, 1), 255);
        // bits=2: round to multiples of 4
        assert_eq!(find_closest_discretized(2, 2), 0);
        assert_eq!(find_closest_discretized(3, 2), 4);
        assert_eq!(find_closest_discretized(253, 2), 252);
    }

    #[test]
    fn small_images_unchanged() {
        let mut pixels: Vec<u8> = (0..32 * 32 * 4).map(|i| (i * 37 % 256) as u8).collect();
        let original = pixels.clone();
        apply_near_lossless(&mut pixels, 32, 32, 4, 0);
        assert_eq!(pixels, original);
        assert!(!is_effective(32, 32, 0));
    }

    #[test]
    fn quality_100_is_exact() {
        let mut pixels: Vec<u8> = (0..64 * 64 * 3).map(|i| (i * 13 % 256) as u8).collect();
        let original = pixels.clone();
        apply_near_lossless(&mut pixels, 64, 64, 3, 100);
        assert_eq!(pixels, original);
    }

    #[test]
    fn noisy_interior_is_quantized_borders_kept() {
        let (w, h) = (64usize, 64usize);
        let mut pixels: Vec<u8> = (0..w * h * 4)
            .map(|i| ((i * 7919) % 251) as u8)
            .collect();
        let original = pixels.clone();
        apply_near_lossless(&mut pixels, w, h, 4, 0);

        let stride = w * 4;
        assert_eq!(&pixels[..stride], &original[..stride]);
        assert_eq!(&pixels[(h - 1) * stride..], &original[(h - 1) * stride..]);
        for y in 0..h {
            assert_eq!(pixels[y * stride..y * stride + 4], original[y * stride..y * stride + 4]);
        }
        assert_ne!(pixels, original);
        // every interior change is bounded by the coarsest step
        for (a, b) in pixels.iter().zip(&original) {
            assert!((i32::from(*a) - i32::from(*b)).abs() <= 32);
        }
    }
}

//! Thumbnail sizing and resampling of final snapshots.
//!
//! Only downscaling is performed. The live compositing canvas is never
//! scaled; each returned bitmap is resized on its own.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, Rgba};

use crate::bitmap::{Bitmap, PixelLayout};

/// Compute the output size for a source of `src` pixels bounded by `target`.
///
/// A zero target dimension is derived from the aspect ratio. Without
/// `preserve_aspect`, each dimension is bounded independently.
pub fn target_size(src: (u32, u32), target: Option<(u32, u32)>, preserve_aspect: bool) -> (u32, u32) {
    let (sw, sh) = src;
    let Some((tw, th)) = target else {
        return src;
    };
    if sw == 0 || sh == 0 || (tw == 0 && th == 0) {
        return src;
    }

    if !preserve_aspect {
        let w = if tw == 0 { sw } else { tw.min(sw) };
        let h = if th == 0 { sh } else { th.min(sh) };
        return (w, h);
    }

    let ratio_w = if tw == 0 { f64::INFINITY } else { f64::from(tw) / f64::from(sw) };
    let ratio_h = if th == 0 { f64::INFINITY } else { f64::from(th) / f64::from(sh) };
    let ratio = ratio_w.min(ratio_h).min(1.0);
    if ratio >= 1.0 {
        return src;
    }
    let w = (f64::from(sw) * ratio).round().max(1.0) as u32;
    let h = (f64::from(sh) * ratio).round().max(1.0) as u32;
    (w.min(sw), h.min(sh))
}

/// Resize a snapshot to the bounded size. Returns the input unchanged when
/// no downscale is needed.
pub fn scale_bitmap(bitmap: Bitmap, target: Option<(u32, u32)>, preserve_aspect: bool) -> Bitmap {
    let (w, h) = target_size((bitmap.width(), bitmap.height()), target, preserve_aspect);
    if (w, h) == (bitmap.width(), bitmap.height()) {
        return bitmap;
    }

    let scale = bitmap.scale();
    let (sw, sh, layout) = (bitmap.width(), bitmap.height(), bitmap.layout());
    let resized = match layout {
        PixelLayout::Rgb8 => ImageBuffer::<Rgb<u8>, _>::from_raw(sw, sh, bitmap.pixels())
            .map(|src| imageops::resize(&src, w, h, FilterType::Triangle).into_raw()),
        PixelLayout::Rgba8 => ImageBuffer::<Rgba<u8>, _>::from_raw(sw, sh, bitmap.pixels())
            .map(|src| imageops::resize(&src, w, h, FilterType::Triangle).into_raw()),
    };

    match resized.and_then(|pixels| Bitmap::new(w, h, layout, pixels)) {
        Some(scaled) => scaled.with_scale(scale),
        None => bitmap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_target_keeps_size() {
        assert_eq!(target_size((100, 50), None, true), (100, 50));
        assert_eq!(target_size((100, 50), Some((0, 0)), true), (100, 50));
    }

    #[test]
    fn never_upscales() {
        assert_eq!(target_size((100, 50), Some((400, 400)), true), (100, 50));
        assert_eq!(target_size((100, 50), Some((400, 400)), false), (100, 50));
    }

    #[test]
    fn aspect_fit() {
        assert_eq!(target_size((100, 50), Some((50, 50)), true), (50, 25));
        assert_eq!(target_size((100, 50), Some((0, 10)), true), (20, 10));
        assert_eq!(target_size((100, 50), Some((10, 0)), true), (10, 5));
    }

    #[test]
    fn independent_bounds() {
        assert_eq!(target_size((100, 50), Some((50, 50)), false), (50, 50));
        assert_eq!(target_size((100, 50), Some((0, 20)), false), (100, 20));
    }

    #[test]
    fn resizes_pixels() {
        let bitmap = Bitmap::new(8, 4, PixelLayout::Rgba8, vec![200; 8 * 4 * 4])
            .unwrap()
            .with_scale(2.0);
        let scaled = scale_bitmap(bitmap, Some((4, 4)), true);
        assert_eq!((scaled.width(), scaled.height()), (4, 2));
        assert_eq!(scaled.scale(), 2.0);
        assert!(scaled.pixels().iter().all(|&v| v == 200));
    }
}

//! One-shot decode entry point.

use log::debug;

use super::config::DecodeConfig;
use super::session::AnimatedWebP;
use crate::bitmap::{AnimatedBitmap, DecodedImage};
use crate::error::DecodeError;

/// Decode a complete WebP file.
///
/// Still images, and animations when [`DecodeConfig::first_frame_only`] is
/// set, come back as [`DecodedImage::Static`]; an animation's first frame is
/// composited on the full canvas. Otherwise every frame is composited in
/// order; frames whose data fails to decode are skipped with a warning.
///
/// # Example
///
/// ```rust,no_run
/// use zenwebp_anim::{decode, DecodeConfig, DecodedImage};
///
/// let data: &[u8] = &[]; // your WebP data
/// match decode(data, &DecodeConfig::default())? {
///     DecodedImage::Static(bitmap) => println!("{}x{}", bitmap.width(), bitmap.height()),
///     DecodedImage::Animated(anim) => println!("{} frames, {:?}", anim.frames.len(), anim.loop_duration()),
/// }
/// # Ok::<(), zenwebp_anim::DecodeError>(())
/// ```
pub fn decode(data: &[u8], config: &DecodeConfig) -> Result<DecodedImage, DecodeError> {
    let session = AnimatedWebP::open_with_config(data, config)?;

    if !session.is_animated() || config.first_frame_only {
        return Ok(DecodedImage::Static(session.frame_at(0)?));
    }

    let frames = session.composite_all()?;
    if frames.len() < session.frame_count() {
        debug!(
            "decoded {} of {} frames",
            frames.len(),
            session.frame_count()
        );
    }
    Ok(DecodedImage::Animated(AnimatedBitmap {
        frames,
        loop_count: session.loop_count(),
    }))
}

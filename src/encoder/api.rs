//! One-shot encode entry point.

use std::borrow::Cow;

use log::debug;

use super::config::EncodeConfig;
use crate::bitmap::{AnimationFrame, Bitmap};
use crate::codec::encode_fragment;
use crate::error::EncodeError;
use crate::mux::{AnimationConfig, AnimationEncoder, BlendMethod, DisposeMethod, WebPMux};
use crate::scale::scale_bitmap;

/// Encode composited frames into a WebP file.
///
/// All frames must share the first frame's size. A single frame (or
/// [`EncodeConfig::first_frame_only`]) produces a still image; otherwise an
/// animation whose frames are independent full-canvas images. Nothing is
/// returned unless every frame encodes.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use zenwebp_anim::{encode, AnimationFrame, Bitmap, EncodeConfig, PixelLayout};
///
/// let bitmap = Bitmap::new(64, 64, PixelLayout::Rgba8, vec![0u8; 64 * 64 * 4]).unwrap();
/// let frames = vec![
///     AnimationFrame { bitmap: bitmap.clone(), duration: Duration::from_millis(80) },
///     AnimationFrame { bitmap, duration: Duration::from_millis(80) },
/// ];
/// let webp = encode(&frames, &EncodeConfig::new().with_quality(0.8))?;
/// # Ok::<(), zenwebp_anim::EncodeError>(())
/// ```
pub fn encode(frames: &[AnimationFrame], config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
    let first = frames.first().ok_or(EncodeError::NoFrames)?;
    let frames = if config.first_frame_only {
        &frames[..1]
    } else {
        frames
    };

    let (width, height) = (first.bitmap.width(), first.bitmap.height());
    for (index, frame) in frames.iter().enumerate() {
        if (frame.bitmap.width(), frame.bitmap.height()) != (width, height) {
            return Err(EncodeError::InvalidDimensions {
                index,
                width: frame.bitmap.width(),
                height: frame.bitmap.height(),
                expected_width: width,
                expected_height: height,
            });
        }
    }

    let params = config.to_params();

    if let [only] = frames {
        let bitmap = bounded(&only.bitmap, config.max_pixel_size);
        let fragment = encode_fragment(
            bitmap.pixels(),
            bitmap.width(),
            bitmap.height(),
            bitmap.layout(),
            &params,
        )
        .map_err(|e| EncodeError::from_codec(0, e))?;
        debug!("encoded still {}x{}", bitmap.width(), bitmap.height());

        let mut mux = WebPMux::new(bitmap.width(), bitmap.height());
        if let Some(icc) = &config.icc_profile {
            mux.set_icc_profile(icc.clone());
        }
        mux.set_image(fragment.into_mux_frame(0, DisposeMethod::None, BlendMethod::Overwrite));
        return Ok(mux.assemble()?);
    }

    let mut encoder: Option<AnimationEncoder> = None;
    for frame in frames {
        let bitmap = bounded(&frame.bitmap, config.max_pixel_size);
        let anim = match encoder.as_mut() {
            Some(anim) => anim,
            None => {
                let mut anim = AnimationEncoder::new(
                    bitmap.width(),
                    bitmap.height(),
                    AnimationConfig {
                        loop_count: config.loop_count,
                        ..Default::default()
                    },
                )?;
                if let Some(icc) = &config.icc_profile {
                    anim.icc_profile(icc.clone());
                }
                encoder.insert(anim)
            }
        };
        anim.add_frame(&bitmap, frame.duration, &params)?;
    }

    let anim = encoder.ok_or(EncodeError::NoFrames)?;
    debug!("encoded {} frames", anim.frame_count());
    anim.finalize()
}

/// Downscale to fit `max`, borrowing when no bound is set.
fn bounded(bitmap: &Bitmap, max: Option<(u32, u32)>) -> Cow<'_, Bitmap> {
    match max {
        Some(bound) => Cow::Owned(scale_bitmap(bitmap.clone(), Some(bound), true)),
        None => Cow::Borrowed(bitmap),
    }
}

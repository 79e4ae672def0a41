//! Animation multiplexer.
//!
//! Encodes composited full-canvas frames one by one and assembles them into
//! an animated WebP container. Every frame is independent: it sits at the
//! canvas origin, overwrites the canvas and is disposed to background, so
//! any frame can be decoded without its predecessors.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use zenwebp_anim::codec::EncodeParams;
//! use zenwebp_anim::mux::{AnimationConfig, AnimationEncoder, LoopCount};
//! use zenwebp_anim::{Bitmap, PixelLayout};
//!
//! let config = AnimationConfig {
//!     loop_count: LoopCount::Forever,
//!     ..Default::default()
//! };
//! let mut anim = AnimationEncoder::new(320, 240, config)?;
//!
//! let frame = Bitmap::new(320, 240, PixelLayout::Rgba8, vec![255u8; 320 * 240 * 4]).unwrap();
//! anim.add_frame(&frame, Duration::from_millis(100), &EncodeParams::default())?;
//! anim.add_frame(&frame, Duration::from_millis(100), &EncodeParams::default())?;
//!
//! let webp = anim.finalize()?;
//! # Ok::<(), zenwebp_anim::EncodeError>(())
//! ```

use std::time::Duration;

use log::debug;

use super::assemble::{WebPMux, MAX_DIMENSION, MAX_FRAME_DURATION_MS};
use super::demux::{BlendMethod, DisposeMethod, LoopCount};
use super::error::MuxError;
use crate::bitmap::{AnimationFrame, Bitmap};
use crate::codec::{encode_fragment, EncodeParams};
use crate::error::EncodeError;

/// Configuration for an animated WebP.
#[derive(Debug, Clone)]
pub struct AnimationConfig {
    /// Background color in BGRA byte order.
    pub background_color: [u8; 4],
    /// Loop count for the animation.
    pub loop_count: LoopCount,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            background_color: [0, 0, 0, 0],
            loop_count: LoopCount::Forever,
        }
    }
}

/// Animated WebP encoder.
///
/// Frames must all match the canvas size given to [`AnimationEncoder::new`].
#[derive(Debug)]
pub struct AnimationEncoder {
    width: u32,
    height: u32,
    mux: WebPMux,
}

impl AnimationEncoder {
    /// Create a new animation encoder.
    ///
    /// The canvas dimensions must be between 1 and 16384 (inclusive).
    pub fn new(width: u32, height: u32, config: AnimationConfig) -> Result<Self, MuxError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(MuxError::InvalidDimensions { width, height });
        }
        let mut mux = WebPMux::new(width, height);
        mux.set_animation(config.background_color, config.loop_count);
        Ok(Self { width, height, mux })
    }

    /// Number of frames added so far.
    pub fn frame_count(&self) -> usize {
        self.mux.num_frames() as usize
    }

    /// Encode and append one full-canvas frame.
    ///
    /// Durations beyond the 24-bit millisecond field are clamped.
    pub fn add_frame(
        &mut self,
        bitmap: &Bitmap,
        duration: Duration,
        params: &EncodeParams,
    ) -> Result<(), EncodeError> {
        let index = self.frame_count();
        if (bitmap.width(), bitmap.height()) != (self.width, self.height) {
            return Err(EncodeError::InvalidDimensions {
                index,
                width: bitmap.width(),
                height: bitmap.height(),
                expected_width: self.width,
                expected_height: self.height,
            });
        }

        let fragment = encode_fragment(
            bitmap.pixels(),
            bitmap.width(),
            bitmap.height(),
            bitmap.layout(),
            params,
        )
        .map_err(|e| EncodeError::from_codec(index, e))?;
        debug!("frame {} encoded to {} bytes", index, fragment.len());

        let duration_ms = duration_to_ms(duration);
        self.mux.push_frame(fragment.into_mux_frame(
            duration_ms,
            DisposeMethod::Background,
            BlendMethod::Overwrite,
        ))?;
        Ok(())
    }

    /// Set ICC profile on the output.
    pub fn icc_profile(&mut self, data: Vec<u8>) {
        self.mux.set_icc_profile(data);
    }

    /// Finalize the animation and return the assembled WebP bytes.
    pub fn finalize(self) -> Result<Vec<u8>, EncodeError> {
        if self.mux.num_frames() == 0 {
            return Err(EncodeError::NoFrames);
        }
        Ok(self.mux.assemble()?)
    }
}

fn duration_to_ms(duration: Duration) -> u32 {
    duration.as_millis().min(u128::from(MAX_FRAME_DURATION_MS)) as u32
}

/// Encode frames into an animated WebP in one call.
///
/// The canvas size comes from the first frame. Nothing is returned unless
/// every frame encodes and the container assembles.
pub fn assemble_animation(
    frames: &[AnimationFrame],
    loop_count: LoopCount,
    params: &EncodeParams,
) -> Result<Vec<u8>, EncodeError> {
    let first = frames.first().ok_or(EncodeError::NoFrames)?;
    let mut encoder = AnimationEncoder::new(
        first.bitmap.width(),
        first.bitmap.height(),
        AnimationConfig {
            loop_count,
            ..Default::default()
        },
    )?;
    for frame in frames {
        encoder.add_frame(&frame.bitmap, frame.duration, params)?;
    }
    encoder.finalize()
}

//! Random-access compositing, incremental decoding and muxing of animated WebP
//!
//! Animated WebP frames are rectangular patches drawn onto a shared canvas.
//! This crate turns them into fully composited frames, on demand and in any
//! order, without replaying the animation from the start.
//!
//! # Decoding
//!
//! One-shot decode of a whole file:
//!
//! ```rust,no_run
//! use zenwebp_anim::{decode, DecodeConfig, DecodedImage};
//!
//! let data: &[u8] = &[]; // your WebP data
//! let config = DecodeConfig::default().target_pixel_size(256, 256);
//! match decode(data, &config)? {
//!     DecodedImage::Static(bitmap) => println!("still {}x{}", bitmap.width(), bitmap.height()),
//!     DecodedImage::Animated(anim) => println!("{} frames", anim.frames.len()),
//! }
//! # Ok::<(), zenwebp_anim::DecodeError>(())
//! ```
//!
//! Or open a session and ask for frames by index. Moving forward one frame
//! reuses the previous canvas; jumps replay only from the nearest frame that
//! does not depend on earlier content.
//!
//! ```rust,no_run
//! use zenwebp_anim::AnimatedWebP;
//!
//! let data: &[u8] = &[]; // your WebP data
//! let anim = AnimatedWebP::open(data)?;
//! for i in 0..anim.frame_count() {
//!     let frame = anim.frame_at(i)?;
//!     let delay = anim.duration_at(i)?;
//!     println!("{i}: {}x{} for {delay:?}", frame.width(), frame.height());
//! }
//! # Ok::<(), zenwebp_anim::DecodeError>(())
//! ```
//!
//! Bytes arriving over the network go through [`IncrementalDecoder`]:
//!
//! ```rust,no_run
//! use zenwebp_anim::{DecodeConfig, IncrementalDecoder, IncrementalState};
//!
//! let chunks: Vec<&[u8]> = vec![]; // network chunks
//! let mut decoder = IncrementalDecoder::new(DecodeConfig::default());
//! for (i, chunk) in chunks.iter().enumerate() {
//!     let state = decoder.feed(chunk, i + 1 == chunks.len())?;
//!     if let Some(preview) = decoder.current_image() {
//!         println!("{state:?}: {}x{}", preview.width(), preview.height());
//!     }
//! }
//! # Ok::<(), zenwebp_anim::DecodeError>(())
//! ```
//!
//! # Encoding
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use zenwebp_anim::{encode, AnimationFrame, Bitmap, EncodeConfig, LoopCount, PixelLayout};
//!
//! let red = Bitmap::new(2, 2, PixelLayout::Rgb8, [255, 0, 0].repeat(4)).unwrap();
//! let blue = Bitmap::new(2, 2, PixelLayout::Rgb8, [0, 0, 255].repeat(4)).unwrap();
//! let frames = [
//!     AnimationFrame { bitmap: red, duration: Duration::from_millis(100) },
//!     AnimationFrame { bitmap: blue, duration: Duration::from_millis(100) },
//! ];
//! let config = EncodeConfig::new().with_loop_count(LoopCount::from(3u16));
//! let webp = encode(&frames, &config)?;
//! # Ok::<(), zenwebp_anim::EncodeError>(())
//! ```
//!
//! # Lower layers
//!
//! [`mux`] holds the RIFF container reader and writer, and [`codec`] the
//! per-fragment pixel codec. Both are usable on their own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bitmap;
/// Per-fragment pixel codec.
pub mod codec;
mod decoder;
mod encoder;
mod error;
/// WebP mux/demux and animation encoding.
pub mod mux;
/// Thumbnail scaling.
pub mod scale;

// Slice reader utility (used by mux)
mod slice_reader;

pub use bitmap::{AnimatedBitmap, AnimationFrame, Bitmap, DecodedImage, PixelLayout};
pub use error::{DecodeError, EncodeError};

// Re-export decoder public API
pub use decoder::{
    decode, normalize_duration, AnimatedWebP, Canvas, DecodeConfig, FrameDescriptor, FrameHeader,
    FrameTable, IncrementalDecoder, IncrementalState, Limits, TableMode, DEFAULT_FRAME_DURATION,
    MIN_FRAME_DURATION_MS,
};

// Re-export encoder public API
pub use encoder::{encode, EncodeConfig};

pub use mux::LoopCount;

//! Fragment-level pixel codec.
//!
//! Bridges raw frame fragments (the `VP8 `/`VP8L` bitstream of one frame plus
//! an optional `ALPH` payload) and RGBA pixels. Pixel work is delegated to
//! [`image_webp`]: a fragment is wrapped into a minimal still container before
//! decoding, and an encoded still container is demuxed back into a fragment
//! after encoding.
//!
//! The encoder is lossless; `quality` below 100 applies near-lossless
//! preprocessing before encoding, and `max_output_bytes` drives a search over
//! that preprocessing strength.

use std::borrow::Cow;
use std::io::Cursor;

use log::trace;
use thiserror::Error;

use crate::bitmap::PixelLayout;
use crate::mux::{wrap_fragment, BlendMethod, DemuxFrame, DisposeMethod, MuxError, MuxFrame, WebPDemuxer};

mod near_lossless;
mod stream;

pub use stream::{StillStream, StreamStatus};

/// Errors from the pixel codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The pixel decoder rejected the bitstream.
    #[error("pixel decode failed: {0}")]
    Decode(#[from] image_webp::DecodingError),

    /// The pixel encoder failed.
    #[error("pixel encode failed: {0}")]
    Encode(#[from] image_webp::EncodingError),

    /// Wrapping or unwrapping the still container failed.
    #[error(transparent)]
    Container(#[from] MuxError),

    /// The fragment's bytes have not all arrived.
    #[error("fragment data is incomplete")]
    Incomplete,

    /// The decoded image does not match the frame header.
    #[error("decoded size {actual:?} does not match expected {expected:?}")]
    SizeMismatch {
        /// Size declared by the frame header.
        expected: (u32, u32),
        /// Size produced by the decoder.
        actual: (u32, u32),
    },

    /// The pixel buffer length does not match the stated geometry.
    #[error("pixel buffer of {len} bytes does not hold a {width}x{height} {layout:?} image")]
    BufferSize {
        /// Actual buffer length.
        len: usize,
        /// Stated width.
        width: u32,
        /// Stated height.
        height: u32,
        /// Stated layout.
        layout: PixelLayout,
    },

    /// The image is too large to allocate an output buffer for.
    #[error("image {width}x{height} is too large to decode")]
    TooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// The input uses a feature this path does not handle.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// No preprocessing strength brought the fragment under the byte budget.
    #[error("encoded frame is {size} bytes, over the {limit} byte limit")]
    OutputTooLarge {
        /// Smallest size reached.
        size: usize,
        /// Requested limit.
        limit: usize,
    },
}

/// Decoded pixels of one fragment, always RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Whether the source carried an alpha channel.
    pub has_alpha: bool,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// Per-fragment encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// 0-100. 100 is exact lossless; lower values quantize more.
    pub quality: u8,
    /// Upper bound on fragment size in bytes; 0 means unbounded.
    pub max_output_bytes: usize,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            quality: 100,
            max_output_bytes: 0,
        }
    }
}

/// An encoded frame fragment, ready to be placed in a container.
#[derive(Debug, Clone)]
pub struct EncodedFragment {
    /// Fragment width.
    pub width: u32,
    /// Fragment height.
    pub height: u32,
    /// Raw VP8 or VP8L bitstream.
    pub bitstream: Vec<u8>,
    /// Raw ALPH payload for lossy fragments with alpha.
    pub alpha_data: Option<Vec<u8>>,
    /// Whether `bitstream` is VP8L.
    pub is_lossless: bool,
}

impl EncodedFragment {
    /// Total fragment payload size in bytes.
    pub fn len(&self) -> usize {
        self.bitstream.len() + self.alpha_data.as_ref().map_or(0, Vec::len)
    }

    /// Whether the fragment carries no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place the fragment at the canvas origin as a mux frame.
    pub fn into_mux_frame(
        self,
        duration_ms: u32,
        dispose: DisposeMethod,
        blend: BlendMethod,
    ) -> MuxFrame {
        MuxFrame {
            x_offset: 0,
            y_offset: 0,
            width: self.width,
            height: self.height,
            duration_ms,
            dispose,
            blend,
            bitstream: self.bitstream,
            alpha_data: self.alpha_data,
            is_lossless: self.is_lossless,
        }
    }
}

/// Decode one frame's fragment to RGBA.
///
/// The frame must be complete and the bitstream's size must match its
/// header. The size is checked before any pixel buffer is allocated.
pub fn decode_fragment(frame: &DemuxFrame<'_>) -> Result<RgbaFrame, CodecError> {
    if !frame.complete {
        return Err(CodecError::Incomplete);
    }
    let still = wrap_fragment(frame)?;
    let decoder = image_webp::WebPDecoder::new(Cursor::new(&still[..]))?;
    let actual = decoder.dimensions();
    if actual != (frame.width, frame.height) {
        return Err(CodecError::SizeMismatch {
            expected: (frame.width, frame.height),
            actual,
        });
    }
    read_rgba(decoder)
}

/// Decode a complete still WebP file to RGBA.
pub fn decode_still(data: &[u8]) -> Result<RgbaFrame, CodecError> {
    read_rgba(image_webp::WebPDecoder::new(Cursor::new(data))?)
}

fn read_rgba(mut decoder: image_webp::WebPDecoder<Cursor<&[u8]>>) -> Result<RgbaFrame, CodecError> {
    let (width, height) = decoder.dimensions();
    let size = decoder
        .output_buffer_size()
        .ok_or(CodecError::TooLarge { width, height })?;
    let mut buf = vec![0u8; size];
    decoder.read_image(&mut buf)?;

    let npixels = width as usize * height as usize;
    let pixels = if size == npixels * 4 {
        buf
    } else if size == npixels * 3 {
        let mut rgba = Vec::with_capacity(npixels * 4);
        for px in buf.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        rgba
    } else {
        return Err(CodecError::UnsupportedFeature(format!(
            "{size}-byte output for {width}x{height}"
        )));
    };

    Ok(RgbaFrame {
        width,
        height,
        has_alpha: decoder.has_alpha(),
        pixels,
    })
}

/// Encode interleaved pixels into a fragment.
///
/// With `max_output_bytes > 0`, quality is lowered in steps of 20 until the
/// fragment fits; [`CodecError::OutputTooLarge`] is returned when even the
/// strongest preprocessing does not fit.
pub fn encode_fragment(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    params: &EncodeParams,
) -> Result<EncodedFragment, CodecError> {
    let channels = layout.bytes_per_pixel();
    if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * channels {
        return Err(CodecError::BufferSize {
            len: pixels.len(),
            width,
            height,
            layout,
        });
    }

    let mut quality = params.quality.min(100);
    loop {
        let fragment = encode_once(pixels, width, height, layout, quality)?;
        let limit = params.max_output_bytes;
        if limit == 0 || fragment.len() <= limit {
            return Ok(fragment);
        }
        let can_shrink = quality > 0
            && near_lossless::is_effective(width as usize, height as usize, quality.saturating_sub(20));
        if !can_shrink {
            return Err(CodecError::OutputTooLarge {
                size: fragment.len(),
                limit,
            });
        }
        trace!(
            "fragment {}x{} is {} bytes at quality {}, over {}",
            width,
            height,
            fragment.len(),
            quality,
            limit
        );
        quality = quality.saturating_sub(20);
    }
}

fn encode_once(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    quality: u8,
) -> Result<EncodedFragment, CodecError> {
    let channels = layout.bytes_per_pixel();
    let data: Cow<'_, [u8]> = if near_lossless::is_effective(width as usize, height as usize, quality) {
        let mut prepared = pixels.to_vec();
        near_lossless::apply_near_lossless(
            &mut prepared,
            width as usize,
            height as usize,
            channels,
            quality,
        );
        Cow::Owned(prepared)
    } else {
        Cow::Borrowed(pixels)
    };

    let color = match layout {
        PixelLayout::Rgb8 => image_webp::ColorType::Rgb8,
        PixelLayout::Rgba8 => image_webp::ColorType::Rgba8,
    };
    let mut out = Vec::new();
    image_webp::WebPEncoder::new(&mut out).encode(&data, width, height, color)?;

    let demuxer = WebPDemuxer::new(&out)?;
    let frame = demuxer
        .frame(1)
        .ok_or_else(|| MuxError::InvalidFormat("encoder produced no image chunk".into()))?;
    Ok(EncodedFragment {
        width,
        height,
        bitstream: frame.bitstream.to_vec(),
        alpha_data: frame.alpha_data.map(<[u8]>::to_vec),
        is_lossless: !frame.is_lossy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::WebPMux;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 90, (x + y) as u8 | 1]);
            }
        }
        pixels
    }

    fn demux_frame_of(fragment: &EncodedFragment) -> Vec<u8> {
        let mut mux = WebPMux::new(fragment.width, fragment.height);
        mux.set_image(fragment.clone().into_mux_frame(0, DisposeMethod::None, BlendMethod::Overwrite));
        mux.assemble().unwrap()
    }

    #[test]
    fn lossless_fragment_round_trip() {
        let pixels = gradient(10, 7);
        let fragment =
            encode_fragment(&pixels, 10, 7, PixelLayout::Rgba8, &EncodeParams::default()).unwrap();
        assert!(fragment.is_lossless);
        assert!(fragment.alpha_data.is_none());

        let still = demux_frame_of(&fragment);
        let demuxer = WebPDemuxer::new(&still).unwrap();
        let decoded = decode_fragment(&demuxer.frame(1).unwrap()).unwrap();
        assert_eq!((decoded.width, decoded.height), (10, 7));
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn rgb_input_decodes_opaque() {
        let rgb: Vec<u8> = (0..4 * 4 * 3).map(|i| (i * 5) as u8).collect();
        let fragment =
            encode_fragment(&rgb, 4, 4, PixelLayout::Rgb8, &EncodeParams::default()).unwrap();
        let still = demux_frame_of(&fragment);
        let decoded = decode_still(&still).unwrap();
        assert_eq!(decoded.pixels.len(), 4 * 4 * 4);
        assert!(decoded.pixels.chunks_exact(4).all(|px| px[3] == 255));
        assert_eq!(&decoded.pixels[..3], &rgb[..3]);
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        assert!(matches!(
            encode_fragment(&[0; 10], 2, 2, PixelLayout::Rgba8, &EncodeParams::default()),
            Err(CodecError::BufferSize { len: 10, .. })
        ));
    }

    #[test]
    fn impossible_budget_fails() {
        let pixels = gradient(8, 8);
        let params = EncodeParams {
            quality: 100,
            max_output_bytes: 1,
        };
        assert!(matches!(
            encode_fragment(&pixels, 8, 8, PixelLayout::Rgba8, &params),
            Err(CodecError::OutputTooLarge { limit: 1, .. })
        ));
    }

    #[test]
    fn incomplete_fragment_is_not_decoded() {
        let pixels = gradient(4, 4);
        let fragment =
            encode_fragment(&pixels, 4, 4, PixelLayout::Rgba8, &EncodeParams::default()).unwrap();
        let still = demux_frame_of(&fragment);
        let cut = &still[..still.len() - 2];
        let demuxer = WebPDemuxer::new(cut).unwrap();
        assert!(matches!(
            decode_fragment(&demuxer.frame(1).unwrap()),
            Err(CodecError::Incomplete)
        ));
    }
}

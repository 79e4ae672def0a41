//! Streaming still-image decoder for incremental data delivery.
//!
//! Buffers incoming data and reports when enough is available to read the
//! image header or decode the pixels. The pixel decode itself is
//! all-or-nothing: the row count jumps from zero to the full height once the
//! declared RIFF payload has arrived.
//!
//! Animated containers are rejected with [`CodecError::UnsupportedFeature`]
//! as soon as their header is visible, so callers can switch to frame-level
//! handling.
//!
//! # Example
//!
//! ```rust,no_run
//! use zenwebp_anim::codec::{StillStream, StreamStatus};
//!
//! let network_chunks: Vec<Vec<u8>> = Vec::new();
//! let mut stream = StillStream::new();
//! for chunk in &network_chunks {
//!     match stream.append(chunk)? {
//!         StreamStatus::NeedMoreData => continue,
//!         StreamStatus::HeaderReady => {
//!             let (w, h) = stream.dimensions().unwrap_or_default();
//!             println!("{w}x{h}");
//!         }
//!         StreamStatus::Complete => break,
//!         _ => {}
//!     }
//! }
//! # Ok::<(), zenwebp_anim::codec::CodecError>(())
//! ```

use super::{decode_still, CodecError, RgbaFrame};
use crate::mux::{MuxError, WebPDemuxer};

/// Status returned from [`StillStream::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamStatus {
    /// More data is needed before any useful work can be done.
    NeedMoreData,
    /// The header has been parsed; dimensions are known.
    HeaderReady,
    /// The declared RIFF size has been fully received and decoded.
    Complete,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    width: u32,
    height: u32,
    has_alpha: bool,
    total_size: usize,
}

/// Incremental still WebP decoder.
#[derive(Debug, Default)]
pub struct StillStream {
    buf: Vec<u8>,
    header: Option<Header>,
    image: Option<RgbaFrame>,
}

impl StillStream {
    /// Create an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append data to the internal buffer and advance as far as possible.
    pub fn append(&mut self, data: &[u8]) -> Result<StreamStatus, CodecError> {
        self.buf.extend_from_slice(data);

        if self.image.is_some() {
            return Ok(StreamStatus::Complete);
        }

        if self.header.is_none() {
            let demuxer = match WebPDemuxer::new(&self.buf) {
                Ok(demuxer) => demuxer,
                Err(MuxError::UnexpectedEof) => return Ok(StreamStatus::NeedMoreData),
                Err(e) => return Err(e.into()),
            };
            if demuxer.is_animated() {
                return Err(CodecError::UnsupportedFeature("animation".into()));
            }
            let riff_size = u32::from_le_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]);
            self.header = Some(Header {
                width: demuxer.canvas_width(),
                height: demuxer.canvas_height(),
                has_alpha: demuxer.has_alpha(),
                total_size: riff_size as usize + 8,
            });
        }

        let Some(header) = self.header else {
            return Ok(StreamStatus::NeedMoreData);
        };
        if self.buf.len() < header.total_size {
            return Ok(StreamStatus::HeaderReady);
        }

        let image = decode_still(&self.buf[..header.total_size])?;
        if (image.width, image.height) != (header.width, header.height) {
            return Err(CodecError::SizeMismatch {
                expected: (header.width, header.height),
                actual: (image.width, image.height),
            });
        }
        self.image = Some(image);
        Ok(StreamStatus::Complete)
    }

    /// Image dimensions, once the header is visible.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.header.map(|h| (h.width, h.height))
    }

    /// Whether the header declares alpha, once it is visible.
    pub fn has_alpha(&self) -> Option<bool> {
        self.header.map(|h| h.has_alpha || self.image.as_ref().is_some_and(|i| i.has_alpha))
    }

    /// Number of fully decoded rows, counted from the top.
    pub fn rows_decoded(&self) -> u32 {
        self.image.as_ref().map_or(0, |i| i.height)
    }

    /// Decoded pixels, available after [`StreamStatus::Complete`].
    pub fn image(&self) -> Option<&RgbaFrame> {
        self.image.as_ref()
    }

    /// Returns the number of bytes buffered so far.
    pub fn bytes_buffered(&self) -> usize {
        self.buf.len()
    }

    /// Take ownership of the buffered data.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelLayout;
    use crate::codec::{encode_fragment, EncodeParams};
    use crate::mux::{MuxFrame, WebPMux};
    use crate::mux::{BlendMethod, DisposeMethod, LoopCount};

    fn still(width: u32, height: u32) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
        let fragment =
            encode_fragment(&pixels, width, height, PixelLayout::Rgba8, &EncodeParams::default())
                .unwrap();
        let mut mux = WebPMux::new(width, height);
        mux.set_image(fragment.into_mux_frame(0, DisposeMethod::None, BlendMethod::Overwrite));
        mux.assemble().unwrap()
    }

    #[test]
    fn byte_by_byte_reaches_complete() {
        let data = still(6, 5);
        let mut stream = StillStream::new();
        let mut saw_header = false;
        for (i, byte) in data.iter().enumerate() {
            let status = stream.append(std::slice::from_ref(byte)).unwrap();
            if i + 1 < data.len() {
                assert_eq!(stream.rows_decoded(), 0);
                saw_header |= status == StreamStatus::HeaderReady;
            } else {
                assert_eq!(status, StreamStatus::Complete);
            }
        }
        assert!(saw_header);
        assert_eq!(stream.dimensions(), Some((6, 5)));
        assert_eq!(stream.rows_decoded(), 5);
        assert_eq!(stream.image().unwrap().pixels.len(), 6 * 5 * 4);
    }

    #[test]
    fn animated_header_is_unsupported() {
        let fragment = encode_fragment(&[9; 16], 2, 2, PixelLayout::Rgba8, &EncodeParams::default())
            .unwrap();
        let mut mux = WebPMux::new(2, 2);
        mux.set_animation([0; 4], LoopCount::Forever);
        mux.push_frame(fragment.into_mux_frame(50, DisposeMethod::None, BlendMethod::Overwrite))
            .unwrap();
        let data = mux.assemble().unwrap();

        let mut stream = StillStream::new();
        assert!(matches!(
            stream.append(&data[..30]),
            Err(CodecError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn bad_signature_is_hard_error() {
        let mut stream = StillStream::new();
        assert!(matches!(
            stream.append(b"RIFX\0\0\0\0"),
            Err(CodecError::Container(MuxError::InvalidFormat(_)))
        ));
    }
}

//! Zero-copy WebP demuxer.
//!
//! Parses a WebP file at the chunk level, exposing frame metadata and raw
//! bitstream data without decoding pixels.
//!
//! The demuxer accepts truncated input: frames whose ANMF header is visible
//! are reported even when their bitstream is cut short, with
//! [`DemuxFrame::complete`] set to `false`. Frames whose header has not
//! arrived yet are not counted.
//!
//! # Example
//!
//! ```rust,no_run
//! use zenwebp_anim::mux::WebPDemuxer;
//!
//! let data: &[u8] = &[]; // your WebP data
//! let demuxer = WebPDemuxer::new(data)?;
//! println!("{}x{}, {} frame(s)", demuxer.canvas_width(), demuxer.canvas_height(), demuxer.num_frames());
//!
//! for frame in demuxer.frames() {
//!     println!("  frame {}: {}x{} at ({},{}) duration={}ms",
//!         frame.frame_num, frame.width, frame.height,
//!         frame.x_offset, frame.y_offset, frame.duration_ms);
//! }
//! # Ok::<(), zenwebp_anim::mux::MuxError>(())
//! ```

use core::num::NonZeroU16;

use super::error::MuxError;
use crate::slice_reader::SliceReader;

/// Number of times that an animation loops.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoopCount {
    /// The animation loops forever.
    Forever,
    /// The animation is played the specified number of times.
    Times(NonZeroU16),
}

impl LoopCount {
    /// The raw ANIM chunk value (0 = forever).
    pub fn to_raw(self) -> u16 {
        match self {
            LoopCount::Forever => 0,
            LoopCount::Times(n) => n.get(),
        }
    }
}

impl core::fmt::Display for LoopCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoopCount::Forever => f.write_str("infinite"),
            LoopCount::Times(n) => write!(f, "{} time{}", n, if n.get() == 1 { "" } else { "s" }),
        }
    }
}

impl From<u16> for LoopCount {
    fn from(n: u16) -> Self {
        match NonZeroU16::new(n) {
            None => LoopCount::Forever,
            Some(n) => LoopCount::Times(n),
        }
    }
}

/// How the frame area is disposed after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMethod {
    /// Do not dispose. The frame remains on the canvas.
    None,
    /// Clear the frame rectangle before the next frame is drawn.
    Background,
}

/// How the frame is blended with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMethod {
    /// Use alpha blending with the existing canvas content.
    AlphaBlend,
    /// Overwrite the canvas region with the frame data.
    Overwrite,
}

/// Metadata and raw bitstream of a single frame.
///
/// The `bitstream` field contains the raw VP8 or VP8L data (not including
/// any RIFF container framing). For lossy frames with separate alpha, the
/// `alpha_data` field contains the raw ALPH chunk payload.
#[derive(Debug, Clone)]
pub struct DemuxFrame<'a> {
    /// 1-based frame number.
    pub frame_num: u32,
    /// Horizontal offset of the frame on the canvas (always even).
    pub x_offset: u32,
    /// Vertical offset of the frame on the canvas (always even).
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame duration in milliseconds, as stored.
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Whether the frame's own pixels carry transparency.
    pub has_alpha: bool,
    /// Whether the frame uses lossy (VP8) encoding. `false` means lossless (VP8L).
    pub is_lossy: bool,
    /// Whether every byte of the frame's bitstream is present.
    pub complete: bool,
    /// Raw VP8 or VP8L bitstream data for this frame (possibly truncated).
    pub bitstream: &'a [u8],
    /// Raw ALPH chunk payload, if present (lossy frames with separate alpha).
    pub alpha_data: Option<&'a [u8]>,
}

/// Byte ranges of one ANMF chunk within the original data.
#[derive(Debug, Clone)]
struct FrameRecord {
    /// Offset of the ANMF payload start (after the 8-byte chunk header).
    payload_start: usize,
    /// Declared ANMF payload size.
    payload_size: usize,
}

/// Zero-copy WebP demuxer.
///
/// Parses a WebP file and provides access to frame metadata, raw bitstreams
/// and the ICC profile without decoding pixel data.
#[derive(Debug, Clone)]
pub struct WebPDemuxer<'a> {
    data: &'a [u8],
    riff_size: usize,
    canvas_width: u32,
    canvas_height: u32,
    loop_count: LoopCount,
    background_color: [u8; 4],
    has_alpha: bool,
    is_animated: bool,
    frames: Vec<FrameRecord>,
    icc_range: Option<(usize, usize)>,
    // For non-animated files: the single image bitstream info (declared ranges)
    single_bitstream_range: Option<(usize, usize)>,
    single_alpha_range: Option<(usize, usize)>,
    single_is_lossy: bool,
}

impl<'a> WebPDemuxer<'a> {
    /// Parse a WebP file from a byte slice.
    ///
    /// Only the container structure is parsed; no pixel decoding is
    /// performed. Returns [`MuxError::UnexpectedEof`] when the data is too
    /// short to contain the file header and the first chunk's header.
    pub fn new(data: &'a [u8]) -> Result<Self, MuxError> {
        let mut r = SliceReader::new(data);

        if &r.read_fourcc()? != b"RIFF" {
            return Err(MuxError::InvalidFormat("Missing RIFF signature".into()));
        }
        let riff_size = r.read_u32_le()? as usize;
        if &r.read_fourcc()? != b"WEBP" {
            return Err(MuxError::InvalidFormat("Missing WEBP signature".into()));
        }

        let fourcc = r.read_fourcc()?;
        let chunk_size = r.read_u32_le()? as usize;

        let mut demuxer = Self {
            data,
            riff_size,
            canvas_width: 0,
            canvas_height: 0,
            loop_count: LoopCount::Times(NonZeroU16::MIN),
            background_color: [0; 4],
            has_alpha: false,
            is_animated: false,
            frames: Vec::new(),
            icc_range: None,
            single_bitstream_range: None,
            single_alpha_range: None,
            single_is_lossy: false,
        };

        match &fourcc {
            b"VP8 " => demuxer.parse_simple_lossy(r, chunk_size)?,
            b"VP8L" => demuxer.parse_simple_lossless(r, chunk_size)?,
            b"VP8X" => demuxer.parse_extended(r, chunk_size)?,
            _ => {
                return Err(MuxError::InvalidFormat(format!(
                    "Unknown first chunk: {:?}",
                    fourcc
                )))
            }
        }

        if demuxer.canvas_width == 0 || demuxer.canvas_height == 0 {
            return Err(MuxError::InvalidDimensions {
                width: demuxer.canvas_width,
                height: demuxer.canvas_height,
            });
        }

        Ok(demuxer)
    }

    fn parse_simple_lossy(
        &mut self,
        mut r: SliceReader<'a>,
        chunk_size: usize,
    ) -> Result<(), MuxError> {
        let bitstream_start = r.position();
        if chunk_size < 10 {
            return Err(MuxError::InvalidFormat("VP8 chunk too small".into()));
        }

        let frame_tag = r.read_u24_le()?;
        if frame_tag & 1 != 0 {
            return Err(MuxError::InvalidFormat("Not a keyframe".into()));
        }
        let magic = [r.read_u8()?, r.read_u8()?, r.read_u8()?];
        if magic != [0x9D, 0x01, 0x2A] {
            return Err(MuxError::InvalidFormat("Invalid VP8 magic".into()));
        }

        self.canvas_width = u32::from(r.read_u16_le()? & 0x3FFF);
        self.canvas_height = u32::from(r.read_u16_le()? & 0x3FFF);
        self.single_bitstream_range = Some((bitstream_start, bitstream_start + chunk_size));
        self.single_is_lossy = true;
        Ok(())
    }

    fn parse_simple_lossless(
        &mut self,
        mut r: SliceReader<'a>,
        chunk_size: usize,
    ) -> Result<(), MuxError> {
        let bitstream_start = r.position();
        if chunk_size < 5 {
            return Err(MuxError::InvalidFormat("VP8L chunk too small".into()));
        }

        let (width, height, has_alpha) = parse_vp8l_header(&mut r)?;
        self.canvas_width = width;
        self.canvas_height = height;
        self.has_alpha = has_alpha;
        self.single_bitstream_range = Some((bitstream_start, bitstream_start + chunk_size));
        self.single_is_lossy = false;
        Ok(())
    }

    fn parse_extended(&mut self, mut r: SliceReader<'a>, vp8x_size: usize) -> Result<(), MuxError> {
        if vp8x_size < 10 {
            return Err(MuxError::InvalidFormat("VP8X chunk too small".into()));
        }

        let flags = r.read_u8()?;
        let has_icc = flags & 0b0010_0000 != 0;
        self.has_alpha = flags & 0b0001_0000 != 0;
        self.is_animated = flags & 0b0000_0010 != 0;

        r.skip(3)?;
        // Canvas dimensions (24-bit LE, stored as value-1)
        self.canvas_width = r.read_u24_le()? + 1;
        self.canvas_height = r.read_u24_le()? + 1;

        let data = self.data;
        let max_pos = (8 + self.riff_size).min(data.len());
        let mut pos = 20 + vp8x_size + (vp8x_size & 1);

        // Stop at the first chunk that is not fully visible yet; ANMF chunks
        // only need their frame header and first sub-chunk header.
        while pos + 8 <= max_pos {
            r.seek_from_start(pos)?;
            let fourcc = r.read_fourcc()?;
            let size = r.read_u32_le()? as usize;
            let payload_start = pos + 8;
            let payload_end = payload_start.saturating_add(size);
            let payload_visible = payload_end <= data.len();

            match &fourcc {
                b"ICCP" if has_icc => {
                    if !payload_visible {
                        break;
                    }
                    self.icc_range = Some((payload_start, payload_end));
                }
                b"ANIM" if self.is_animated => {
                    if !payload_visible || size < 6 {
                        break;
                    }
                    let d = &data[payload_start..payload_end];
                    self.background_color = [d[0], d[1], d[2], d[3]];
                    self.loop_count = LoopCount::from(u16::from_le_bytes([d[4], d[5]]));
                }
                b"ANMF" if self.is_animated => {
                    if payload_start + 24 > data.len() {
                        break;
                    }
                    self.frames.push(FrameRecord {
                        payload_start,
                        payload_size: size,
                    });
                }
                b"VP8 " | b"VP8L" if !self.is_animated => {
                    self.single_bitstream_range = Some((payload_start, payload_end));
                    self.single_is_lossy = &fourcc == b"VP8 ";
                }
                b"ALPH" if !self.is_animated => {
                    self.single_alpha_range = Some((payload_start, payload_end));
                }
                _ => {}
            }

            pos = payload_end.saturating_add(size & 1);
        }

        Ok(())
    }

    /// Canvas width in pixels.
    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    /// Canvas height in pixels.
    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// Number of frames seen in the container. Non-animated images return 1.
    pub fn num_frames(&self) -> u32 {
        if self.is_animated {
            self.frames.len() as u32
        } else {
            1
        }
    }

    /// Loop count for animated images.
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    /// Background color hint for animated images (BGRA byte order).
    pub fn background_color(&self) -> [u8; 4] {
        self.background_color
    }

    /// Whether the container declares an animation.
    pub fn is_animated(&self) -> bool {
        self.is_animated
    }

    /// Whether the container declares alpha.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Whether the data ends before the declared RIFF size.
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.riff_size.saturating_add(8)
    }

    /// The data this demuxer reads from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Get a specific frame by 1-based index.
    ///
    /// Returns `None` if the index is out of range or the frame's sub-chunks
    /// are malformed.
    pub fn frame(&self, n: u32) -> Option<DemuxFrame<'a>> {
        if n == 0 {
            return None;
        }

        if !self.is_animated {
            if n != 1 {
                return None;
            }
            return self.single_frame();
        }

        let idx = (n - 1) as usize;
        let record = self.frames.get(idx)?;
        self.parse_anmf_frame(idx, record)
    }

    /// Iterate over all frames.
    pub fn frames(&self) -> DemuxFrameIter<'a, '_> {
        DemuxFrameIter {
            demuxer: self,
            current: 1,
        }
    }

    /// ICC profile data, if present.
    pub fn icc_profile(&self) -> Option<&'a [u8]> {
        self.icc_range.map(|(s, e)| &self.data[s..e])
    }

    /// Clamp a declared range to the available data.
    fn available(&self, start: usize, end: usize) -> (&'a [u8], bool) {
        let len = self.data.len();
        let s = start.min(len);
        (&self.data[s..end.min(len)], end <= len)
    }

    fn single_frame(&self) -> Option<DemuxFrame<'a>> {
        let (bs_start, bs_end) = self.single_bitstream_range?;
        let (bitstream, bitstream_complete) = self.available(bs_start, bs_end);
        let mut complete = bitstream_complete;
        let alpha_data = self.single_alpha_range.map(|(s, e)| {
            let (alpha, alpha_complete) = self.available(s, e);
            complete &= alpha_complete;
            alpha
        });

        Some(DemuxFrame {
            frame_num: 1,
            x_offset: 0,
            y_offset: 0,
            width: self.canvas_width,
            height: self.canvas_height,
            duration_ms: 0,
            dispose: DisposeMethod::None,
            blend: BlendMethod::Overwrite,
            has_alpha: self.has_alpha || alpha_data.is_some(),
            is_lossy: self.single_is_lossy,
            complete,
            bitstream,
            alpha_data,
        })
    }

    fn parse_anmf_frame(&self, idx: usize, record: &FrameRecord) -> Option<DemuxFrame<'a>> {
        let start = record.payload_start;
        let size = record.payload_size;
        let declared_end = start.checked_add(size)?;

        if size < 24 {
            return None;
        }

        // ANMF payload layout:
        // 3 bytes: Frame X (in 2-pixel units)
        // 3 bytes: Frame Y (in 2-pixel units)
        // 3 bytes: Frame Width Minus One
        // 3 bytes: Frame Height Minus One
        // 3 bytes: Frame Duration
        // 1 byte:  Flags (dispose[0], blend[1], reserved[2-7])
        // Then: sub-chunks (ALPH + VP8, or VP8L)
        let d = &self.data[start..start + 24];
        let x_offset = read_u24_le(&d[0..3]) * 2;
        let y_offset = read_u24_le(&d[3..6]) * 2;
        let width = read_u24_le(&d[6..9]) + 1;
        let height = read_u24_le(&d[9..12]) + 1;
        let duration_ms = read_u24_le(&d[12..15]);
        let flags = d[15];
        let dispose = if flags & 1 != 0 {
            DisposeMethod::Background
        } else {
            DisposeMethod::None
        };
        let blend = if flags & 2 != 0 {
            BlendMethod::Overwrite
        } else {
            BlendMethod::AlphaBlend
        };

        let sub_fourcc = &d[16..20];
        let sub_size = u32::from_le_bytes([d[20], d[21], d[22], d[23]]) as usize;
        let sub_start = start + 24;
        let sub_end = sub_start.checked_add(sub_size)?;
        if sub_end > declared_end {
            return None;
        }

        let mut frame = DemuxFrame {
            frame_num: idx as u32 + 1,
            x_offset,
            y_offset,
            width,
            height,
            duration_ms,
            dispose,
            blend,
            has_alpha: false,
            is_lossy: true,
            complete: false,
            bitstream: &[],
            alpha_data: None,
        };

        match sub_fourcc {
            b"VP8L" => {
                let (bitstream, complete) = self.available(sub_start, sub_end);
                frame.is_lossy = false;
                frame.complete = complete;
                frame.bitstream = bitstream;
                // Without the header, assume the worst case for compositing.
                frame.has_alpha = match bitstream {
                    [0x2f, a, b, c, e, ..] => u32::from_le_bytes([*a, *b, *c, *e]) >> 28 & 1 != 0,
                    _ => true,
                };
            }
            b"VP8 " => {
                let (bitstream, complete) = self.available(sub_start, sub_end);
                frame.complete = complete;
                frame.bitstream = bitstream;
            }
            b"ALPH" => {
                let (alpha, alpha_complete) = self.available(sub_start, sub_end);
                frame.has_alpha = true;
                frame.alpha_data = Some(alpha);

                let vp8_header_start = sub_end + (sub_size & 1);
                if vp8_header_start + 8 > declared_end {
                    return None;
                }
                if vp8_header_start + 8 > self.data.len() {
                    // The opaque bitstream has not arrived yet.
                    return Some(frame);
                }
                let h = &self.data[vp8_header_start..vp8_header_start + 8];
                if &h[0..4] != b"VP8 " {
                    return None;
                }
                let vp8_size = u32::from_le_bytes([h[4], h[5], h[6], h[7]]) as usize;
                let vp8_start = vp8_header_start + 8;
                let vp8_end = vp8_start.checked_add(vp8_size)?;
                if vp8_end > declared_end {
                    return None;
                }
                let (bitstream, complete) = self.available(vp8_start, vp8_end);
                frame.complete = alpha_complete && complete;
                frame.bitstream = bitstream;
            }
            _ => return None,
        }

        Some(frame)
    }
}

/// Iterator over demuxed frames.
pub struct DemuxFrameIter<'a, 'b> {
    demuxer: &'b WebPDemuxer<'a>,
    current: u32,
}

impl<'a> Iterator for DemuxFrameIter<'a, '_> {
    type Item = DemuxFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.demuxer.frame(self.current)?;
        self.current += 1;
        Some(frame)
    }
}

/// Parse the 5-byte VP8L header: signature, then 14-bit width/height minus
/// one and the alpha hint bit.
fn parse_vp8l_header(r: &mut SliceReader<'_>) -> Result<(u32, u32, bool), MuxError> {
    let signature = r.read_u8()?;
    if signature != 0x2f {
        return Err(MuxError::InvalidFormat("Invalid VP8L signature".into()));
    }
    let header = r.read_u32_le()?;
    let width = (header & 0x3FFF) + 1;
    let height = ((header >> 14) & 0x3FFF) + 1;
    let has_alpha = (header >> 28) & 1 != 0;
    Ok((width, height, has_alpha))
}

/// Read a 24-bit little-endian value from 3 bytes.
fn read_u24_le(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-built animated container with two VP8L frames carrying dummy payloads.
    fn two_frame_container(truncate_to: Option<usize>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"VP8X");
        body.extend_from_slice(&10u32.to_le_bytes());
        body.extend_from_slice(&[0b0001_0010, 0, 0, 0]);
        body.extend_from_slice(&[3, 0, 0, 3, 0, 0]); // 4x4 canvas
        body.extend_from_slice(b"ANIM");
        body.extend_from_slice(&6u32.to_le_bytes());
        body.extend_from_slice(&[0, 0, 0, 0, 2, 0]);
        for (dur, flags) in [(40u8, 0u8), (0u8, 3u8)] {
            body.extend_from_slice(b"ANMF");
            body.extend_from_slice(&(16u32 + 8 + 6).to_le_bytes());
            body.extend_from_slice(&[0, 0, 0, 0, 0, 0, 3, 0, 0, 3, 0, 0, dur, 0, 0, flags]);
            body.extend_from_slice(b"VP8L");
            body.extend_from_slice(&6u32.to_le_bytes());
            // signature + header with the alpha hint set
            body.extend_from_slice(&[0x2f, 0x03, 0xC0, 0x00, 0x10, 0xAA]);
        }
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WEBP");
        out.extend_from_slice(&body);
        if let Some(len) = truncate_to {
            out.truncate(len);
        }
        out
    }

    #[test]
    fn parses_anmf_headers() {
        let data = two_frame_container(None);
        let demuxer = WebPDemuxer::new(&data).unwrap();
        assert!(demuxer.is_animated());
        assert!(!demuxer.is_truncated());
        assert_eq!(demuxer.num_frames(), 2);
        assert_eq!(demuxer.loop_count().to_raw(), 2);

        let first = demuxer.frame(1).unwrap();
        assert_eq!((first.width, first.height), (4, 4));
        assert_eq!(first.duration_ms, 40);
        assert_eq!(first.blend, BlendMethod::AlphaBlend);
        assert_eq!(first.dispose, DisposeMethod::None);
        assert!(first.has_alpha);
        assert!(first.complete);

        let second = demuxer.frame(2).unwrap();
        assert_eq!(second.blend, BlendMethod::Overwrite);
        assert_eq!(second.dispose, DisposeMethod::Background);
        assert!(demuxer.frame(0).is_none());
        assert!(demuxer.frame(3).is_none());
    }

    #[test]
    fn truncated_bitstream_is_incomplete() {
        let full = two_frame_container(None);
        let data = two_frame_container(Some(full.len() - 3));
        let demuxer = WebPDemuxer::new(&data).unwrap();
        assert!(demuxer.is_truncated());
        assert_eq!(demuxer.num_frames(), 2);
        assert!(demuxer.frame(1).unwrap().complete);
        let last = demuxer.frame(2).unwrap();
        assert!(!last.complete);
        assert_eq!(last.bitstream.len(), 3);
    }

    #[test]
    fn invisible_frame_header_is_not_counted() {
        let full = two_frame_container(None);
        // Cut inside the second ANMF frame header.
        let data = two_frame_container(Some(full.len() - 20));
        let demuxer = WebPDemuxer::new(&data).unwrap();
        assert_eq!(demuxer.num_frames(), 1);
    }

    #[test]
    fn short_header_is_eof() {
        let data = two_frame_container(Some(16));
        assert!(matches!(WebPDemuxer::new(&data), Err(MuxError::UnexpectedEof)));
        assert!(matches!(
            WebPDemuxer::new(b"RIFX\0\0\0\0WEBPVP8X"),
            Err(MuxError::InvalidFormat(_))
        ));
    }
}

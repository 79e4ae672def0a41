//! WebP container assembler.
//!
//! Assembles a valid WebP file from pre-encoded bitstream chunks.
//!
//! # Example
//!
//! ```rust,no_run
//! use zenwebp_anim::mux::{BlendMethod, DisposeMethod, LoopCount, MuxFrame, WebPMux};
//!
//! let mut mux = WebPMux::new(320, 240);
//! mux.set_animation([0, 0, 0, 0], LoopCount::Forever);
//!
//! mux.push_frame(MuxFrame {
//!     x_offset: 0,
//!     y_offset: 0,
//!     width: 320,
//!     height: 240,
//!     duration_ms: 100,
//!     dispose: DisposeMethod::Background,
//!     blend: BlendMethod::Overwrite,
//!     bitstream: vec![], // VP8L data here
//!     alpha_data: None,
//!     is_lossless: true,
//! })?;
//!
//! let webp_bytes = mux.assemble()?;
//! # Ok::<(), zenwebp_anim::mux::MuxError>(())
//! ```

use super::demux::{BlendMethod, DemuxFrame, DisposeMethod, LoopCount};
use super::error::MuxError;
use super::vec_writer::{chunk_size, write_chunk, VecWriter};

/// Largest value the 24-bit ANMF duration field can hold.
pub const MAX_FRAME_DURATION_MS: u32 = 0x00FF_FFFF;

/// Largest canvas or frame dimension WebP can express.
pub const MAX_DIMENSION: u32 = 16384;

/// A single frame to be muxed into a WebP container.
#[derive(Debug, Clone)]
pub struct MuxFrame {
    /// Horizontal offset on the canvas. Must be even.
    pub x_offset: u32,
    /// Vertical offset on the canvas. Must be even.
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame duration in milliseconds (max 16777215).
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Raw VP8 or VP8L bitstream data.
    pub bitstream: Vec<u8>,
    /// Raw ALPH chunk payload (for lossy frames with separate alpha).
    pub alpha_data: Option<Vec<u8>>,
    /// Whether the bitstream is VP8L (lossless). `false` means VP8 (lossy).
    pub is_lossless: bool,
}

impl MuxFrame {
    /// Copy a demuxed frame's bitstream into an owned mux frame.
    pub fn from_demux(frame: &DemuxFrame<'_>) -> Self {
        Self {
            x_offset: frame.x_offset,
            y_offset: frame.y_offset,
            width: frame.width,
            height: frame.height,
            duration_ms: frame.duration_ms,
            dispose: frame.dispose,
            blend: frame.blend,
            bitstream: frame.bitstream.to_vec(),
            alpha_data: frame.alpha_data.map(<[u8]>::to_vec),
            is_lossless: !frame.is_lossy,
        }
    }
}

/// WebP container assembler.
///
/// Collects encoded frames, an optional ICC profile and animation parameters,
/// then writes the smallest container layout that can hold them: a bare
/// `VP8 `/`VP8L` chunk when possible, `VP8X` otherwise.
#[derive(Debug, Clone)]
pub struct WebPMux {
    canvas_width: u32,
    canvas_height: u32,
    animation: Option<AnimationHeader>,
    frames: Vec<MuxFrame>,
    single_image: Option<MuxFrame>,
    icc_profile: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
struct AnimationHeader {
    background_color: [u8; 4],
    loop_count: LoopCount,
}

impl WebPMux {
    /// Start a container for a `width` x `height` canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            animation: None,
            frames: Vec::new(),
            single_image: None,
            icc_profile: None,
        }
    }

    /// Embed an ICC profile.
    pub fn set_icc_profile(&mut self, data: Vec<u8>) {
        self.icc_profile = Some(data);
    }

    /// Turn the output into an animation.
    ///
    /// `background_color` is stored as given (BGRA byte order).
    pub fn set_animation(&mut self, background_color: [u8; 4], loop_count: LoopCount) {
        self.animation = Some(AnimationHeader {
            background_color,
            loop_count,
        });
    }

    /// Append an animation frame after validating its placement.
    pub fn push_frame(&mut self, frame: MuxFrame) -> Result<(), MuxError> {
        if frame.x_offset % 2 != 0 || frame.y_offset % 2 != 0 {
            return Err(MuxError::OddFrameOffset {
                x: frame.x_offset,
                y: frame.y_offset,
            });
        }
        if !(1..=MAX_DIMENSION).contains(&frame.width) || !(1..=MAX_DIMENSION).contains(&frame.height) {
            return Err(MuxError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        let right = u64::from(frame.x_offset) + u64::from(frame.width);
        let bottom = u64::from(frame.y_offset) + u64::from(frame.height);
        if right > u64::from(self.canvas_width) || bottom > u64::from(self.canvas_height) {
            return Err(MuxError::FrameOutsideCanvas {
                x: frame.x_offset,
                y: frame.y_offset,
                width: frame.width,
                height: frame.height,
                canvas_width: self.canvas_width,
                canvas_height: self.canvas_height,
            });
        }
        if frame.duration_ms > MAX_FRAME_DURATION_MS {
            return Err(MuxError::DurationTooLong {
                duration_ms: frame.duration_ms,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Use `frame` as the image of a still container.
    pub fn set_image(&mut self, frame: MuxFrame) {
        self.single_image = Some(frame);
    }

    /// Number of animation frames pushed so far.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Write the complete file.
    pub fn assemble(&self) -> Result<Vec<u8>, MuxError> {
        if !(1..=MAX_DIMENSION).contains(&self.canvas_width)
            || !(1..=MAX_DIMENSION).contains(&self.canvas_height)
        {
            return Err(MuxError::InvalidDimensions {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        let body = match self.animation {
            Some(header) => self.animated_body(header)?,
            None => self.still_body()?,
        };

        let mut out = Vec::with_capacity(body.len() + 12);
        out.write_all(b"RIFF");
        out.write_u32_le(body.len() as u32 + 4);
        out.write_all(b"WEBP");
        out.write_all(&body);
        Ok(out)
    }

    fn still_body(&self) -> Result<Vec<u8>, MuxError> {
        let frame = self.single_image.as_ref().ok_or(MuxError::NoFrames)?;
        let mut body = Vec::new();

        if self.icc_profile.is_none() && frame.alpha_data.is_none() {
            write_chunk(&mut body, bitstream_fourcc(frame), &frame.bitstream);
            return Ok(body);
        }

        self.write_vp8x(&mut body, frame.is_lossless || frame.alpha_data.is_some());
        if let Some(alpha) = &frame.alpha_data {
            write_chunk(&mut body, b"ALPH", alpha);
        }
        write_chunk(&mut body, bitstream_fourcc(frame), &frame.bitstream);
        Ok(body)
    }

    fn animated_body(&self, header: AnimationHeader) -> Result<Vec<u8>, MuxError> {
        if self.frames.is_empty() {
            return Err(MuxError::NoFrames);
        }
        let mut body = Vec::new();

        let has_alpha = self
            .frames
            .iter()
            .any(|f| f.is_lossless || f.alpha_data.is_some());
        self.write_vp8x(&mut body, has_alpha);

        let mut anim = Vec::with_capacity(6);
        anim.write_all(&header.background_color);
        anim.write_u16_le(header.loop_count.to_raw());
        write_chunk(&mut body, b"ANIM", &anim);

        for frame in &self.frames {
            write_chunk(&mut body, b"ANMF", &anmf_payload(frame));
        }
        Ok(body)
    }

    /// `VP8X` header chunk, followed by `ICCP` when a profile is set.
    fn write_vp8x(&self, body: &mut Vec<u8>, has_alpha: bool) {
        let mut flags = 0u8;
        if self.icc_profile.is_some() {
            flags |= 0b0010_0000;
        }
        if has_alpha {
            flags |= 0b0001_0000;
        }
        if self.animation.is_some() {
            flags |= 0b0000_0010;
        }

        let mut vp8x = Vec::with_capacity(10);
        vp8x.write_all(&[flags, 0, 0, 0]);
        vp8x.write_u24_le(self.canvas_width - 1);
        vp8x.write_u24_le(self.canvas_height - 1);
        write_chunk(body, b"VP8X", &vp8x);

        if let Some(icc) = &self.icc_profile {
            write_chunk(body, b"ICCP", icc);
        }
    }
}

fn bitstream_fourcc(frame: &MuxFrame) -> &'static [u8; 4] {
    if frame.is_lossless {
        b"VP8L"
    } else {
        b"VP8 "
    }
}

/// ANMF payload: placement, duration and flags, then the frame's chunks.
fn anmf_payload(frame: &MuxFrame) -> Vec<u8> {
    let mut payload = Vec::with_capacity(16 + chunk_size(frame.bitstream.len()) as usize);
    payload.write_u24_le(frame.x_offset / 2);
    payload.write_u24_le(frame.y_offset / 2);
    payload.write_u24_le(frame.width - 1);
    payload.write_u24_le(frame.height - 1);
    payload.write_u24_le(frame.duration_ms);

    let dispose = u8::from(frame.dispose == DisposeMethod::Background);
    let no_blend = u8::from(frame.blend == BlendMethod::Overwrite) << 1;
    payload.push(dispose | no_blend);

    if let Some(alpha) = &frame.alpha_data {
        write_chunk(&mut payload, b"ALPH", alpha);
    }
    write_chunk(&mut payload, bitstream_fourcc(frame), &frame.bitstream);
    payload
}

/// Wrap one frame's fragment into a standalone still WebP file.
///
/// The still is sized to the frame rectangle, which is what a pixel decoder
/// needs to reconstruct the fragment on its own.
pub fn wrap_fragment(frame: &DemuxFrame<'_>) -> Result<Vec<u8>, MuxError> {
    let mut mux = WebPMux::new(frame.width, frame.height);
    let mut still = MuxFrame::from_demux(frame);
    still.x_offset = 0;
    still.y_offset = 0;
    mux.set_image(still);
    mux.assemble()
}

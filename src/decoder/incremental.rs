//! Incremental decoding of a still-arriving byte stream.
//!
//! Still images stream through [`StillStream`]. The pixel decoder works on
//! whole files, so a still has no image until its last byte arrives. When
//! the header turns out to declare an animation, the decoder switches to
//! rebuilding the container view and frame table from the whole buffer on
//! every feed and exposes the first frame once its bytes are complete.

use log::{debug, trace};

use super::canvas::Canvas;
use super::config::DecodeConfig;
use super::graph::{FrameTable, TableMode};
use super::session::{decode_frame, rgba_to_bitmap};
use crate::bitmap::{Bitmap, PixelLayout};
use crate::codec::{CodecError, RgbaFrame, StillStream, StreamStatus};
use crate::error::DecodeError;
use crate::mux::{MuxError, WebPDemuxer};
use crate::scale::scale_bitmap;

/// Where an [`IncrementalDecoder`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalState {
    /// The header has not arrived yet.
    AwaitingBytes,
    /// A still image is being received.
    StaticStreaming,
    /// The container is animated; only the first frame is exposed.
    AnimatedDetected,
    /// Input is finished or a hard error occurred. Further feeds are ignored.
    Done,
}

/// Incremental decoder fed by a single producer.
///
/// # Example
///
/// ```rust,no_run
/// use zenwebp_anim::{DecodeConfig, IncrementalDecoder};
///
/// let chunks: Vec<Vec<u8>> = Vec::new(); // data as it arrives
/// let mut decoder = IncrementalDecoder::new(DecodeConfig::default());
/// for (i, chunk) in chunks.iter().enumerate() {
///     decoder.feed(chunk, i + 1 == chunks.len())?;
///     if let Some(image) = decoder.current_image() {
///         println!("{}x{} so far", image.width(), image.height());
///     }
/// }
/// # Ok::<(), zenwebp_anim::DecodeError>(())
/// ```
#[derive(Debug)]
pub struct IncrementalDecoder {
    config: DecodeConfig,
    state: IncrementalState,
    stream: StillStream,
    buffer: Vec<u8>,
    image: Option<Bitmap>,
    frames_available: usize,
}

impl IncrementalDecoder {
    /// Create a decoder with no data.
    pub fn new(config: DecodeConfig) -> Self {
        Self {
            config,
            state: IncrementalState::AwaitingBytes,
            stream: StillStream::new(),
            buffer: Vec::new(),
            image: None,
            frames_available: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IncrementalState {
        self.state
    }

    /// The best image available so far.
    ///
    /// `None` until at least one row (still) or the first frame (animation)
    /// is complete.
    pub fn current_image(&self) -> Option<&Bitmap> {
        self.image.as_ref()
    }

    /// Number of complete frames seen in an animated stream.
    pub fn frames_available(&self) -> usize {
        self.frames_available
    }

    /// Append bytes. `finished` signals that no more data will follow.
    ///
    /// Hard errors move the decoder to [`IncrementalState::Done`] and are
    /// returned once; later feeds are no-ops.
    pub fn feed(&mut self, bytes: &[u8], finished: bool) -> Result<IncrementalState, DecodeError> {
        if self.state == IncrementalState::Done {
            return Ok(self.state);
        }

        if let Err(e) = self.advance(bytes) {
            debug!("incremental decode failed: {}", e);
            self.state = IncrementalState::Done;
            return Err(e);
        }

        if finished && self.state != IncrementalState::Done {
            self.state = IncrementalState::Done;
            if self.image.is_none() {
                return Err(DecodeError::Incomplete);
            }
        }
        Ok(self.state)
    }

    fn advance(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        match self.state {
            IncrementalState::AwaitingBytes | IncrementalState::StaticStreaming => {
                match self.stream.append(bytes) {
                    Ok(StreamStatus::NeedMoreData) => {
                        self.check_buffered(self.stream.bytes_buffered())?;
                    }
                    Ok(StreamStatus::HeaderReady) => {
                        self.check_buffered(self.stream.bytes_buffered())?;
                        self.enter_static()?;
                    }
                    Ok(_) => {
                        self.enter_static()?;
                        self.refresh_static();
                        self.state = IncrementalState::Done;
                    }
                    Err(CodecError::UnsupportedFeature(feature)) => {
                        debug!("switching to frame-level decode: {}", feature);
                        self.buffer = std::mem::take(&mut self.stream).into_inner();
                        self.state = IncrementalState::AnimatedDetected;
                        self.refresh_animated()?;
                    }
                    Err(e) => return Err(DecodeError::from_codec(0, e)),
                }
            }
            IncrementalState::AnimatedDetected => {
                self.buffer.extend_from_slice(bytes);
                self.refresh_animated()?;
            }
            IncrementalState::Done => {}
        }
        Ok(())
    }

    fn check_buffered(&self, len: usize) -> Result<(), DecodeError> {
        self.config.limits.check_file_size(len)
    }

    fn enter_static(&mut self) -> Result<(), DecodeError> {
        if self.state == IncrementalState::AwaitingBytes {
            if let Some((w, h)) = self.stream.dimensions() {
                self.config.limits.check_dimensions(w, h)?;
                trace!("still header {}x{}", w, h);
            }
            self.state = IncrementalState::StaticStreaming;
        }
        Ok(())
    }

    fn refresh_static(&mut self) {
        let rows = self.stream.rows_decoded();
        let has_alpha = self.stream.has_alpha().unwrap_or(true);
        if let Some(frame) = self.stream.image() {
            if let Some(bitmap) = partial_bitmap(frame, rows, has_alpha) {
                self.image = Some(self.finish(bitmap));
            }
        }
    }

    fn refresh_animated(&mut self) -> Result<(), DecodeError> {
        self.check_buffered(self.buffer.len())?;
        let demuxer = match WebPDemuxer::new(&self.buffer) {
            Ok(demuxer) => demuxer,
            Err(MuxError::UnexpectedEof) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.config
            .limits
            .check_dimensions(demuxer.canvas_width(), demuxer.canvas_height())?;

        let table = FrameTable::build(&demuxer, TableMode::SkipIncomplete)?;
        self.config.limits.check_frame_count(table.len())?;
        self.frames_available = table.len();
        trace!("{} complete frames in {} bytes", table.len(), self.buffer.len());

        if self.image.is_some() {
            return Ok(());
        }
        let Some(poster) = table.get(0) else {
            return Ok(());
        };

        let pixels = decode_frame(&demuxer, poster)?;
        let mut canvas = Canvas::new(demuxer.canvas_width(), demuxer.canvas_height());
        canvas.draw(poster, &pixels);
        let layout = if demuxer.has_alpha() {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        };
        let bitmap = canvas.snapshot(layout);
        self.image = Some(self.finish(bitmap));
        Ok(())
    }

    fn finish(&self, bitmap: Bitmap) -> Bitmap {
        scale_bitmap(
            bitmap.with_scale(self.config.effective_scale()),
            self.config.target_pixel_size,
            self.config.preserve_aspect_ratio,
        )
    }
}

/// Expose rows `[0, rows)` of `frame`; rows below are transparent.
fn partial_bitmap(frame: &RgbaFrame, rows: u32, has_alpha: bool) -> Option<Bitmap> {
    let rows = rows.min(frame.height);
    if rows == 0 {
        return None;
    }
    if rows == frame.height {
        let layout = if has_alpha {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        };
        return Some(rgba_to_bitmap(frame.clone(), layout));
    }

    let visible = rows as usize * frame.width as usize * 4;
    let mut pixels = vec![0u8; frame.pixels.len()];
    pixels[..visible].copy_from_slice(&frame.pixels[..visible]);
    Some(Bitmap::from_raw_parts(
        frame.width,
        frame.height,
        PixelLayout::Rgba8,
        pixels,
    ))
}

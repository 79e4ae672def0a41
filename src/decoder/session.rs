//! Random-access decoding session.
//!
//! [`AnimatedWebP`] composites any frame on request. Consecutive requests
//! draw only the new frame on top of the resident composite; any other
//! request clears the canvas and replays from the frame's blend-from index.

use std::time::Duration;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use super::canvas::Canvas;
use super::config::DecodeConfig;
use super::graph::{FrameDescriptor, FrameTable, TableMode};
use crate::bitmap::{AnimationFrame, Bitmap, PixelLayout};
use crate::codec::{decode_fragment, RgbaFrame};
use crate::error::DecodeError;
use crate::mux::{LoopCount, MuxError, WebPDemuxer};
use crate::scale::scale_bitmap;

/// Mutable compositing state, guarded by the session mutex.
#[derive(Debug)]
struct SessionState {
    canvas: Canvas,
    /// Index whose composite the canvas currently holds.
    current: Option<usize>,
}

#[derive(Debug)]
enum Source {
    Static,
    Animated {
        table: FrameTable,
        state: Mutex<SessionState>,
    },
}

/// A decoding session over a complete WebP file.
///
/// `frame_at` may be called from several threads; calls are serialized.
///
/// # Example
///
/// ```rust,no_run
/// use zenwebp_anim::AnimatedWebP;
///
/// let data: &[u8] = &[]; // your WebP data
/// let session = AnimatedWebP::open(data)?;
/// for i in 0..session.frame_count() {
///     let frame = session.frame_at(i)?;
///     println!("frame {i}: {:?} for {:?}", (frame.width(), frame.height()), session.duration_at(i)?);
/// }
/// # Ok::<(), zenwebp_anim::DecodeError>(())
/// ```
#[derive(Debug)]
pub struct AnimatedWebP<'a> {
    demuxer: WebPDemuxer<'a>,
    config: DecodeConfig,
    source: Source,
}

impl<'a> AnimatedWebP<'a> {
    /// Open a session with default configuration.
    pub fn open(data: &'a [u8]) -> Result<Self, DecodeError> {
        Self::open_with_config(data, &DecodeConfig::default())
    }

    /// Open a session, validating limits and analyzing the frame table.
    pub fn open_with_config(data: &'a [u8], config: &DecodeConfig) -> Result<Self, DecodeError> {
        config.limits.check_file_size(data.len())?;
        let demuxer = WebPDemuxer::new(data)?;
        config
            .limits
            .check_dimensions(demuxer.canvas_width(), demuxer.canvas_height())?;

        let source = if demuxer.is_animated() {
            let table = FrameTable::build(&demuxer, TableMode::Strict)?;
            config.limits.check_frame_count(table.len())?;
            if table.is_empty() {
                return Err(MuxError::NoFrames.into());
            }
            debug!(
                "opened animation {}x{}, {} frames, loop {}",
                demuxer.canvas_width(),
                demuxer.canvas_height(),
                table.len(),
                demuxer.loop_count()
            );
            Source::Animated {
                table,
                state: Mutex::new(SessionState {
                    canvas: Canvas::new(demuxer.canvas_width(), demuxer.canvas_height()),
                    current: None,
                }),
            }
        } else {
            debug!(
                "opened still image {}x{}",
                demuxer.canvas_width(),
                demuxer.canvas_height()
            );
            Source::Static
        };

        Ok(Self {
            demuxer,
            config: config.clone(),
            source,
        })
    }

    /// Number of frames. Still images have one.
    pub fn frame_count(&self) -> usize {
        match &self.source {
            Source::Static => 1,
            Source::Animated { table, .. } => table.len(),
        }
    }

    /// How many times the animation plays.
    pub fn loop_count(&self) -> LoopCount {
        self.demuxer.loop_count()
    }

    /// Presented duration of a frame. Still images report zero.
    pub fn duration_at(&self, index: usize) -> Result<Duration, DecodeError> {
        self.check_index(index)?;
        Ok(match &self.source {
            Source::Static => Duration::ZERO,
            Source::Animated { table, .. } => table
                .get(index)
                .map_or(Duration::ZERO, |desc| desc.duration),
        })
    }

    /// Canvas size in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.demuxer.canvas_width(), self.demuxer.canvas_height())
    }

    /// Whether the container declares alpha.
    pub fn has_alpha(&self) -> bool {
        self.demuxer.has_alpha()
    }

    /// Whether the container is animated.
    pub fn is_animated(&self) -> bool {
        matches!(self.source, Source::Animated { .. })
    }

    /// Embedded ICC profile, if any.
    pub fn icc_profile(&self) -> Option<&'a [u8]> {
        self.demuxer.icc_profile()
    }

    /// Analyzed metadata of an animation frame.
    pub fn frame_info(&self, index: usize) -> Option<&FrameDescriptor> {
        match &self.source {
            Source::Static => None,
            Source::Animated { table, .. } => table.get(index),
        }
    }

    /// The frame table of an animation.
    pub fn frame_table(&self) -> Option<&FrameTable> {
        match &self.source {
            Source::Static => None,
            Source::Animated { table, .. } => Some(table),
        }
    }

    /// Composite frame `index` on the full canvas.
    pub fn frame_at(&self, index: usize) -> Result<Bitmap, DecodeError> {
        self.check_index(index)?;
        let bitmap = match &self.source {
            Source::Static => self.decode_still()?,
            Source::Animated { table, state } => {
                let mut state = state.lock();
                state.composite(&self.demuxer, table, index, self.snapshot_layout())?
            }
        };
        Ok(self.finish(bitmap))
    }

    /// Composite every frame in order, skipping frames that fail to decode.
    ///
    /// Fails only when no frame at all could be produced.
    pub(crate) fn composite_all(&self) -> Result<Vec<AnimationFrame>, DecodeError> {
        let Source::Animated { table, state } = &self.source else {
            let bitmap = self.frame_at(0)?;
            return Ok(vec![AnimationFrame {
                bitmap,
                duration: Duration::ZERO,
            }]);
        };

        let layout = self.snapshot_layout();
        let mut state = state.lock();
        state.canvas.clear();
        state.current = None;

        let mut frames = Vec::with_capacity(table.len());
        let mut first_error = None;
        for desc in table.descriptors() {
            match decode_frame(&self.demuxer, desc) {
                Ok(pixels) => {
                    let bitmap = state.present(desc, &pixels, layout);
                    frames.push(AnimationFrame {
                        bitmap: self.finish(bitmap),
                        duration: desc.duration,
                    });
                }
                Err(e) => {
                    warn!("skipping frame {}: {}", desc.index, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        // The canvas no longer matches any single frame once one was skipped.
        if first_error.is_some() {
            state.canvas.clear();
            state.current = None;
        }

        match first_error {
            Some(e) if frames.is_empty() => Err(e),
            _ => Ok(frames),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), DecodeError> {
        let count = self.frame_count();
        if index >= count {
            return Err(DecodeError::OutOfRange { index, count });
        }
        Ok(())
    }

    fn snapshot_layout(&self) -> PixelLayout {
        if self.demuxer.has_alpha() {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        }
    }

    fn decode_still(&self) -> Result<Bitmap, DecodeError> {
        let frame = self
            .demuxer
            .frame(1)
            .ok_or_else(|| MuxError::InvalidFormat("missing image chunk".into()))?;
        let pixels = decode_fragment(&frame)
            .map_err(|e| DecodeError::from_codec(0, e))?;
        let layout = if self.demuxer.has_alpha() || pixels.has_alpha {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        };
        Ok(rgba_to_bitmap(pixels, layout))
    }

    fn finish(&self, bitmap: Bitmap) -> Bitmap {
        scale_bitmap(
            bitmap.with_scale(self.config.effective_scale()),
            self.config.target_pixel_size,
            self.config.preserve_aspect_ratio,
        )
    }
}

impl SessionState {
    fn composite(
        &mut self,
        demuxer: &WebPDemuxer<'_>,
        table: &FrameTable,
        index: usize,
        layout: PixelLayout,
    ) -> Result<Bitmap, DecodeError> {
        let frames = table.descriptors();
        let target = &frames[index];

        if self.current.map(|c| c + 1) == Some(index) {
            trace!("frame {}: sequential", index);
            let pixels = decode_frame(demuxer, target)?;
            return Ok(self.present(target, &pixels, layout));
        }

        let start = target.blend_from_index;
        debug!("frame {}: replaying from {}", index, start);
        if self.canvas.is_dirty() {
            self.canvas.clear();
        }
        self.current = None;

        for desc in &frames[start..index] {
            let pixels = decode_frame(demuxer, desc)?;
            self.canvas.draw(desc, &pixels);
            self.canvas.dispose(desc);
        }
        let pixels = decode_frame(demuxer, target)?;
        Ok(self.present(target, &pixels, layout))
    }

    /// Draw, snapshot, then dispose.
    fn present(&mut self, desc: &FrameDescriptor, pixels: &RgbaFrame, layout: PixelLayout) -> Bitmap {
        self.canvas.draw(desc, pixels);
        let snapshot = self.canvas.snapshot(layout);
        self.canvas.dispose(desc);
        self.current = Some(desc.index);
        snapshot
    }
}

pub(crate) fn decode_frame(
    demuxer: &WebPDemuxer<'_>,
    desc: &FrameDescriptor,
) -> Result<RgbaFrame, DecodeError> {
    let frame = demuxer.frame(desc.frame_num).ok_or(MuxError::IncompleteFrame {
        index: desc.index as u32,
    })?;
    decode_fragment(&frame).map_err(|e| DecodeError::from_codec(desc.index, e))
}

pub(crate) fn rgba_to_bitmap(frame: RgbaFrame, layout: PixelLayout) -> Bitmap {
    let pixels = match layout {
        PixelLayout::Rgba8 => frame.pixels,
        PixelLayout::Rgb8 => frame
            .pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
    };
    Bitmap::from_raw_parts(frame.width, frame.height, layout, pixels)
}

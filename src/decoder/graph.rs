//! Frame descriptor table and blend-from analysis.
//!
//! For every frame the table records the earliest frame from which a clean
//! replay reproduces its composite (`blend_from_index`). A frame that covers
//! the whole canvas and does not blend starts a new chain; a full-canvas frame
//! that is disposed after display makes the *next* frame start one.

use std::time::Duration;

use crate::error::DecodeError;
use crate::mux::{BlendMethod, DemuxFrame, DisposeMethod, MuxError, WebPDemuxer};

/// Raw durations at or below this are treated as [`DEFAULT_FRAME_DURATION`].
pub const MIN_FRAME_DURATION_MS: u32 = 10;

/// Duration substituted for near-zero raw durations.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(100);

/// Map a raw container duration to the presented duration.
pub fn normalize_duration(raw_ms: u32) -> Duration {
    if raw_ms <= MIN_FRAME_DURATION_MS {
        DEFAULT_FRAME_DURATION
    } else {
        Duration::from_millis(u64::from(raw_ms))
    }
}

/// How the analyzer treats frames whose bytes have not all arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Every declared frame must be present and complete.
    Strict,
    /// Incomplete frames are left out of the table.
    SkipIncomplete,
}

/// Raw per-frame header fields, as read from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Horizontal offset on the canvas.
    pub x_offset: u32,
    /// Vertical offset on the canvas.
    pub y_offset: u32,
    /// Duration in milliseconds, as stored.
    pub duration_ms: u32,
    /// Whether the frame's pixels carry transparency.
    pub has_alpha: bool,
    /// Alpha-blend onto the canvas (`false` = overwrite).
    pub blend: bool,
    /// Clear the frame rectangle after display.
    pub dispose: bool,
}

impl From<&DemuxFrame<'_>> for FrameHeader {
    fn from(frame: &DemuxFrame<'_>) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            x_offset: frame.x_offset,
            y_offset: frame.y_offset,
            duration_ms: frame.duration_ms,
            has_alpha: frame.has_alpha,
            blend: frame.blend == BlendMethod::AlphaBlend,
            dispose: frame.dispose == DisposeMethod::Background,
        }
    }
}

/// Analyzed per-frame metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Zero-based position in the table.
    pub index: usize,
    /// Presented duration, after normalization.
    pub duration: Duration,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Horizontal offset on the canvas.
    pub x_offset: u32,
    /// Vertical offset on the canvas.
    pub y_offset: u32,
    /// Whether the frame's pixels carry transparency.
    pub has_alpha: bool,
    /// Whether the frame covers the whole canvas.
    pub is_full_size: bool,
    /// Alpha-blend onto the canvas (`false` = overwrite).
    pub should_blend: bool,
    /// Clear the frame rectangle after display.
    pub should_dispose: bool,
    /// First frame to replay from a clear canvas to reproduce this composite.
    pub blend_from_index: usize,
    /// 1-based frame number in the container.
    pub(crate) frame_num: u32,
}

/// Immutable, index-addressable table of frame descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTable {
    canvas_width: u32,
    canvas_height: u32,
    frames: Vec<FrameDescriptor>,
    next_blend_index: usize,
}

impl FrameTable {
    /// Build the table for an animated container.
    pub fn build(demuxer: &WebPDemuxer<'_>, mode: TableMode) -> Result<Self, DecodeError> {
        let declared = demuxer.num_frames();
        if mode == TableMode::Strict && demuxer.is_truncated() {
            return Err(MuxError::UnexpectedEof.into());
        }

        let mut headers = Vec::with_capacity(declared as usize);
        let mut skipped = 0u32;
        for n in 1..=declared {
            let Some(frame) = demuxer.frame(n) else {
                break;
            };
            if frame.complete {
                headers.push((n, FrameHeader::from(&frame)));
            } else if mode == TableMode::SkipIncomplete {
                skipped += 1;
            } else {
                return Err(MuxError::IncompleteFrame { index: n - 1 }.into());
            }
        }

        let parsed = headers.len() as u32;
        if parsed != declared - skipped {
            return Err(MuxError::FrameCountMismatch {
                declared: declared - skipped,
                parsed,
            }
            .into());
        }

        Self::analyze(demuxer.canvas_width(), demuxer.canvas_height(), headers)
    }

    /// Build a table from raw headers in presentation order.
    pub fn from_headers(
        canvas_width: u32,
        canvas_height: u32,
        headers: impl IntoIterator<Item = FrameHeader>,
    ) -> Result<Self, DecodeError> {
        Self::analyze(
            canvas_width,
            canvas_height,
            headers.into_iter().zip(1u32..).map(|(h, n)| (n, h)),
        )
    }

    fn analyze(
        canvas_width: u32,
        canvas_height: u32,
        headers: impl IntoIterator<Item = (u32, FrameHeader)>,
    ) -> Result<Self, DecodeError> {
        let mut frames = Vec::new();
        let mut last_blend_index = 0usize;

        for (index, (frame_num, h)) in headers.into_iter().enumerate() {
            let right = u64::from(h.x_offset) + u64::from(h.width);
            let bottom = u64::from(h.y_offset) + u64::from(h.height);
            if right > u64::from(canvas_width) || bottom > u64::from(canvas_height) {
                return Err(MuxError::FrameOutsideCanvas {
                    x: h.x_offset,
                    y: h.y_offset,
                    width: h.width,
                    height: h.height,
                    canvas_width,
                    canvas_height,
                }
                .into());
            }

            let is_full_size = h.width == canvas_width
                && h.height == canvas_height
                && h.x_offset == 0
                && h.y_offset == 0;

            let blend_from_index = if (!h.blend || !h.has_alpha) && is_full_size {
                last_blend_index = index;
                index
            } else if h.dispose && is_full_size {
                let from = last_blend_index;
                last_blend_index = index + 1;
                from
            } else {
                last_blend_index
            };

            frames.push(FrameDescriptor {
                index,
                duration: normalize_duration(h.duration_ms),
                width: h.width,
                height: h.height,
                x_offset: h.x_offset,
                y_offset: h.y_offset,
                has_alpha: h.has_alpha,
                is_full_size,
                should_blend: h.blend,
                should_dispose: h.dispose,
                blend_from_index,
                frame_num,
            });
        }

        Ok(Self {
            canvas_width,
            canvas_height,
            frames,
            next_blend_index: last_blend_index,
        })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the table holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<&FrameDescriptor> {
        self.frames.get(index)
    }

    /// All descriptors in presentation order.
    pub fn descriptors(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    /// Canvas size the table was analyzed against.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// The blend-from index a frame appended after the last one would start with.
    pub fn next_blend_index(&self) -> usize {
        self.next_blend_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u32, height: u32, x: u32, y: u32, blend: bool, dispose: bool) -> FrameHeader {
        FrameHeader {
            width,
            height,
            x_offset: x,
            y_offset: y,
            duration_ms: 50,
            has_alpha: true,
            blend,
            dispose,
        }
    }

    #[test]
    fn durations_are_normalized() {
        assert_eq!(normalize_duration(0), Duration::from_millis(100));
        assert_eq!(normalize_duration(10), Duration::from_millis(100));
        assert_eq!(normalize_duration(11), Duration::from_millis(11));
        assert_eq!(normalize_duration(40), Duration::from_millis(40));
    }

    #[test]
    fn keyframe_patch_dispose_chain() {
        let table = FrameTable::from_headers(
            8,
            8,
            [
                header(8, 8, 0, 0, false, false),
                header(2, 2, 2, 2, true, false),
                header(8, 8, 0, 0, true, true),
            ],
        )
        .unwrap();
        let from: Vec<_> = table.descriptors().iter().map(|d| d.blend_from_index).collect();
        assert_eq!(from, [0, 0, 0]);
        assert_eq!(table.next_blend_index(), 3);

        let extended = FrameTable::from_headers(
            8,
            8,
            [
                header(8, 8, 0, 0, false, false),
                header(2, 2, 2, 2, true, false),
                header(8, 8, 0, 0, true, true),
                header(2, 2, 4, 4, true, false),
            ],
        )
        .unwrap();
        assert_eq!(extended.get(3).unwrap().blend_from_index, 3);
    }

    #[test]
    fn opaque_full_frame_restarts_chain() {
        let mut opaque = header(8, 8, 0, 0, true, false);
        opaque.has_alpha = false;
        let table = FrameTable::from_headers(
            8,
            8,
            [
                header(8, 8, 0, 0, false, false),
                header(2, 2, 0, 0, true, false),
                opaque,
                header(2, 2, 0, 0, true, false),
            ],
        )
        .unwrap();
        let from: Vec<_> = table.descriptors().iter().map(|d| d.blend_from_index).collect();
        assert_eq!(from, [0, 0, 2, 2]);
    }

    #[test]
    fn blend_from_never_exceeds_index() {
        let headers = (0..20u32).map(|i| {
            let full = i % 3 == 0;
            let (w, x) = if full { (8, 0) } else { (2, 2) };
            header(w, w, x, x, i % 2 == 0, i % 5 == 0)
        });
        let table = FrameTable::from_headers(8, 8, headers).unwrap();
        for d in table.descriptors() {
            assert!(d.blend_from_index <= d.index);
        }
    }

    #[test]
    fn frame_outside_canvas_is_malformed() {
        let result = FrameTable::from_headers(8, 8, [header(4, 4, 6, 0, true, false)]);
        assert!(matches!(
            result,
            Err(DecodeError::MalformedContainer(MuxError::FrameOutsideCanvas { .. }))
        ));
    }
}

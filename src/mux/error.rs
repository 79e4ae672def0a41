//! Error types for mux/demux operations.

use thiserror::Error;

/// Errors that can occur while parsing or assembling a WebP container.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MuxError {
    /// The data is not a valid WebP file.
    #[error("Invalid WebP format: {0}")]
    InvalidFormat(String),

    /// The data ends before the container headers are complete.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Frame dimensions are invalid (zero, too large, or don't fit the canvas).
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// The invalid width.
        width: u32,
        /// The invalid height.
        height: u32,
    },

    /// No frames were added before assembly.
    #[error("No frames to assemble")]
    NoFrames,

    /// Frame offset is odd. ANMF stores offsets halved.
    #[error("Frame offset must be even: ({x}, {y})")]
    OddFrameOffset {
        /// The invalid x offset.
        x: u32,
        /// The invalid y offset.
        y: u32,
    },

    /// Frame extends beyond the canvas boundary.
    #[error(
        "Frame at ({x}, {y}) size {width}x{height} exceeds canvas {canvas_width}x{canvas_height}"
    )]
    FrameOutsideCanvas {
        /// Frame x offset.
        x: u32,
        /// Frame y offset.
        y: u32,
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
        /// Canvas width.
        canvas_width: u32,
        /// Canvas height.
        canvas_height: u32,
    },

    /// Frame duration does not fit the 24-bit ANMF field.
    #[error("Frame duration {duration_ms}ms exceeds the 24-bit limit")]
    DurationTooLong {
        /// The rejected duration in milliseconds.
        duration_ms: u32,
    },

    /// Fewer frames could be parsed than the container declares.
    #[error("Container declares {declared} frames but {parsed} could be read")]
    FrameCountMismatch {
        /// Number of ANMF chunks present in the container.
        declared: u32,
        /// Number of frames that parsed successfully.
        parsed: u32,
    },

    /// A frame's data ends before its declared size.
    #[error("Frame {index} is incomplete")]
    IncompleteFrame {
        /// Zero-based index of the incomplete frame.
        index: u32,
    },
}

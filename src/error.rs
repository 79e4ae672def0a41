//! Error types for decoding and encoding.

use thiserror::Error;

use crate::codec::CodecError;
use crate::mux::MuxError;

/// Errors that can occur while decoding an animated or still WebP.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The container structure is invalid or inconsistent.
    #[error("Malformed container: {0}")]
    MalformedContainer(#[from] MuxError),

    /// The input uses a feature this decoder does not handle.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A frame's fragment could not be decoded.
    #[error("Frame {index} failed to decode: {source}")]
    FrameDecode {
        /// Zero-based frame index.
        index: usize,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// The requested frame does not exist.
    #[error("Frame index {index} out of range (frame count {count})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of frames available.
        count: usize,
    },

    /// A configured resource limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// The data ended before a usable image was available.
    #[error("Image data is incomplete")]
    Incomplete,
}

/// Errors that can occur while encoding an animation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The frame list is empty.
    #[error("No frames to encode")]
    NoFrames,

    /// A frame's size differs from the canvas size set by the first frame.
    #[error("Frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    InvalidDimensions {
        /// Zero-based frame index.
        index: usize,
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
        /// Canvas width.
        expected_width: u32,
        /// Canvas height.
        expected_height: u32,
    },

    /// A frame could not be encoded.
    #[error("Frame {index} failed to encode: {source}")]
    FrameEncode {
        /// Zero-based frame index.
        index: usize,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// Container assembly failed.
    #[error(transparent)]
    Container(#[from] MuxError),

    /// A frame could not be brought under the byte budget.
    #[error("Frame {index} is {size} bytes, over the {limit} byte limit")]
    OutputTooLarge {
        /// Zero-based frame index.
        index: usize,
        /// Smallest size reached.
        size: usize,
        /// Requested limit.
        limit: usize,
    },
}

impl DecodeError {
    /// Attribute a codec failure to frame `index`. Container and feature
    /// errors describe the file, not the frame, and are reported as such.
    pub(crate) fn from_codec(index: usize, err: CodecError) -> Self {
        match err {
            CodecError::Container(e) => DecodeError::MalformedContainer(e),
            CodecError::UnsupportedFeature(feature) => DecodeError::UnsupportedFeature(feature),
            source => DecodeError::FrameDecode { index, source },
        }
    }
}

impl EncodeError {
    pub(crate) fn from_codec(index: usize, err: CodecError) -> Self {
        match err {
            CodecError::OutputTooLarge { size, limit } => EncodeError::OutputTooLarge { index, size, limit },
            source => EncodeError::FrameEncode { index, source },
        }
    }
}

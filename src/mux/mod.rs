//! WebP mux/demux and animation assembly.
//!
//! This module provides three capabilities:
//!
//! - **Demux** ([`WebPDemuxer`]): Parse WebP files at the chunk level, iterate
//!   frames and access raw bitstream data without decoding pixels. Truncated
//!   input is accepted; partially received frames are flagged incomplete.
//! - **Mux** ([`WebPMux`]): Assemble WebP containers from pre-encoded chunks
//!   and an optional ICC profile.
//! - **Animation** ([`AnimationEncoder`], [`assemble_animation`]): Encode
//!   full-canvas frames and assemble them into an animated WebP.

mod anim;
mod assemble;
mod demux;
mod error;
mod vec_writer;

pub use anim::{assemble_animation, AnimationConfig, AnimationEncoder};
pub use assemble::{wrap_fragment, MuxFrame, WebPMux, MAX_DIMENSION, MAX_FRAME_DURATION_MS};
pub use demux::{
    BlendMethod, DemuxFrame, DemuxFrameIter, DisposeMethod, LoopCount, WebPDemuxer,
};
pub use error::MuxError;

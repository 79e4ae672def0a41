//! Animated WebP decoding: frame analysis, compositing and sessions.

mod api;
mod canvas;
mod config;
mod graph;
mod incremental;
mod limits;
mod session;

pub use api::decode;
pub use canvas::Canvas;
pub use config::DecodeConfig;
pub use graph::{
    normalize_duration, FrameDescriptor, FrameHeader, FrameTable, TableMode,
    DEFAULT_FRAME_DURATION, MIN_FRAME_DURATION_MS,
};
pub use incremental::{IncrementalDecoder, IncrementalState};
pub use limits::Limits;
pub use session::AnimatedWebP;

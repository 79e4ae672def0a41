//! Encoder configuration.

use crate::codec::EncodeParams;
use crate::mux::LoopCount;

/// Configuration for [`encode`](crate::encode).
///
/// Frames are stored losslessly; `quality` below 1.0 trades exactness for
/// size through near-lossless preprocessing.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct EncodeConfig {
    /// Quality (0.0 = smallest, 1.0 = exact). Default: 1.0.
    pub quality: f32,
    /// Downscale frames to fit this bound, keeping the aspect ratio. Default: `None`.
    pub max_pixel_size: Option<(u32, u32)>,
    /// Per-frame byte budget (0 = unbounded, quality-driven). Default: 0.
    pub max_output_bytes: usize,
    /// Encode only the first frame, as a still image. Default: false.
    pub first_frame_only: bool,
    /// Loop count written to the animation header. Default: forever.
    pub loop_count: LoopCount,
    /// ICC profile to embed. Default: `None`.
    pub icc_profile: Option<Vec<u8>>,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeConfig {
    /// Create a configuration with defaults: exact, unbounded, loop forever.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quality: 1.0,
            max_pixel_size: None,
            max_output_bytes: 0,
            first_frame_only: false,
            loop_count: LoopCount::Forever,
            icc_profile: None,
        }
    }

    /// Set quality (0.0 = smallest, 1.0 = exact).
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = if quality.is_nan() {
            1.0
        } else {
            quality.clamp(0.0, 1.0)
        };
        self
    }

    /// Bound frame dimensions; larger frames are downscaled.
    #[must_use]
    pub fn with_max_pixel_size(mut self, width: u32, height: u32) -> Self {
        self.max_pixel_size = Some((width, height));
        self
    }

    /// Per-frame byte budget (0 = unbounded).
    #[must_use]
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Encode only the first frame.
    #[must_use]
    pub fn with_first_frame_only(mut self, first_only: bool) -> Self {
        self.first_frame_only = first_only;
        self
    }

    /// Set the animation loop count.
    #[must_use]
    pub fn with_loop_count(mut self, loop_count: LoopCount) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Embed an ICC profile.
    #[must_use]
    pub fn with_icc_profile(mut self, icc: Vec<u8>) -> Self {
        self.icc_profile = Some(icc);
        self
    }

    /// Per-fragment codec parameters.
    pub(crate) fn to_params(&self) -> EncodeParams {
        let quality = if self.quality.is_nan() {
            1.0
        } else {
            self.quality.clamp(0.0, 1.0)
        };
        EncodeParams {
            quality: (quality * 100.0).round() as u8,
            max_output_bytes: self.max_output_bytes,
        }
    }
}

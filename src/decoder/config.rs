//! Decode configuration.

use super::limits::Limits;

/// Options recognized by every decode entry point.
///
/// # Example
///
/// ```rust
/// use zenwebp_anim::DecodeConfig;
///
/// let config = DecodeConfig::default()
///     .scale_factor(2.0)
///     .target_pixel_size(256, 0)
///     .first_frame_only(true);
/// assert_eq!(config.target_pixel_size, Some((256, 0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    /// Device pixel scale recorded on returned bitmaps. Clamped to at least 1.
    pub scale_factor: f32,
    /// Thumbnail bound in pixels. Only downscales; a zero dimension is
    /// derived from the aspect ratio. Default: `None`.
    pub target_pixel_size: Option<(u32, u32)>,
    /// Keep the source aspect ratio when bounding. Default: `true`.
    pub preserve_aspect_ratio: bool,
    /// Decode only the first frame of an animation. Default: `false`.
    pub first_frame_only: bool,
    /// Resource limits checked when the container is opened.
    pub limits: Limits,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            target_pixel_size: None,
            preserve_aspect_ratio: true,
            first_frame_only: false,
            limits: Limits::default(),
        }
    }
}

impl DecodeConfig {
    /// Set the device pixel scale (values below 1 are treated as 1).
    #[must_use]
    pub fn scale_factor(mut self, scale: f32) -> Self {
        self.scale_factor = crate::bitmap::clamp_scale(scale);
        self
    }

    /// Bound output size to `width` x `height` pixels.
    #[must_use]
    pub fn target_pixel_size(mut self, width: u32, height: u32) -> Self {
        self.target_pixel_size = Some((width, height));
        self
    }

    /// Keep or drop the aspect ratio when bounding.
    #[must_use]
    pub fn preserve_aspect_ratio(mut self, preserve: bool) -> Self {
        self.preserve_aspect_ratio = preserve;
        self
    }

    /// Decode only the first frame.
    #[must_use]
    pub fn first_frame_only(mut self, first_only: bool) -> Self {
        self.first_frame_only = first_only;
        self
    }

    /// Replace the resource limits.
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub(crate) fn effective_scale(&self) -> f32 {
        crate::bitmap::clamp_scale(self.scale_factor)
    }
}

//! Resource limits applied when a container is opened.
//!
//! Every bound is checked against header fields and the input length, so a
//! hostile file is rejected before the canvas or any frame is allocated.

use crate::error::DecodeError;

/// Upper bounds on what a decode may allocate. `None` disables a bound.
///
/// # Example
///
/// ```rust
/// use zenwebp_anim::{DecodeConfig, Limits};
///
/// let config = DecodeConfig::default().limits(
///     Limits::default()
///         .max_dimensions(4096, 4096)
///         .max_frame_count(500),
/// );
///
/// // Trusted input only.
/// let unchecked = Limits::none();
/// # let _ = (config, unchecked);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Limits {
    /// Largest accepted canvas width.
    pub max_width: Option<u32>,
    /// Largest accepted canvas height.
    pub max_height: Option<u32>,
    /// Largest accepted canvas area. Bounds the canvas buffer for
    /// extreme aspect ratios.
    pub max_total_pixels: Option<u64>,
    /// Largest accepted number of animation frames (inclusive).
    pub max_frame_count: Option<u64>,
    /// Largest accepted input, in bytes.
    pub max_file_size: Option<u64>,
}

impl Default for Limits {
    /// 16384 x 16384 canvas, 100 megapixels, 10,000 frames, 100 MiB input.
    fn default() -> Self {
        Self {
            max_width: Some(16384),
            max_height: Some(16384),
            max_total_pixels: Some(100_000_000),
            max_frame_count: Some(10_000),
            max_file_size: Some(100 << 20),
        }
    }
}

impl Limits {
    /// No bounds at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_total_pixels: None,
            max_frame_count: None,
            max_file_size: None,
        }
    }

    /// Bound the canvas width and height.
    #[must_use]
    pub fn max_dimensions(self, width: u32, height: u32) -> Self {
        Self {
            max_width: Some(width),
            max_height: Some(height),
            ..self
        }
    }

    /// Bound the canvas area.
    #[must_use]
    pub fn max_total_pixels(self, pixels: u64) -> Self {
        Self {
            max_total_pixels: Some(pixels),
            ..self
        }
    }

    /// Bound the number of frames.
    #[must_use]
    pub fn max_frame_count(self, count: u64) -> Self {
        Self {
            max_frame_count: Some(count),
            ..self
        }
    }

    /// Bound the input length.
    #[must_use]
    pub fn max_file_size(self, bytes: u64) -> Self {
        Self {
            max_file_size: Some(bytes),
            ..self
        }
    }

    /// Validate a canvas size.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        within("canvas width", u64::from(width), self.max_width.map(u64::from))?;
        within("canvas height", u64::from(height), self.max_height.map(u64::from))?;
        within(
            "canvas area",
            u64::from(width) * u64::from(height),
            self.max_total_pixels,
        )
    }

    /// Validate a frame count.
    pub fn check_frame_count(&self, count: usize) -> Result<(), DecodeError> {
        within("frame count", count as u64, self.max_frame_count)
    }

    /// Validate an input length in bytes.
    pub fn check_file_size(&self, size: usize) -> Result<(), DecodeError> {
        within("input size", size as u64, self.max_file_size)
    }
}

fn within(what: &str, value: u64, limit: Option<u64>) -> Result<(), DecodeError> {
    match limit {
        Some(max) if value > max => Err(DecodeError::LimitExceeded(format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_format_maximum() {
        let limits = Limits::default();
        assert!(limits.check_dimensions(16384, 6000).is_ok());
        assert!(limits.check_dimensions(16385, 1).is_err());
        assert!(limits.check_dimensions(16384, 16384).is_err());
    }

    #[test]
    fn dimensions_are_inclusive() {
        let limits = Limits::none().max_dimensions(1000, 1000);
        assert!(limits.check_dimensions(1000, 1000).is_ok());
        assert!(matches!(
            limits.check_dimensions(1001, 500),
            Err(DecodeError::LimitExceeded(_))
        ));
        assert!(limits.check_dimensions(500, 1001).is_err());
    }

    #[test]
    fn area_bound_applies_to_odd_shapes() {
        let limits = Limits::none().max_total_pixels(1_000_000);
        assert!(limits.check_dimensions(1000, 1000).is_ok());
        assert!(limits.check_dimensions(1_000_001, 1).is_err());
    }

    #[test]
    fn frame_count_limit_is_inclusive() {
        let limits = Limits::none().max_frame_count(3);
        assert!(limits.check_frame_count(3).is_ok());
        assert!(limits.check_frame_count(4).is_err());
    }

    #[test]
    fn none_accepts_everything() {
        let limits = Limits::none();
        assert!(limits.check_dimensions(u32::MAX, u32::MAX).is_ok());
        assert!(limits.check_frame_count(usize::MAX).is_ok());
        assert!(limits.check_file_size(usize::MAX).is_ok());
    }
}

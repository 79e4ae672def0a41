//! Owned pixel buffers returned by decoding and accepted by encoding.

use std::time::Duration;

use crate::mux::LoopCount;

/// Pixel layout of a [`Bitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// 3 bytes per pixel, no alpha.
    Rgb8,
    /// 4 bytes per pixel, straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelLayout {
    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    /// Whether the layout carries an alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(self, PixelLayout::Rgba8)
    }
}

/// A top-left-origin raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    layout: PixelLayout,
    pixels: Vec<u8>,
    scale: f32,
}

impl Bitmap {
    /// Wrap a pixel buffer. Returns `None` if the buffer length does not
    /// match `width * height * bytes_per_pixel` or a dimension is zero.
    pub fn new(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(layout.bytes_per_pixel())?;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            layout,
            pixels,
            scale: 1.0,
        })
    }

    /// Wrap a buffer whose length is known to match.
    pub(crate) fn from_raw_parts(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * layout.bytes_per_pixel()
        );
        Self {
            width,
            height,
            layout,
            pixels,
            scale: 1.0,
        }
    }

    /// Record the display scale factor (clamped to at least 1).
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = clamp_scale(scale);
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Whether the pixels carry an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.layout.has_alpha()
    }

    /// Display scale factor this bitmap was decoded for.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Row-major pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Hand the pixels to a platform bitmap constructor.
    ///
    /// `build` receives `(pixels, width, height, has_alpha)`.
    pub fn into_platform<T, F>(self, build: F) -> T
    where
        F: FnOnce(Vec<u8>, u32, u32, bool) -> T,
    {
        let has_alpha = self.has_alpha();
        build(self.pixels, self.width, self.height, has_alpha)
    }

    /// Copy into an [`image::DynamicImage`].
    pub fn to_dynamic_image(&self) -> Option<image::DynamicImage> {
        match self.layout {
            PixelLayout::Rgb8 => image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
                .map(image::DynamicImage::ImageRgb8),
            PixelLayout::Rgba8 => {
                image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
                    .map(image::DynamicImage::ImageRgba8)
            }
        }
    }
}

pub(crate) fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 1.0 {
        scale
    } else {
        1.0
    }
}

/// One composited animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    /// Full-canvas image.
    pub bitmap: Bitmap,
    /// How long the frame is shown.
    pub duration: Duration,
}

/// A fully decoded animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedBitmap {
    /// Frames in presentation order.
    pub frames: Vec<AnimationFrame>,
    /// How many times the animation plays.
    pub loop_count: LoopCount,
}

impl AnimatedBitmap {
    /// Sum of all frame durations: one pass through the animation.
    pub fn loop_duration(&self) -> Duration {
        self.frames.iter().map(|f| f.duration).sum()
    }
}

/// Result of a one-shot decode.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedImage {
    /// A single image.
    Static(Bitmap),
    /// A sequence of composited frames.
    Animated(AnimatedBitmap),
}

impl DecodedImage {
    /// The first (or only) frame.
    pub fn first_frame(&self) -> Option<&Bitmap> {
        match self {
            DecodedImage::Static(bitmap) => Some(bitmap),
            DecodedImage::Animated(anim) => anim.frames.first().map(|f| &f.bitmap),
        }
    }
}

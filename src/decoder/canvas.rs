//! Persistent full-canvas compositing buffer.
//!
//! Frames are drawn either by overwriting their rectangle or by
//! non-premultiplied source-over blending. Disposal clears a frame's
//! rectangle to transparent black and is only ever applied after the frame's
//! snapshot has been taken.

use log::trace;

use super::graph::FrameDescriptor;
use crate::bitmap::{Bitmap, PixelLayout};
use crate::codec::RgbaFrame;

/// RGBA8 compositing canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    dirty: bool,
}

impl Canvas {
    /// Create a transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            dirty: false,
        }
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether anything has been drawn since the last clear.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.dirty = false;
    }

    /// Live RGBA8 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Draw decoded frame pixels into the frame's rectangle.
    ///
    /// Frames without alpha are drawn as opaque, regardless of the alpha
    /// bytes in `frame`.
    pub fn draw(&mut self, desc: &FrameDescriptor, frame: &RgbaFrame) {
        trace!(
            "draw frame {} at ({},{}) {}x{} blend={}",
            desc.index,
            desc.x_offset,
            desc.y_offset,
            desc.width,
            desc.height,
            desc.should_blend
        );
        let Some((x0, y0, w, h)) = self.clip(desc, frame.width, frame.height) else {
            return;
        };
        let canvas_stride = self.width as usize * 4;
        let frame_stride = frame.width as usize * 4;
        let opaque = !desc.has_alpha;

        for row in 0..h {
            let src = &frame.pixels[row * frame_stride..row * frame_stride + w * 4];
            let start = (y0 + row) * canvas_stride + x0 * 4;
            let dst = &mut self.pixels[start..start + w * 4];

            if !desc.should_blend || opaque {
                dst.copy_from_slice(src);
                if opaque {
                    dst.chunks_exact_mut(4).for_each(|px| px[3] = 255);
                }
            } else {
                for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    blend_pixel(d, s);
                }
            }
        }
        self.dirty = true;
    }

    /// Clear the frame's rectangle if it is marked for disposal.
    pub fn dispose(&mut self, desc: &FrameDescriptor) {
        if !desc.should_dispose {
            return;
        }
        let Some((x0, y0, w, h)) = self.clip(desc, desc.width, desc.height) else {
            return;
        };
        let stride = self.width as usize * 4;
        for row in 0..h {
            let start = (y0 + row) * stride + x0 * 4;
            self.pixels[start..start + w * 4].fill(0);
        }
    }

    /// Copy out the full canvas.
    pub fn snapshot(&self, layout: PixelLayout) -> Bitmap {
        let pixels = match layout {
            PixelLayout::Rgba8 => self.pixels.clone(),
            PixelLayout::Rgb8 => self
                .pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        Bitmap::from_raw_parts(self.width, self.height, layout, pixels)
    }

    /// Intersect a frame rectangle with the canvas, in usize.
    fn clip(&self, desc: &FrameDescriptor, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
        let x0 = desc.x_offset.min(self.width);
        let y0 = desc.y_offset.min(self.height);
        let w = width.min(desc.width).min(self.width - x0);
        let h = height.min(desc.height).min(self.height - y0);
        if w == 0 || h == 0 {
            return None;
        }
        Some((x0 as usize, y0 as usize, w as usize, h as usize))
    }
}

/// Non-premultiplied source-over blend of `src` onto `dst`.
fn blend_pixel(dst: &mut [u8], src: &[u8]) {
    let src_a = u32::from(src[3]);
    if src_a == 255 {
        dst.copy_from_slice(src);
        return;
    }
    if src_a == 0 {
        return;
    }

    let dst_a = u32::from(dst[3]);
    let dst_factor = dst_a * (255 - src_a);
    // alpha scaled by 255
    let out_a = src_a * 255 + dst_factor;
    for c in 0..3 {
        let v = u32::from(src[c]) * src_a * 255 + u32::from(dst[c]) * dst_factor;
        dst[c] = ((v + out_a / 2) / out_a) as u8;
    }
    dst[3] = ((out_a + 127) / 255) as u8;
}

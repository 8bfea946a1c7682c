// Core value types shared by tracking, filtering and rendering.

use image::{ImageBuffer, Rgb, RgbImage, RgbaImage, imageops};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black frame of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Pack an RGB image into 0x00RRGGBB pixels.
    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        Self { width: w as usize, height: h as usize, pixels }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            let px = self.pixels[y as usize * self.width + x as usize];
            Rgb([(px >> 16) as u8, (px >> 8) as u8, px as u8])
        })
    }

    /// Opaque RGBA copy, used for screenshots.
    pub fn to_rgba_image(&self) -> RgbaImage {
        image::DynamicImage::ImageRgb8(self.to_rgb_image()).to_rgba8()
    }

    /// Resample to `width` x `height` (no-op clone when already that size).
    pub fn resized(&self, width: usize, height: usize) -> Self {
        if self.width == width && self.height == height {
            return self.clone();
        }
        let img = imageops::resize(
            &self.to_rgb_image(),
            width as u32,
            height as u32,
            imageops::FilterType::Triangle,
        );
        Self::from_rgb_image(&img)
    }

    /// Horizontal mirror (selfie view).
    pub fn mirrored(&self) -> Self {
        let mut out = self.clone();
        for row in out.pixels.chunks_mut(self.width.max(1)) {
            row.reverse();
        }
        out
    }
}

/// Single-channel coverage in [0,1] per pixel.
/// Used as the frost accumulation target: 1 = fully frosted, 0 = clear.
#[derive(Clone, Debug)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<f32>,   // length = width * height, values clamped to [0.0, 1.0]
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, alpha: vec![0.0; width * height] }
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0.0);
    }

    /// Nearest sample at normalized (u, v), v growing upwards.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let x = ((u * self.width as f32) as isize).clamp(0, self.width as isize - 1) as usize;
        let y = (((1.0 - v) * self.height as f32) as isize).clamp(0, self.height as isize - 1) as usize;
        self.alpha[y * self.width + x]
    }
}

/// One tracked landmark, normalized to the frame (x right, y down, both in [0,1]).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, visibility: None }
    }
}

/// A circle approximating the tracked hand, in viewport pixels
/// (origin at the viewport center, x right, y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandCircle {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

impl HandCircle {
    /// Component-wise exponential smoothing: `(1 - alpha) * self + alpha * target`.
    pub fn mix(&self, target: &HandCircle, alpha: f32) -> HandCircle {
        let mix = |a: f32, b: f32| (1.0 - alpha) * a + alpha * b;
        HandCircle {
            center_x: mix(self.center_x, target.center_x),
            center_y: mix(self.center_y, target.center_y),
            radius: mix(self.radius, target.radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_reverses_each_row() {
        let fb = FrameBuffer { width: 3, height: 2, pixels: vec![1, 2, 3, 4, 5, 6] };
        assert_eq!(fb.mirrored().pixels, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn rgb_image_packing_keeps_channels() {
        let fb = FrameBuffer { width: 2, height: 1, pixels: vec![0x00_12_34_56, 0x00_FF_00_80] };
        let back = FrameBuffer::from_rgb_image(&fb.to_rgb_image());
        assert_eq!(back, fb);
        assert_eq!(fb.to_rgba_image().get_pixel(1, 0).0, [0xFF, 0x00, 0x80, 0xFF]);
    }

    #[test]
    fn resized_produces_requested_dimensions() {
        let fb = FrameBuffer::new(8, 6);
        let small = fb.resized(4, 3);
        assert_eq!((small.width, small.height, small.pixels.len()), (4, 3, 12));
    }

    #[test]
    fn mask_sample_uses_upward_v() {
        let mut m = Mask::new(2, 2);
        m.alpha[0] = 1.0; // top-left pixel
        assert_eq!(m.sample(0.1, 0.9), 1.0);
        assert_eq!(m.sample(0.1, 0.1), 0.0);
    }

    #[test]
    fn mix_blends_every_component() {
        let a = HandCircle { center_x: 0.0, center_y: 10.0, radius: 100.0 };
        let b = HandCircle { center_x: 10.0, center_y: 0.0, radius: 0.0 };
        let m = a.mix(&b, 0.8);
        assert!((m.center_x - 8.0).abs() < 1e-5);
        assert!((m.center_y - 2.0).abs() < 1e-5);
        assert!((m.radius - 20.0).abs() < 1e-4);
    }
}

//! Host-visible pixel buffer and its display image.

use image::RgbaImage;
use tilecast_math::Color;

/// A color buffer the kernel writes and the image handed to the display.
///
/// The two are kept apart so a frame can be assembled in `pixels` and only
/// copied into the image once it is complete.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    image: RgbaImage,
}

impl Framebuffer {
    /// A transparent `width` x `height` buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; width as usize * height as usize],
            image: RgbaImage::new(width, height),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major color buffer.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Mutable row-major color buffer.
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Fill the color buffer and the image with `color`.
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
        self.update_texture();
    }

    /// Set one pixel; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Copy the color buffer into the display image.
    pub fn update_texture(&mut self) {
        let bytes: &[u8] = bytemuck::cast_slice(&self.pixels);
        self.image.copy_from_slice(bytes);
    }

    /// The display image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// The display image, for drawing overlays after [`update_texture`](Self::update_texture).
    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

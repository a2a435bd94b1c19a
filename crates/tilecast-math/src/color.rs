//! 8-bit RGBA colors.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// An 8-bit-per-channel RGBA color, laid out as four consecutive bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (0 = fully transparent).
    pub a: u8,
}

impl Color {
    /// Fully transparent black; the "no hit" background.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Opaque red.
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Opaque green.
    pub const GREEN: Color = Color::rgba(0, 128, 0, 255);
    /// Opaque sandy brown.
    pub const SANDY_BROWN: Color = Color::rgba(244, 164, 96, 255);

    /// Construct from channel values.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// RGB channels as floats in `0.0..=255.0`.
    #[inline]
    pub fn rgb(&self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32)
    }

    /// Build a color from RGB in `0.0..=1.0` (clamped) and a raw alpha.
    #[inline]
    pub fn from_unit_rgb(rgb: Vec3, a: u8) -> Self {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba(to_byte(rgb.x), to_byte(rgb.y), to_byte(rgb.z), a)
    }

    /// True if the alpha channel is zero.
    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Pack into a little-endian `u32` (red in the low byte), the layout
    /// WGSL's `unpack4x8unorm` expects.
    #[inline]
    pub fn pack(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Inverse of [`Color::pack`].
    #[inline]
    pub fn unpack(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self::rgba(r, g, b, a)
    }

    /// Channels as an array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let c = Color::rgba(1, 2, 3, 4);
        assert_eq!(c.pack(), 0x0403_0201);
        assert_eq!(Color::unpack(c.pack()), c);
    }

    #[test]
    fn test_from_unit_rgb_clamps() {
        let c = Color::from_unit_rgb(Vec3::new(-1.0, 0.5, 2.0), 7);
        assert_eq!(c, Color::rgba(0, 128, 255, 7));
    }

    #[test]
    fn test_byte_layout_is_rgba() {
        let pixels = [Color::rgba(9, 8, 7, 6)];
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        assert_eq!(bytes, &[9, 8, 7, 6]);
    }
}

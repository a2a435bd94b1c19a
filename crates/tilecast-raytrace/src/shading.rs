//! Texture lookup and the local lighting model.

use tilecast_math::{reflect, Color, Vec2, Vec3};
use tilecast_scene::{Light, WorldObject};

/// Ambient share of the surface color.
pub const AMBIENT: f32 = 0.2;
/// Diffuse weight per light.
pub const DIFFUSE: f32 = 0.6;
/// Specular weight per light.
pub const SPECULAR: f32 = 0.4;
/// Specular exponent.
pub const SHININESS: i32 = 32;
/// Linear falloff coefficient for point lights.
pub const ATTENUATION: f32 = 0.1;

/// Sample a `width` x `height` texture stored at `start` in `pixels`.
///
/// UVs wrap into the region; reads past the buffer are transparent.
pub fn sample_texture(pixels: &[Color], uv: Vec2, start: usize, width: u32, height: u32) -> Color {
    if width == 0 || height == 0 {
        return Color::TRANSPARENT;
    }
    let wrap = |t: f32, n: u32| ((t * n as f32) as i64).rem_euclid(i64::from(n)) as usize;
    let x = wrap(uv.x, width);
    let y = wrap(uv.y, height);
    pixels
        .get(start + y * width as usize + x)
        .copied()
        .unwrap_or(Color::TRANSPARENT)
}

/// Unlit surface color of `object` at `uv`.
///
/// Untextured objects, and top faces of objects that do not texture their
/// top, use the flat color.
pub fn surface_color(object: &WorldObject, uv: Vec2, textured_face: bool, pixels: &[Color]) -> Color {
    if !object.is_textured() || !textured_face {
        return object.color;
    }
    sample_texture(
        pixels,
        uv,
        object.texture_start as usize,
        object.texture_region.width,
        object.texture_region.height,
    )
}

/// Phong-style lighting without shadows.
///
/// Color math runs in 0..255 space: ambient plus per-light diffuse (surface
/// color) and specular (light color) terms, then scaled to 0..1 and
/// clamped. Alpha passes through. With no lights the surface is unlit.
pub fn shade(color: Color, point: &Vec3, normal: &Vec3, view_dir: &Vec3, lights: &[Light]) -> Color {
    if lights.is_empty() {
        return color;
    }

    let base = color.rgb();
    let mut diffuse = Vec3::zeros();
    let mut specular = Vec3::zeros();

    for light in lights {
        let (light_dir, attenuation) = if light.directional {
            (-light.direction(), 1.0)
        } else {
            let to_light = light.position - point;
            let distance = to_light.norm();
            (
                to_light.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros),
                1.0 / (1.0 + ATTENUATION * distance),
            )
        };
        let strength = light.intensity * attenuation;

        let diff = normal.dot(&light_dir).max(0.0);
        diffuse += base * (diff * DIFFUSE * strength);

        let reflected = reflect(&-light_dir, normal);
        let spec = view_dir.dot(&reflected).max(0.0).powi(SHININESS);
        specular += light.color.rgb() * (spec * SPECULAR * strength);
    }

    let total = base * AMBIENT + diffuse + specular;
    Color::from_unit_rgb(total / 255.0, color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_math::Vec3;
    use tilecast_scene::{ObjectKind, TextureRegion, TextureSlot};

    #[test]
    fn test_sample_wraps() {
        let pixels: Vec<Color> = (0..8).map(|i| Color::rgba(i, 0, 0, 255)).collect();
        // 4x2 texture starting at 0.
        assert_eq!(sample_texture(&pixels, Vec2::new(0.0, 0.0), 0, 4, 2).r, 0);
        assert_eq!(sample_texture(&pixels, Vec2::new(0.5, 0.5), 0, 4, 2).r, 6);
        assert_eq!(sample_texture(&pixels, Vec2::new(1.0, 1.0), 0, 4, 2).r, 0);
        assert_eq!(sample_texture(&pixels, Vec2::new(0.99, 0.0), 0, 4, 2).r, 3);
    }

    #[test]
    fn test_sample_out_of_buffer() {
        let pixels = vec![Color::WHITE; 4];
        let c = sample_texture(&pixels, Vec2::new(0.9, 0.9), 2, 4, 4);
        assert_eq!(c, Color::TRANSPARENT);
    }

    #[test]
    fn test_surface_color_fallbacks() {
        let pixels = vec![Color::RED; 16];
        let flat = WorldObject::new(Vec3::zeros(), Vec3::repeat(1.0), Color::GREEN, ObjectKind::Tile);
        assert_eq!(surface_color(&flat, Vec2::zeros(), true, &pixels), Color::GREEN);

        let slot = TextureSlot {
            id: 0,
            start: 0,
            width: 4,
            height: 4,
        };
        let textured = flat.with_texture(slot, TextureRegion::new(0, 0, 4, 4));
        assert_eq!(surface_color(&textured, Vec2::zeros(), true, &pixels), Color::RED);
        assert_eq!(surface_color(&textured, Vec2::zeros(), false, &pixels), Color::GREEN);
    }

    #[test]
    fn test_unlit_passthrough() {
        let c = Color::rgba(36, 36, 36, 255);
        assert_eq!(shade(c, &Vec3::zeros(), &Vec3::y(), &Vec3::y(), &[]), c);
    }

    #[test]
    fn test_overhead_light_brighter_than_grazing() {
        let surface = Color::rgba(100, 150, 50, 200);
        let point = Vec3::zeros();
        let normal = Vec3::y();
        let view = Vec3::new(0.0, 1.0, -1.0).normalize();

        let down = Light::directional(-Vec3::y(), Color::WHITE, 2.0);
        let grazing = Light::directional(Vec3::x(), Color::WHITE, 2.0);
        let lit = shade(surface, &point, &normal, &view, &[down]);
        let dim = shade(surface, &point, &normal, &view, &[grazing]);

        assert!(lit.r > dim.r && lit.g > dim.g && lit.b > dim.b);
        assert_eq!(lit.a, 200);
        // Grazing light leaves only the ambient term.
        assert_eq!(dim, Color::rgba(20, 30, 10, 200));
    }

    #[test]
    fn test_point_light_attenuates() {
        let surface = Color::rgba(200, 200, 200, 255);
        let normal = Vec3::y();
        let view = Vec3::new(1.0, 1.0, 0.0).normalize();
        let near = Light::point(Vec3::new(0.0, 10.0, 0.0), Color::WHITE, 1.0);
        let far = Light::point(Vec3::new(0.0, 1000.0, 0.0), Color::WHITE, 1.0);
        let a = shade(surface, &Vec3::zeros(), &normal, &view, &[near]);
        let b = shade(surface, &Vec3::zeros(), &normal, &view, &[far]);
        assert!(a.r > b.r);
    }
}

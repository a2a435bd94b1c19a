//! CPU sprite compositor.
//!
//! Draws actor sprites over the ray-traced image: visible billboards are
//! sorted back to front, projected to the screen and alpha blended with a
//! nearest-neighbour scale that shrinks with distance.

use image::{Rgba, RgbaImage};
use tilecast_math::{ndc_to_screen, project_to_ndc};
use tilecast_raytrace::intersect::intersect_billboard;
use tilecast_raytrace::Ray;
use tilecast_scene::TextureRegion;
use tilecast_world::{Actor, TextureSource};

use crate::{Camera, CompositorSettings};

/// Overlays actor sprites on a finished frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteCompositor {
    settings: CompositorSettings,
}

impl SpriteCompositor {
    /// A compositor with the given scaling.
    pub fn new(settings: CompositorSettings) -> Self {
        Self { settings }
    }

    /// Visible actors with their billboard distance, furthest first.
    ///
    /// An actor is visible when the ray from the eye to its billboard center
    /// hits the billboard and the center lies in front of the camera. The
    /// local player is skipped.
    pub fn draw_order<'a>(&self, actors: &'a [Actor], camera: &Camera) -> Vec<(&'a Actor, f32)> {
        let forward = camera.forward();
        let mut visible: Vec<(&Actor, f32)> = actors
            .iter()
            .filter(|actor| !actor.local_player)
            .filter_map(|actor| {
                let center = actor.billboard_center();
                let to_center = center - camera.position;
                let direction = to_center.try_normalize(f32::EPSILON)?;
                let hit = intersect_billboard(
                    &Ray::new(camera.position, direction),
                    center,
                    actor.billboard_size(),
                )?;
                (forward.dot(&to_center) > 0.0).then_some((actor, hit.distance))
            })
            .collect();
        visible.sort_by(|a, b| b.1.total_cmp(&a.1));
        visible
    }

    /// Draw `actors` onto `image`; returns how many sprites were drawn.
    ///
    /// Sprites whose anchor projects outside the clip depth range or whose
    /// texture is unavailable are skipped.
    pub fn composite(
        &self,
        image: &mut RgbaImage,
        actors: &[Actor],
        textures: &dyn TextureSource,
        camera: &Camera,
    ) -> usize {
        let view_projection = camera.view_projection();
        let (width, height) = image.dimensions();
        let mut drawn = 0;

        for (actor, distance) in self.draw_order(actors, camera) {
            let Some(ndc) = project_to_ndc(&view_projection, &actor.billboard_center()) else {
                continue;
            };
            if !(-1.0..=1.0).contains(&ndc.z) {
                continue;
            }
            let Some(sheet) = actor.texture.as_deref().and_then(|id| textures.load(id)) else {
                continue;
            };
            let scale = self.settings.scale_numerator / distance * self.settings.pixel_scale;
            let anchor = ndc_to_screen(&ndc, width, height);
            if blit_scaled(image, &sheet, actor.source, anchor.x, anchor.y, scale) {
                drawn += 1;
            }
        }
        drawn
    }
}

/// Blit `region` of `sheet` scaled by `scale`, centered on `(cx, cy)`.
///
/// Returns false if the region lies outside the sheet or scales to nothing.
fn blit_scaled(
    image: &mut RgbaImage,
    sheet: &RgbaImage,
    region: TextureRegion,
    cx: f32,
    cy: f32,
    scale: f32,
) -> bool {
    let fits_x = region.x.checked_add(region.width).is_some_and(|r| r <= sheet.width());
    let fits_y = region.y.checked_add(region.height).is_some_and(|b| b <= sheet.height());
    let fits = fits_x && fits_y;
    if !fits || !scale.is_finite() || scale <= 0.0 {
        return false;
    }
    let dst_w = (region.width as f32 * scale).round() as i64;
    let dst_h = (region.height as f32 * scale).round() as i64;
    if dst_w <= 0 || dst_h <= 0 {
        return false;
    }

    let left = (cx - dst_w as f32 / 2.0).round() as i64;
    let top = (cy - dst_h as f32 / 2.0).round() as i64;
    let x_range = left.max(0)..(left + dst_w).min(image.width() as i64);
    let y_range = top.max(0)..(top + dst_h).min(image.height() as i64);

    for y in y_range {
        let sy = ((y - top) * region.height as i64 / dst_h) as u32;
        for x in x_range.clone() {
            let sx = ((x - left) * region.width as i64 / dst_w) as u32;
            let src = *sheet.get_pixel(region.x + sx, region.y + sy);
            blend(image.get_pixel_mut(x as u32, y as u32), src);
        }
    }
    true
}

/// Source-over alpha blend.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = src[3] as u32;
    match alpha {
        0 => {}
        255 => *dst = src,
        _ => {
            let inv = 255 - alpha;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * inv + 127) / 255) as u8;
            }
            dst[3] = (alpha + (dst[3] as u32 * inv + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_math::Vec3;
    use tilecast_world::MemoryTextures;

    fn actor(name: &str, x: f32, z: f32) -> Actor {
        Actor {
            name: name.into(),
            position: [x, z],
            texture: Some("sheet".into()),
            source: TextureRegion::new(0, 0, 2, 2),
            local_player: false,
        }
    }

    fn camera() -> Camera {
        let eye = Vec3::new(0.0, Actor::BILLBOARD_Y, -256.0);
        Camera::look_at(eye, Vec3::new(0.0, Actor::BILLBOARD_Y, 0.0), 1.0, 70.0)
    }

    #[test]
    fn test_draw_order_back_to_front() {
        let actors = vec![actor("near", 0.0, 0.0), actor("far", 0.0, 512.0), actor("mid", 0.0, 256.0)];
        let order: Vec<_> = SpriteCompositor::default()
            .draw_order(&actors, &camera())
            .into_iter()
            .map(|(a, d)| (a.name.as_str(), d))
            .collect();
        let names: Vec<_> = order.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["far", "mid", "near"]);
        approx::assert_relative_eq!(order[2].1, 256.0, epsilon = 1e-3);
    }

    #[test]
    fn test_skips_behind_camera_and_local_player() {
        let mut me = actor("me", 0.0, 100.0);
        me.local_player = true;
        let actors = vec![actor("behind", 0.0, -512.0), me, actor("ahead", 0.0, 100.0)];
        let order = SpriteCompositor::default().draw_order(&actors, &camera());
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].0.name, "ahead");
    }

    #[test]
    fn test_composite_draws_centered_sprite() {
        let textures = MemoryTextures::new().with("sheet", RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        let mut image = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 255, 255]));
        let drawn =
            SpriteCompositor::default().composite(&mut image, &[actor("a", 0.0, 0.0)], &textures, &camera());
        assert_eq!(drawn, 1);
        // 512 / 256 * 8 = 16 screen pixels per texel: a 32px square.
        assert_eq!(image.get_pixel(32, 32), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(17, 17), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(14, 14), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_missing_texture_is_skipped() {
        let mut image = RgbaImage::new(8, 8);
        let drawn = SpriteCompositor::default().composite(
            &mut image,
            &[actor("a", 0.0, 0.0)],
            &MemoryTextures::new(),
            &camera(),
        );
        assert_eq!(drawn, 0);
    }

    #[test]
    fn test_region_past_sheet_is_skipped() {
        let textures = MemoryTextures::new().with("sheet", RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        let mut image = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255]));
        let compositor = SpriteCompositor::default();
        for source in [
            TextureRegion::new(u32::MAX - 1, 0, 4, 4),
            TextureRegion::new(0, u32::MAX, 1, 1),
            TextureRegion::new(1, 0, 2, 2),
        ] {
            let mut a = actor("a", 0.0, 0.0);
            a.source = source;
            assert_eq!(compositor.composite(&mut image, &[a], &textures, &camera()), 0);
        }
        assert!(image.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_blend() {
        let mut dst = Rgba([0, 0, 200, 255]);
        blend(&mut dst, Rgba([255, 0, 0, 0]));
        assert_eq!(dst, Rgba([0, 0, 200, 255]));
        blend(&mut dst, Rgba([200, 0, 0, 128]));
        assert_eq!(dst, Rgba([100, 0, 100, 255]));
    }
}

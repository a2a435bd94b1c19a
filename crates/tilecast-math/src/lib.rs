#![warn(missing_docs)]

//! Math types for the tilecast renderer.
//!
//! Thin wrappers around nalgebra providing the single-precision types the
//! renderer works in: vectors, matrices, axis-aligned boxes, 8-bit colors,
//! and the handful of projection helpers shared by the ray-trace kernel and
//! the sprite compositor.

mod aabb;
mod color;

pub use aabb::{Aabb, Axis};
pub use color::Color;

use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// A vector (or point) in world space.
pub type Vec3 = Vector3<f32>;

/// A homogeneous 4-component vector.
pub type Vec4 = Vector4<f32>;

/// A 2D vector (texture coordinates, screen positions).
pub type Vec2 = Vector2<f32>;

/// A 4x4 column-major transformation matrix.
pub type Mat4 = Matrix4<f32>;

/// World units per tile edge.
pub const TILE_SIZE: f32 = 64.0;

/// World up axis.
pub fn up() -> Vec3 {
    Vec3::y()
}

/// Map a pixel index to normalized device coordinates.
///
/// The pixel index is used as-is (no half-pixel offset), so the pixel at
/// `(width / 2, height / 2)` of an even-sized target maps exactly to the
/// NDC origin.
#[inline]
pub fn pixel_to_ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (2.0 * x as f32) / width as f32 - 1.0,
        1.0 - (2.0 * y as f32) / height as f32,
    )
}

/// Unproject an NDC position into a normalized world-space ray direction.
///
/// A far-clip point is taken through the inverse projection, then the
/// resulting view-space vector is transformed by the inverse view matrix
/// with `w = 0` so the camera translation does not leak into the direction.
#[inline]
pub fn unproject_direction(inv_projection: &Mat4, inv_view: &Mat4, ndc: Vec2) -> Vec3 {
    let clip = Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    let mut view = inv_projection * clip;
    if view.w.abs() > f32::EPSILON {
        view /= view.w;
    }
    let world = inv_view * Vec4::new(view.x, view.y, view.z, 0.0);
    world.xyz().normalize()
}

/// Project a world-space point to normalized device coordinates.
///
/// Returns `None` for points at or behind the camera plane (`w <= 0`).
pub fn project_to_ndc(view_projection: &Mat4, point: &Vec3) -> Option<Vec3> {
    let clip = view_projection * Vec4::new(point.x, point.y, point.z, 1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    Some(clip.xyz() / clip.w)
}

/// Convert NDC x/y into pixel coordinates of a `width` x `height` target.
#[inline]
pub fn ndc_to_screen(ndc: &Vec3, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
    )
}

/// Reflect `incident` about the normal `normal` (which must be unit length).
#[inline]
pub fn reflect(incident: &Vec3, normal: &Vec3) -> Vec3 {
    incident - normal * (2.0 * incident.dot(normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera(eye: Vec3, target: Vec3) -> (Mat4, Mat4) {
        let view = Mat4::look_at_rh(&eye.into(), &target.into(), &up());
        let projection = Mat4::new_perspective(16.0 / 9.0, 70f32.to_radians(), 0.05, 1000.0);
        (view, projection)
    }

    #[test]
    fn test_center_pixel_is_ndc_origin() {
        let ndc = pixel_to_ndc(320, 180, 640, 360);
        assert_eq!(ndc, Vec2::zeros());
        let corner = pixel_to_ndc(0, 0, 640, 360);
        assert_eq!(corner, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_center_ray_matches_forward() {
        let eye = Vec3::new(10.0, 20.0, 30.0);
        let target = Vec3::new(-5.0, 0.0, 100.0);
        let (view, projection) = camera(eye, target);
        let inv_view = view.try_inverse().unwrap();
        let inv_projection = projection.try_inverse().unwrap();

        let dir = unproject_direction(&inv_projection, &inv_view, Vec2::zeros());
        let forward = (target - eye).normalize();
        assert_relative_eq!(dir, forward, epsilon = 1e-4);
    }

    #[test]
    fn test_unprojected_rays_are_unit_length() {
        let (view, projection) = camera(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 0.0, 10.0));
        let inv_view = view.try_inverse().unwrap();
        let inv_projection = projection.try_inverse().unwrap();
        for (x, y) in [(0, 0), (639, 0), (0, 359), (639, 359), (100, 200)] {
            let dir = unproject_direction(&inv_projection, &inv_view, pixel_to_ndc(x, y, 640, 360));
            assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_project_round_trip() {
        let eye = Vec3::new(0.0, 0.0, 0.0);
        let (view, projection) = camera(eye, Vec3::new(0.0, 0.0, -1.0));
        let vp = projection * view;
        let ndc = project_to_ndc(&vp, &Vec3::new(0.0, 0.0, -50.0)).unwrap();
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);

        let screen = ndc_to_screen(&ndc, 640, 360);
        assert_relative_eq!(screen, Vec2::new(320.0, 180.0), epsilon = 1e-3);
    }

    #[test]
    fn test_project_behind_camera() {
        let (view, projection) = camera(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));
        let vp = projection * view;
        assert!(project_to_ndc(&vp, &Vec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_reflect() {
        let r = reflect(&Vec3::new(1.0, -1.0, 0.0), &Vec3::y());
        assert_relative_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }
}

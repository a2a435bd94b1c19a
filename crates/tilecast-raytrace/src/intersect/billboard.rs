//! Camera-facing billboards.
//!
//! A billboard is the plane through the object center whose normal points
//! at the ray origin (the camera), bounded to a quad of the object's width
//! and height in a right/up basis: up is world up, right is perpendicular to
//! the horizontal camera-to-object direction.

use tilecast_math::{up, Vec2, Vec3};

use crate::ray::{Ray, DIRECTION_EPSILON};

/// Result of a billboard hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillboardHit {
    /// Parameter along the ray.
    pub distance: f32,
    /// Plane normal, pointing at the ray origin.
    pub normal: Vec3,
    /// Texture coordinates in `[0, 1]`, V down.
    pub uv: Vec2,
}

/// Right and up vectors of a billboard at `center` seen from `eye`.
///
/// Right follows screen right for a camera looking at the billboard. When
/// the eye is straight above or below, world X is used.
pub fn billboard_basis(eye: &Vec3, center: &Vec3) -> (Vec3, Vec3) {
    let mut to_center = center - eye;
    to_center.y = 0.0;
    let right = to_center
        .cross(&up())
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vec3::x);
    (right, up())
}

/// Intersect a ray with the billboard of size `size` (x = width, y = height)
/// centered at `center`.
pub fn intersect_billboard(ray: &Ray, center: Vec3, size: Vec3) -> Option<BillboardHit> {
    let normal = (ray.origin - center).try_normalize(f32::EPSILON)?;
    let denom = normal.dot(&ray.direction);
    if denom.abs() <= DIRECTION_EPSILON {
        return None;
    }

    let distance = (center - ray.origin).dot(&normal) / denom;
    if distance < 0.0 {
        return None;
    }

    let (right, up) = billboard_basis(&ray.origin, &center);
    let local = ray.at(distance) - center;
    let x = local.dot(&right);
    let y = local.dot(&up);
    let (half_w, half_h) = (size.x / 2.0, size.y / 2.0);
    if x.abs() > half_w || y.abs() > half_h || size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }

    let u = x / size.x + 0.5;
    let v = 1.0 - (y / size.y + 0.5);
    Some(BillboardHit {
        distance,
        normal,
        uv: Vec2::new(u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)),
    })
}

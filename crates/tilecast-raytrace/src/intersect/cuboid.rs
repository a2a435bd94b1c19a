//! Axis-aligned box hits: face classification and per-face UVs.

use tilecast_math::{Aabb, Vec2, Vec3};

use crate::Ray;

/// Tolerance for deciding which face a hit point lies on.
pub const FACE_EPSILON: f32 = 1e-4;

/// One of the six faces of an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    /// Min-X side.
    NegX,
    /// Max-X side.
    PosX,
    /// Bottom.
    NegY,
    /// Top.
    PosY,
    /// Min-Z side.
    NegZ,
    /// Max-Z side.
    PosZ,
}

impl Face {
    const ORDER: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    /// Outward unit normal.
    pub fn normal(self) -> Vec3 {
        match self {
            Face::NegX => -Vec3::x(),
            Face::PosX => Vec3::x(),
            Face::NegY => -Vec3::y(),
            Face::PosY => Vec3::y(),
            Face::NegZ => -Vec3::z(),
            Face::PosZ => Vec3::z(),
        }
    }

    /// True for the top face.
    pub fn is_top(self) -> bool {
        self == Face::PosY
    }

    fn plane_distance(self, bounds: &Aabb, p: &Vec3) -> f32 {
        match self {
            Face::NegX => (p.x - bounds.min.x).abs(),
            Face::PosX => (p.x - bounds.max.x).abs(),
            Face::NegY => (p.y - bounds.min.y).abs(),
            Face::PosY => (p.y - bounds.max.y).abs(),
            Face::NegZ => (p.z - bounds.min.z).abs(),
            Face::PosZ => (p.z - bounds.max.z).abs(),
        }
    }
}

/// Entry distance of the ray into `bounds`.
#[inline]
pub fn intersect_box(ray: &Ray, bounds: &Aabb) -> Option<f32> {
    ray.intersect_aabb(bounds)
}

/// Face a point on the box surface lies on.
///
/// Faces are tried in the order -X, +X, -Y, +Y, -Z, +Z and the first within
/// [`FACE_EPSILON`] wins; a point farther than that from every face (large
/// coordinates, origin inside the box) falls back to the nearest face.
pub fn box_face(bounds: &Aabb, point: &Vec3) -> Face {
    let mut nearest = Face::NegX;
    let mut nearest_distance = f32::INFINITY;
    for face in Face::ORDER {
        let d = face.plane_distance(bounds, point);
        if d < FACE_EPSILON {
            return face;
        }
        if d < nearest_distance {
            nearest = face;
            nearest_distance = d;
        }
    }
    nearest
}

/// Texture coordinates of `point` on `face`.
///
/// Top and bottom map X/Z; the X sides map Z/Y and the Z sides X/Y, both
/// with V flipped so the image is upright.
pub fn box_uv(bounds: &Aabb, point: &Vec3, face: Face) -> Vec2 {
    let rel = |axis: usize| {
        let extent = bounds.max[axis] - bounds.min[axis];
        if extent > 0.0 {
            ((point[axis] - bounds.min[axis]) / extent).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };
    match face {
        Face::NegY | Face::PosY => Vec2::new(rel(0), rel(2)),
        Face::NegX | Face::PosX => Vec2::new(rel(2), 1.0 - rel(1)),
        Face::NegZ | Face::PosZ => Vec2::new(rel(0), 1.0 - rel(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tile() -> Aabb {
        Aabb::from_center_size(Vec3::zeros(), Vec3::repeat(64.0))
    }

    #[test]
    fn test_face_from_above() {
        let ray = Ray::new(Vec3::new(10.0, 100.0, -5.0), -Vec3::y());
        let t = intersect_box(&ray, &tile()).unwrap();
        assert_relative_eq!(t, 68.0, epsilon = 1e-4);
        let face = box_face(&tile(), &ray.at(t));
        assert_eq!(face, Face::PosY);
        assert!(face.is_top());
    }

    #[test]
    fn test_face_order_on_edges() {
        // A corner point touches -X, -Y and -Z; -X is checked first.
        let corner = tile().min;
        assert_eq!(box_face(&tile(), &corner), Face::NegX);
        let top_edge = Vec3::new(0.0, 32.0, 32.0);
        assert_eq!(box_face(&tile(), &top_edge), Face::PosY);
    }

    #[test]
    fn test_face_nearest_fallback() {
        let inside = Vec3::new(0.0, 30.0, 0.0);
        assert_eq!(box_face(&tile(), &inside), Face::PosY);
    }

    #[test]
    fn test_uv_per_face() {
        let b = tile();
        let top = box_uv(&b, &Vec3::new(-32.0, 32.0, 32.0), Face::PosY);
        assert_relative_eq!(top, Vec2::new(0.0, 1.0));

        let side = box_uv(&b, &Vec3::new(32.0, 32.0, -16.0), Face::PosX);
        assert_relative_eq!(side, Vec2::new(0.25, 0.0));

        let front = box_uv(&b, &Vec3::new(16.0, -32.0, -32.0), Face::NegZ);
        assert_relative_eq!(front, Vec2::new(0.75, 1.0));
    }

    #[test]
    fn test_uv_flat_box() {
        let flat = Aabb::new(Vec3::zeros(), Vec3::new(10.0, 0.0, 10.0));
        let uv = box_uv(&flat, &Vec3::new(5.0, 0.0, 5.0), Face::PosZ);
        assert_relative_eq!(uv, Vec2::new(0.5, 1.0));
    }
}

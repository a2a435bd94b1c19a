//! Ray representation and the slab test.

use tilecast_math::{Aabb, Vec3};

/// Direction components smaller than this are replaced by it in the slab test.
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Per-axis divisor with near-zero components substituted.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a ray; `direction` is expected to be normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let safe = |d: f32| if d.abs() > DIRECTION_EPSILON { d } else { DIRECTION_EPSILON };
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(
                1.0 / safe(direction.x),
                1.0 / safe(direction.y),
                1.0 / safe(direction.z),
            ),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab-method ray/box test.
    ///
    /// Returns the entry distance (negative when the origin is inside the
    /// box) if the exit distance lies in front of the origin.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let mut t0 = (aabb.min[axis] - self.origin[axis]) * self.inv_direction[axis];
            let mut t1 = (aabb.max[axis] - self.origin[axis]) * self.inv_direction[axis];
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t_min > t1 || t0 > t_max {
                return None;
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
        }

        (t_max > DIRECTION_EPSILON).then_some(t_min)
    }
}

//! Axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// One of the three world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y (up) axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// Component index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Pick this axis' component out of a vector.
    #[inline]
    pub fn of(self, v: &Vec3) -> f32 {
        v[self.index()]
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with full extents `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// True if nothing has been included yet (min > max on some axis).
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand this AABB to include another box.
    pub fn include(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.include(other);
        out
    }

    /// Full extents (`max - min`).
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    /// Axis with the largest extent.
    ///
    /// X wins only if strictly larger than both others, then Y if strictly
    /// larger than Z, otherwise Z.
    pub fn longest_axis(&self) -> Axis {
        let size = self.extent();
        if size.x > size.y && size.x > size.z {
            Axis::X
        } else if size.y > size.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// True if `other` lies entirely inside this box (touching counts).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center_size() {
        let b = Aabb::from_center_size(Vec3::new(64.0, 0.0, 64.0), Vec3::new(64.0, 128.0, 64.0));
        assert_eq!(b.min, Vec3::new(32.0, -64.0, 32.0));
        assert_eq!(b.max, Vec3::new(96.0, 64.0, 96.0));
        assert_eq!(b.center(), Vec3::new(64.0, 0.0, 64.0));
    }

    #[test]
    fn test_empty_union() {
        let e = Aabb::empty();
        assert!(e.is_empty());
        let b = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        assert_eq!(e.union(&b), b);
        assert!(!b.is_empty());
    }

    #[test]
    fn test_longest_axis_tie_break() {
        let cube = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        assert_eq!(cube.longest_axis(), Axis::Z);
        let flat = Aabb::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 1.0));
        assert_eq!(flat.longest_axis(), Axis::Y);
        let wide = Aabb::new(Vec3::zeros(), Vec3::new(3.0, 2.0, 1.0));
        assert_eq!(wide.longest_axis(), Axis::X);
    }

    #[test]
    fn test_contains_and_overlaps() {
        let outer = Aabb::new(Vec3::zeros(), Vec3::repeat(10.0));
        let inner = Aabb::new(Vec3::repeat(1.0), Vec3::repeat(10.0));
        let apart = Aabb::new(Vec3::repeat(20.0), Vec3::repeat(30.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.overlaps(&inner));
        assert!(!outer.overlaps(&apart));
    }
}

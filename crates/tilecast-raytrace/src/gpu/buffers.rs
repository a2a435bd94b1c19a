//! GPU-compatible copies of the scene data.

use bytemuck::{Pod, Zeroable};
use tilecast_scene::{Light, WorldObject};

use crate::bvh::FlatNode;
use crate::kernel::FrameParams;

/// GPU-compatible BVH node.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    /// AABB min (w unused).
    pub aabb_min: [f32; 4],
    /// AABB max (w unused).
    pub aabb_max: [f32; 4],
    /// Left child index, -1 for leaves.
    pub left: i32,
    /// Right child index, -1 for leaves.
    pub right: i32,
    /// First object index.
    pub start: u32,
    /// Object count.
    pub count: u32,
}

impl From<&FlatNode> for GpuBvhNode {
    fn from(node: &FlatNode) -> Self {
        let b = &node.bounds;
        Self {
            aabb_min: [b.min.x, b.min.y, b.min.z, 0.0],
            aabb_max: [b.max.x, b.max.y, b.max.z, 0.0],
            left: node.left,
            right: node.right,
            start: node.start,
            count: node.count,
        }
    }
}

/// GPU-compatible world object.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuObject {
    /// Center (w unused).
    pub position: [f32; 4],
    /// Full extents (w unused).
    pub size: [f32; 4],
    /// Packed RGBA flat color.
    pub color: u32,
    /// Texture offset, -1 if untextured.
    pub texture_start: i32,
    /// Texture width in pixels.
    pub texture_width: u32,
    /// Texture height in pixels.
    pub texture_height: u32,
    /// Object kind tag.
    pub kind: u32,
    /// 1 if the top face samples the texture.
    pub render_top: u32,
    /// Padding.
    pub _pad: [u32; 2],
}

impl From<&WorldObject> for GpuObject {
    fn from(obj: &WorldObject) -> Self {
        let p = obj.position();
        let s = obj.size();
        Self {
            position: [p.x, p.y, p.z, 0.0],
            size: [s.x, s.y, s.z, 0.0],
            color: obj.color.pack(),
            texture_start: obj.texture_start,
            texture_width: obj.texture_region.width,
            texture_height: obj.texture_region.height,
            kind: obj.kind.tag(),
            render_top: u32::from(obj.render_top),
            _pad: [0; 2],
        }
    }
}

/// GPU-compatible light.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// Position (w unused).
    pub position: [f32; 4],
    /// Unit direction for directional lights (w unused).
    pub direction: [f32; 4],
    /// Packed RGBA color.
    pub color: u32,
    /// Intensity multiplier.
    pub intensity: f32,
    /// 1 for directional lights.
    pub directional: u32,
    /// Padding.
    pub _pad: u32,
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        let p = light.position;
        let d = light.direction();
        Self {
            position: [p.x, p.y, p.z, 0.0],
            direction: [d.x, d.y, d.z, 0.0],
            color: light.color.pack(),
            intensity: light.intensity,
            directional: u32::from(light.directional),
            _pad: 0,
        }
    }
}

/// Per-frame uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuFrameUniform {
    /// Inverse view matrix, column-major.
    pub inv_view: [[f32; 4]; 4],
    /// Inverse projection matrix, column-major.
    pub inv_projection: [[f32; 4]; 4],
    /// Eye position (w unused).
    pub camera_position: [f32; 4],
    /// Target width.
    pub width: u32,
    /// Target height.
    pub height: u32,
    /// Number of valid entries in the light buffer.
    pub light_count: u32,
    /// Number of valid entries in the node buffer.
    pub node_count: u32,
}

impl GpuFrameUniform {
    /// Pack frame parameters.
    pub fn new(frame: &FrameParams, light_count: usize, node_count: usize) -> Self {
        let c = frame.camera_position;
        Self {
            inv_view: frame.inv_view.into(),
            inv_projection: frame.inv_projection.into(),
            camera_position: [c.x, c.y, c.z, 1.0],
            width: frame.width,
            height: frame.height,
            light_count: light_count as u32,
            node_count: node_count as u32,
        }
    }
}

/// Convert `items`, padding with one zeroed element so no binding is empty.
pub(crate) fn padded<'a, S: 'a, T: Pod + From<&'a S>>(items: &'a [S]) -> Vec<T> {
    if items.is_empty() {
        vec![T::zeroed()]
    } else {
        items.iter().map(T::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_math::{Color, Vec3};
    use tilecast_scene::ObjectKind;

    #[test]
    fn test_struct_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<GpuBvhNode>(), 48);
        assert_eq!(std::mem::size_of::<GpuObject>(), 64);
        assert_eq!(std::mem::size_of::<GpuLight>(), 48);
        assert_eq!(std::mem::size_of::<GpuFrameUniform>(), 160);
    }

    #[test]
    fn test_object_conversion() {
        let obj = WorldObject::new(Vec3::new(1.0, 2.0, 3.0), Vec3::repeat(64.0), Color::RED, ObjectKind::Sprite)
            .with_render_top(false);
        let gpu = GpuObject::from(&obj);
        assert_eq!(gpu.position[..3], [1.0, 2.0, 3.0]);
        assert_eq!(gpu.texture_start, -1);
        assert_eq!(gpu.kind, 2);
        assert_eq!(gpu.render_top, 0);
        assert_eq!(Color::unpack(gpu.color), Color::RED);
    }

    #[test]
    fn test_padded_never_empty() {
        let lights: Vec<GpuLight> = padded::<Light, GpuLight>(&[]);
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0], GpuLight::zeroed());
    }
}

//! The per-pixel ray-trace kernel.
//!
//! [`render`] is a free function over flat buffers: the BVH arena, the
//! objects it indexes, the concatenated texture pixels and the lights. Rows
//! are traced in parallel; each pixel is independent.

use rayon::prelude::*;
use thiserror::Error;
use tilecast_math::{pixel_to_ndc, unproject_direction, Color, Mat4, Vec3};
use tilecast_scene::{Light, WorldObject};

use crate::bvh::{Bvh, FlatNode, STACK_SIZE};
use crate::intersect::intersect_object;
use crate::shading::{shade, surface_color};
use crate::Ray;

/// Errors from kernel setup.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The view or projection matrix has no inverse.
    #[error("camera matrices are not invertible")]
    SingularCamera,

    /// The render target is empty.
    #[error("render target has zero area")]
    EmptyTarget,

    /// Output buffer length does not match the target size.
    #[error("output buffer holds {actual} pixels, target needs {expected}")]
    OutputSize {
        /// `width * height`.
        expected: usize,
        /// Buffer length.
        actual: usize,
    },
}

/// Everything the kernel reads besides the camera.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    /// BVH arena, root at index 0.
    pub nodes: &'a [FlatNode],
    /// Objects indexed by leaf ranges.
    pub objects: &'a [WorldObject],
    /// Concatenated texture pixels.
    pub textures: &'a [Color],
    /// Lights; empty renders unlit.
    pub lights: &'a [Light],
}

impl<'a> SceneView<'a> {
    /// View over a built hierarchy.
    pub fn new(bvh: &'a Bvh, textures: &'a [Color], lights: &'a [Light]) -> Self {
        Self {
            nodes: bvh.nodes(),
            objects: bvh.objects(),
            textures,
            lights,
        }
    }
}

/// Per-frame camera data with the inverses computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Inverse view matrix.
    pub inv_view: Mat4,
    /// Inverse projection matrix.
    pub inv_projection: Mat4,
    /// World-space eye position.
    pub camera_position: Vec3,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl FrameParams {
    /// Invert the camera matrices for a `width` x `height` target.
    pub fn new(
        view: &Mat4,
        projection: &Mat4,
        camera_position: Vec3,
        width: u32,
        height: u32,
    ) -> Result<Self, KernelError> {
        if width == 0 || height == 0 {
            return Err(KernelError::EmptyTarget);
        }
        let inv_view = view.try_inverse().ok_or(KernelError::SingularCamera)?;
        let inv_projection = projection.try_inverse().ok_or(KernelError::SingularCamera)?;
        Ok(Self {
            inv_view,
            inv_projection,
            camera_position,
            width,
            height,
        })
    }

    /// Number of pixels in the target.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Primary ray through pixel `(x, y)`.
    #[inline]
    pub fn primary_ray(&self, x: u32, y: u32) -> Ray {
        let ndc = pixel_to_ndc(x, y, self.width, self.height);
        let direction = unproject_direction(&self.inv_projection, &self.inv_view, ndc);
        Ray::new(self.camera_position, direction)
    }
}

/// Nearest opaque hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// Hit distance.
    pub distance: f32,
    /// Lit color.
    pub color: Color,
    /// Index into [`SceneView::objects`].
    pub object: usize,
}

/// Walk the BVH and return the nearest opaque hit.
///
/// Children are pushed right then left, so the left subtree is visited
/// first and wins ties: a later hit must be strictly closer to replace the
/// current one. Nodes entered beyond the current best are skipped.
pub fn trace_ray(scene: &SceneView<'_>, ray: &Ray) -> Option<TraceHit> {
    if scene.nodes.is_empty() {
        return None;
    }

    let mut best: Option<TraceHit> = None;
    let mut best_distance = f32::MAX;
    let mut stack = [0u32; STACK_SIZE];
    let mut top = 1;

    while top > 0 {
        top -= 1;
        let node = &scene.nodes[stack[top] as usize];

        let Some(entry) = ray.intersect_aabb(&node.bounds) else {
            continue;
        };
        if entry > best_distance {
            continue;
        }

        if node.is_leaf() {
            let range = node.start as usize..(node.start + node.count) as usize;
            for (index, object) in scene.objects[range.clone()].iter().enumerate() {
                let Some(hit) = intersect_object(ray, object) else {
                    continue;
                };
                if hit.distance >= best_distance {
                    continue;
                }
                let textured_face = hit.face.map_or(true, |f| !f.is_top() || object.render_top);
                let base = surface_color(object, hit.uv, textured_face, scene.textures);
                if base.is_transparent() {
                    continue;
                }
                let view_dir = (ray.origin - hit.point)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(-ray.direction);
                best_distance = hit.distance;
                best = Some(TraceHit {
                    distance: hit.distance,
                    color: shade(base, &hit.point, &hit.normal, &view_dir, scene.lights),
                    object: range.start + index,
                });
            }
        } else {
            for child in [node.right, node.left] {
                if child >= 0 && top < STACK_SIZE {
                    stack[top] = child as u32;
                    top += 1;
                }
            }
        }
    }

    best
}

/// Color of pixel `(x, y)`; transparent black on a miss.
#[inline]
pub fn trace_pixel(scene: &SceneView<'_>, frame: &FrameParams, x: u32, y: u32) -> Color {
    trace_ray(scene, &frame.primary_ray(x, y)).map_or(Color::TRANSPARENT, |hit| hit.color)
}

/// Trace every pixel of the target into `out` (row-major).
pub fn render(scene: &SceneView<'_>, frame: &FrameParams, out: &mut [Color]) -> Result<(), KernelError> {
    let expected = frame.pixel_count();
    if out.len() != expected {
        return Err(KernelError::OutputSize {
            expected,
            actual: out.len(),
        });
    }

    out.par_chunks_mut(frame.width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = trace_pixel(scene, frame, x as u32, y as u32);
            }
        });
    Ok(())
}

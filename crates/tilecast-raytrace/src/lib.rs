#![warn(missing_docs)]

//! Ray tracing for the tilecast renderer.
//!
//! World objects (boxes and camera-facing billboards) are organised in a
//! bounding volume hierarchy and traced one primary ray per pixel with
//! direct, unshadowed lighting.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with the epsilon-guarded slab test
//! - [`intersect`] - Ray/box and ray/billboard intersection, face normals and UVs
//! - [`shading`] - Texture sampling and the lighting model
//! - [`bvh`] - Median-split hierarchy built in parallel into a flat arena
//! - [`kernel`] - Per-pixel traversal over flat buffers (CPU, row-parallel)
//! - `gpu` - The same kernel as a wgpu compute shader (feature `gpu`)
//!
//! # Example
//!
//! ```ignore
//! use tilecast_raytrace::{bvh::{Bvh, BvhSettings}, kernel::{render, FrameParams, SceneView}};
//!
//! let bvh = Bvh::build(objects, &BvhSettings::default())?;
//! let frame = FrameParams::new(&view, &projection, eye, 640, 360)?;
//! let mut pixels = vec![Color::TRANSPARENT; frame.pixel_count()];
//! render(&SceneView::new(&bvh, cache.pixels(), &lights), &frame, &mut pixels)?;
//! ```

mod ray;
pub mod bvh;
pub mod intersect;
pub mod kernel;
pub mod shading;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use bvh::{Bvh, BvhError, BvhSettings, FlatNode};
pub use kernel::{render, trace_pixel, trace_ray, FrameParams, KernelError, SceneView};
pub use ray::{Ray, DIRECTION_EPSILON};

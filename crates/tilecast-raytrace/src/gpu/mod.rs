//! GPU ray tracing using a wgpu compute shader.
//!
//! The shader runs the same traversal, intersection and lighting as
//! [`crate::kernel`] over Pod copies of the scene buffers.

mod buffers;
mod pipeline;
pub mod shaders;

pub use buffers::{GpuBvhNode, GpuFrameUniform, GpuLight, GpuObject};
pub use pipeline::RayTracePipeline;

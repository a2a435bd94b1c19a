//! GPU device management for tilecast.
//!
//! A single process-wide wgpu device and queue, created on first use and
//! shared by every compute pipeline.

#![warn(missing_docs)]

mod context;

pub use context::{GpuContext, GpuError};

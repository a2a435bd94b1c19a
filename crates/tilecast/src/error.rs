//! Error types for the renderer.

use std::path::PathBuf;

use thiserror::Error;
use tilecast_raytrace::{BvhError, KernelError};

/// Errors that abort a frame.
///
/// A failed frame is never presented; the display keeps the previous image
/// and the next frame starts from scratch.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Camera or target setup failed.
    #[error("kernel setup failed: {0}")]
    Kernel(#[from] KernelError),

    /// The hierarchy could not be built.
    #[error("BVH build failed: {0}")]
    Bvh(#[from] BvhError),

    /// The scene holds more objects than configured.
    #[error("scene has {count} objects, limit is {limit}")]
    TooManyObjects {
        /// Objects in the frame.
        count: usize,
        /// Configured `max_objects`.
        limit: usize,
    },

    /// GPU dispatch or readback failed.
    #[cfg(feature = "gpu")]
    #[error("GPU error: {0}")]
    Gpu(#[from] tilecast_gpu::GpuError),
}

/// Errors loading or validating a [`RendererConfig`](crate::RendererConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML is malformed.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#![warn(missing_docs)]

//! Ray-traced 3D rendering of tile-based 2D worlds.
//!
//! A [`Renderer`] takes a read-only [`WorldSnapshot`](tilecast_world::WorldSnapshot)
//! each frame, extracts axis-aligned boxes and billboards from it, builds a
//! bounding volume hierarchy and ray traces the result into a framebuffer
//! that is handed to a [`DisplaySink`].
//!
//! # Example
//!
//! ```
//! use tilecast::{Camera, CaptureSink, Renderer, RendererConfig};
//! use tilecast::math::Vec3;
//! use tilecast::world::{MemoryTextures, WorldSnapshot};
//!
//! let config = RendererConfig { width: 32, height: 18, ..RendererConfig::default() };
//! let mut renderer = Renderer::with_cpu(config).unwrap();
//! let camera = Camera::look_at(Vec3::new(0.0, 256.0, -256.0), Vec3::zeros(), 32.0 / 18.0, 70.0);
//! let mut sink = CaptureSink::new();
//!
//! renderer
//!     .render_frame(&WorldSnapshot::default(), &MemoryTextures::new(), &camera, &mut sink)
//!     .unwrap();
//! assert_eq!(sink.presented(), 1);
//! ```

mod backend;
mod camera;
mod compositor;
mod config;
mod error;
mod framebuffer;
mod renderer;

pub use backend::{CpuBackend, RenderBackend};
#[cfg(feature = "gpu")]
pub use backend::GpuBackend;
pub use camera::Camera;
pub use compositor::SpriteCompositor;
pub use config::{ActorMode, CompositorSettings, RendererConfig};
pub use error::{ConfigError, RenderError};
pub use framebuffer::Framebuffer;
pub use renderer::{CaptureSink, DisplaySink, Invalidation, Renderer};

pub use tilecast_math as math;
pub use tilecast_raytrace as raytrace;
pub use tilecast_scene as scene;
pub use tilecast_world as world;

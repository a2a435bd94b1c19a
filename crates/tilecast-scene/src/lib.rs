#![warn(missing_docs)]

//! Scene data for the tilecast renderer.
//!
//! Everything the ray tracer consumes is a plain value defined here:
//!
//! - [`WorldObject`] - one box or billboard with its texture assignment
//! - [`Light`] - point or directional light
//! - [`TextureCache`] - epoch-scoped store of decoded texture regions,
//!   concatenated into a single pixel buffer

pub mod error;
mod light;
mod object;
pub mod texture_cache;

pub use error::{Result, TextureError};
pub use light::Light;
pub use object::{ObjectKind, TextureRegion, WorldObject};
pub use texture_cache::{TextureCache, TextureSlot};

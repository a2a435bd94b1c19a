//! Error types for scene data.

use thiserror::Error;

use crate::TextureRegion;

/// Errors raised while caching texture regions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureError {
    /// The requested region does not fit inside the source image.
    #[error("texture region {region:?} for `{key}` exceeds the {width}x{height} source image")]
    RegionOutOfBounds {
        /// Cache key of the request.
        key: String,
        /// Requested region.
        region: TextureRegion,
        /// Source image width.
        width: u32,
        /// Source image height.
        height: u32,
    },

    /// The requested region has zero area.
    #[error("texture region for `{0}` is empty")]
    EmptyRegion(String),

    /// The concatenated buffer can no longer be addressed by a signed 32-bit offset.
    #[error("texture buffer full: {0} pixels")]
    BufferFull(usize),
}

/// Result type for texture cache operations.
pub type Result<T> = std::result::Result<T, TextureError>;

#![warn(missing_docs)]

//! World input for the tilecast renderer.
//!
//! The host game's world is consumed read-only as a [`WorldSnapshot`]
//! value. The [`GeometryExtractor`] turns a snapshot into the flat list of
//! [`WorldObject`](tilecast_scene::WorldObject)s the BVH is built from,
//! filling the texture cache along the way.
//!
//! # Example
//!
//! ```
//! use tilecast_scene::TextureCache;
//! use tilecast_world::{GeometryExtractor, MemoryTextures, WorldSnapshot};
//!
//! let snapshot = WorldSnapshot::from_json_str(r#"{ "buildings": [] }"#).unwrap();
//! let extractor = GeometryExtractor::default();
//! let mut cache = TextureCache::new();
//! let objects = extractor.rebuild(&snapshot, &MemoryTextures::new(), &mut cache);
//! assert!(objects.is_empty());
//! ```

mod classification;
pub mod error;
mod extractor;
pub mod snapshot;
mod textures;

pub use classification::{TileClass, TileClassification};
pub use error::{Result, WorldError};
pub use extractor::GeometryExtractor;
pub use snapshot::{
    Actor, Building, Crop, Furniture, PlacedObject, TerrainFeature, Tile, TileLayer, TileSheet,
    WaterGrid, WorldSnapshot,
};
pub use textures::{ImageDirectory, MemoryTextures, TextureSource};

//! Tile classification table.
//!
//! Which tiles stand up as walls is tileset knowledge, so the index set and
//! property markers are data loaded from configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Result, Tile};

/// How a map tile becomes geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClass {
    /// Tall occluding box (wall index or wall property).
    Wall,
    /// Tall box because its layer is drawn above the ground.
    Raised,
    /// Flat ground tile.
    Ground,
    /// Not turned into geometry.
    Skip,
}

impl TileClass {
    /// True for the tall classes.
    pub fn is_tall(self) -> bool {
        matches!(self, TileClass::Wall | TileClass::Raised)
    }
}

/// Lookup rules for classifying map tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileClassification {
    /// Tile indices that are always walls.
    pub wall_indices: BTreeSet<u32>,
    /// A property key containing this marks a wall.
    pub wall_property: String,
    /// A property key containing this marks walkable ground.
    pub floor_property: String,
    /// Layers whose name contains any of these are raised.
    pub raised_layer_markers: Vec<String>,
}

impl Default for TileClassification {
    fn default() -> Self {
        Self {
            wall_indices: [64, 160, 162, 163, 165, 167, 271, 470].into_iter().collect(),
            wall_property: "Wall".to_owned(),
            floor_property: "Floor".to_owned(),
            raised_layer_markers: vec!["Front".to_owned(), "Buildings".to_owned()],
        }
    }
}

impl TileClassification {
    /// Parse a table from TOML; missing fields keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// True if `tile` is a wall by index or property.
    pub fn is_wall(&self, tile: &Tile) -> bool {
        self.wall_indices.contains(&tile.index) || has_key_containing(tile, &self.wall_property)
    }

    /// True if tiles on `layer_name` are raised.
    pub fn is_raised_layer(&self, layer_name: &str) -> bool {
        self.raised_layer_markers
            .iter()
            .any(|marker| !marker.is_empty() && layer_name.contains(marker.as_str()))
    }

    /// Classify `tile` on the layer named `layer_name`.
    ///
    /// Walls win over everything; tiles on raised layers are raised; other
    /// tiles are ground if they have no properties or a floor property.
    pub fn classify(&self, layer_name: &str, tile: &Tile) -> TileClass {
        if tile.index == 0 {
            TileClass::Skip
        } else if self.is_wall(tile) {
            TileClass::Wall
        } else if self.is_raised_layer(layer_name) {
            TileClass::Raised
        } else if tile.properties.is_empty() || has_key_containing(tile, &self.floor_property) {
            TileClass::Ground
        } else {
            TileClass::Skip
        }
    }
}

fn has_key_containing(tile: &Tile, marker: &str) -> bool {
    !marker.is_empty() && tile.properties.keys().any(|key| key.contains(marker))
}

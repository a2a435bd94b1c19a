//! Read-only snapshot of the host world.
//!
//! Coordinates follow the host: `tile` fields are grid cells, actor
//! positions and bounding boxes are in world pixels (64 per tile). Texture
//! fields name an image for the [`TextureSource`](crate::TextureSource).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tilecast_math::{Color, Vec3};
use tilecast_scene::TextureRegion;

use crate::{Result, WorldError};

fn tile_box() -> [f32; 2] {
    [64.0, 64.0]
}

fn sixteen() -> u32 {
    16
}

/// Everything the extractor reads from one location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSnapshot {
    /// Tilesheets referenced by the layers.
    pub tilesheets: Vec<TileSheet>,
    /// Map layers, back to front.
    pub layers: Vec<TileLayer>,
    /// Farm buildings.
    pub buildings: Vec<Building>,
    /// Placed furniture.
    pub furniture: Vec<Furniture>,
    /// Placed objects (chests, machines, debris).
    pub objects: Vec<PlacedObject>,
    /// Trees, tilled soil and flooring.
    pub terrain_features: Vec<TerrainFeature>,
    /// Water tiles, if the location has any.
    pub water: Option<WaterGrid>,
    /// NPCs and players.
    pub actors: Vec<Actor>,
}

impl WorldSnapshot {
    /// Parse a snapshot from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Look up a tilesheet by id.
    pub fn tilesheet(&self, id: &str) -> Option<&TileSheet> {
        self.tilesheets.iter().find(|sheet| sheet.id == id)
    }
}

/// A tilesheet: an image cut into equally sized tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSheet {
    /// Id referenced by [`Tile::sheet`].
    pub id: String,
    /// Texture id of the sheet image.
    pub image: String,
    /// Tile width in pixels.
    #[serde(default = "sixteen")]
    pub tile_width: u32,
    /// Tile height in pixels.
    #[serde(default = "sixteen")]
    pub tile_height: u32,
}

impl TileSheet {
    /// Pixel rectangle of tile `index` in a sheet `image_width` pixels wide.
    ///
    /// Tiles are numbered row-major. Returns `None` if the sheet is narrower
    /// than one tile.
    pub fn tile_bounds(&self, index: u32, image_width: u32) -> Option<TextureRegion> {
        let columns = image_width.checked_div(self.tile_width)?;
        if columns == 0 {
            return None;
        }
        Some(TextureRegion::new(
            (index % columns) * self.tile_width,
            (index / columns) * self.tile_height,
            self.tile_width,
            self.tile_height,
        ))
    }
}

/// One map layer; `tiles` is row-major, `width * height` long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Layer name (`Back`, `Buildings`, `Front`, ...).
    pub name: String,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Cells, `None` where the layer is empty.
    #[serde(default)]
    pub tiles: Vec<Option<Tile>>,
}

impl TileLayer {
    /// Tile at grid cell `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .and_then(Option::as_ref)
    }

    /// Occupied cells as `(x, y, tile)`, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &Tile)> + '_ {
        (0..self.width).flat_map(move |x| {
            (0..self.height).filter_map(move |y| self.get(x, y).map(|tile| (x, y, tile)))
        })
    }
}

/// A single map tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Tilesheet id.
    pub sheet: String,
    /// Index into the sheet; `0` is treated as empty.
    pub index: u32,
    /// Map properties attached to the tile.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A farm building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Building type, e.g. `Coop` or `Big Shed`; also the texture cache key.
    pub building_type: String,
    /// Left tile.
    pub tile_x: i32,
    /// Top tile.
    pub tile_y: i32,
    /// Footprint width in tiles.
    pub tiles_wide: u32,
    /// Footprint depth in tiles.
    pub tiles_high: u32,
    /// Texture id.
    #[serde(default)]
    pub texture: Option<String>,
    /// Source rectangle in the texture.
    #[serde(default)]
    pub source: TextureRegion,
}

impl Building {
    /// True for farmhouse-like buildings, which get an extra storey.
    pub fn is_house(&self) -> bool {
        self.building_type.contains("house")
    }
}

/// A piece of furniture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Furniture {
    /// Item id (`bed`-containing ids are low).
    pub item_id: String,
    /// Furniture type number; `12` is a rug.
    pub furniture_type: i32,
    /// Item type name.
    #[serde(default)]
    pub type_name: String,
    /// Tile the furniture is placed on.
    pub tile: [i32; 2],
    /// Footprint in world pixels.
    #[serde(default = "tile_box")]
    pub bounding_box: [f32; 2],
    /// Texture id.
    #[serde(default)]
    pub texture: Option<String>,
    /// Source rectangle in the texture.
    #[serde(default)]
    pub source: TextureRegion,
}

impl Furniture {
    /// Furniture type of rugs.
    pub const RUG: i32 = 12;
}

/// A placed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    /// Item id, also the texture cache key.
    pub item_id: String,
    /// Tile the object sits on.
    pub tile: [i32; 2],
    /// Footprint in world pixels.
    #[serde(default = "tile_box")]
    pub bounding_box: [f32; 2],
    /// Texture id.
    #[serde(default)]
    pub texture: Option<String>,
    /// Source rectangle in the texture.
    #[serde(default)]
    pub source: TextureRegion,
}

/// A growing crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    /// Harvested item id.
    pub harvest_index: String,
    /// Current growth phase.
    pub phase: i32,
    /// Texture id.
    #[serde(default)]
    pub texture: Option<String>,
    /// Source rectangle of the current phase.
    #[serde(default)]
    pub source: TextureRegion,
}

/// Features living on top of a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TerrainFeature {
    /// A tree at some growth stage.
    Tree {
        /// Tile.
        tile: [i32; 2],
        /// Tree type id.
        tree_type: String,
        /// Growth stage, `5` and up is fully grown.
        growth_stage: i32,
        /// Whether only the stump remains.
        #[serde(default)]
        stump: bool,
        /// Footprint in world pixels.
        #[serde(default = "tile_box")]
        bounding_box: [f32; 2],
        /// Texture id.
        #[serde(default)]
        texture: Option<String>,
    },
    /// Tilled soil, possibly with a crop.
    HoeDirt {
        /// Tile.
        tile: [i32; 2],
        /// Footprint in world pixels.
        #[serde(default = "tile_box")]
        bounding_box: [f32; 2],
        /// Planted crop.
        #[serde(default)]
        crop: Option<Crop>,
    },
    /// A path or floor tile placed by the player.
    Flooring {
        /// Tile.
        tile: [i32; 2],
        /// Footprint in world pixels.
        #[serde(default = "tile_box")]
        bounding_box: [f32; 2],
        /// Floor id, also the texture cache key.
        which_floor: String,
        /// Texture id.
        #[serde(default)]
        texture: Option<String>,
        /// Top-left pixel of the floor's 16x16 tile.
        #[serde(default)]
        corner: [u32; 2],
    },
}

impl TerrainFeature {
    /// Tile the feature occupies.
    pub fn tile(&self) -> [i32; 2] {
        match self {
            TerrainFeature::Tree { tile, .. }
            | TerrainFeature::HoeDirt { tile, .. }
            | TerrainFeature::Flooring { tile, .. } => *tile,
        }
    }

    /// Footprint in world pixels.
    pub fn bounding_box(&self) -> [f32; 2] {
        match self {
            TerrainFeature::Tree { bounding_box, .. }
            | TerrainFeature::HoeDirt { bounding_box, .. }
            | TerrainFeature::Flooring { bounding_box, .. } => *bounding_box,
        }
    }
}

/// Water cells of a location; `tiles` is row-major, `width * height` long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterGrid {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// True where the cell is water.
    pub tiles: Vec<bool>,
    /// Water tint of the location.
    pub color: Color,
}

impl WaterGrid {
    /// True if `(x, y)` is water.
    pub fn is_water(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self
                .tiles
                .get(y as usize * self.width as usize + x as usize)
                .copied()
                .unwrap_or(false)
    }
}

/// A character drawn as a billboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Display name.
    pub name: String,
    /// Feet position in world pixels (x, y on the map plane).
    pub position: [f32; 2],
    /// Sprite sheet texture id.
    #[serde(default)]
    pub texture: Option<String>,
    /// Current animation frame in the sheet.
    #[serde(default)]
    pub source: TextureRegion,
    /// The player this snapshot was taken for; never drawn.
    #[serde(default)]
    pub local_player: bool,
}

impl Actor {
    /// Height of the billboard center above the map plane.
    pub const BILLBOARD_Y: f32 = 68.0;

    /// Billboard extents: width, height, depth.
    pub const BILLBOARD_SIZE: [f32; 3] = [64.0, 92.0, 64.0];

    /// World-space center of the actor's billboard.
    pub fn billboard_center(&self) -> Vec3 {
        Vec3::new(self.position[0], Self::BILLBOARD_Y, self.position[1])
    }

    /// Billboard extents as a vector.
    pub fn billboard_size(&self) -> Vec3 {
        Vec3::from(Self::BILLBOARD_SIZE)
    }
}

//! Geometry extraction: world snapshot to world objects.

use std::time::Instant;

use image::RgbaImage;
use log::{debug, trace, warn};
use tilecast_math::{Color, Vec3, TILE_SIZE};
use tilecast_scene::{ObjectKind, TextureCache, TextureRegion, WorldObject};

use crate::{
    Actor, Building, Furniture, PlacedObject, TerrainFeature, TextureSource, TileClass,
    TileClassification, WaterGrid, WorldSnapshot,
};

const TILE_COLOR: Color = Color::rgba(36, 36, 36, 255);
const WOOD_COLOR: Color = Color::rgba(92, 46, 0, 255);
const DIRT_COLOR: Color = Color::rgba(41, 25, 5, 255);

const GROUND_HEIGHT: f32 = TILE_SIZE;
const TALL_HEIGHT: f32 = 2.0 * TILE_SIZE;

const RUG_Y: f32 = 2.0;
const PLACED_OBJECT_Y: f32 = 52.0;
const CROP_Y: f32 = 58.0;
const SAPLING_Y: f32 = 56.0;
const GROWN_TREE_Y: f32 = 80.0;

const TREE_TOP: TextureRegion = TextureRegion::new(0, 0, 48, 96);
const TREE_STUMP: TextureRegion = TextureRegion::new(32, 96, 16, 32);

/// Actor billboards use this key prefix; it matches the cache's dynamic
/// marker so animation frames are re-decoded every frame.
const ACTOR_KEY_PREFIX: &str = "Sprite";

fn cell_center(tile: [i32; 2], y: f32) -> Vec3 {
    Vec3::new(tile[0] as f32 * TILE_SIZE, y, tile[1] as f32 * TILE_SIZE)
}

/// Turns a [`WorldSnapshot`] into world objects.
///
/// The extractor owns nothing but its classification table; the texture
/// cache it fills is passed in so the caller controls its epoch.
#[derive(Debug, Clone, Default)]
pub struct GeometryExtractor {
    classification: TileClassification,
}

impl GeometryExtractor {
    /// Extractor using `classification` for map tiles.
    pub fn new(classification: TileClassification) -> Self {
        Self { classification }
    }

    /// The tile classification table in use.
    pub fn classification(&self) -> &TileClassification {
        &self.classification
    }

    /// Extract the static geometry of `snapshot`.
    ///
    /// Decodes every referenced texture region into `cache`. A texture that
    /// cannot be resolved leaves its object on the flat color and is warned
    /// about once per cache epoch.
    pub fn rebuild(
        &self,
        snapshot: &WorldSnapshot,
        textures: &dyn TextureSource,
        cache: &mut TextureCache,
    ) -> Vec<WorldObject> {
        let start = Instant::now();
        let mut emit = Emitter {
            textures,
            cache,
            objects: Vec::new(),
        };

        for building in &snapshot.buildings {
            emit.building(building);
        }
        for feature in &snapshot.terrain_features {
            if let TerrainFeature::Flooring {
                tile,
                bounding_box,
                which_floor,
                texture,
                corner,
            } = feature
            {
                let object = WorldObject::new(
                    cell_center(*tile, 0.0),
                    Vec3::new(bounding_box[0], GROUND_HEIGHT, bounding_box[1]),
                    WOOD_COLOR,
                    ObjectKind::Tile,
                );
                let region = TextureRegion::new(corner[0], corner[1], 16, 16);
                emit.textured(object, which_floor, texture.as_deref(), region);
            }
        }
        for furniture in &snapshot.furniture {
            emit.furniture(furniture);
        }
        for feature in &snapshot.terrain_features {
            let key = match feature {
                TerrainFeature::Tree { .. } => "TreeDirt",
                _ => "HoeDirt",
            };
            let dirt = WorldObject::new(
                cell_center(feature.tile(), 0.0),
                Vec3::repeat(TILE_SIZE),
                DIRT_COLOR,
                ObjectKind::Tile,
            );
            emit.textured(dirt, key, None, TextureRegion::default());
        }
        for object in &snapshot.objects {
            emit.placed_object(object);
        }
        for feature in &snapshot.terrain_features {
            emit.terrain_sprite(feature);
        }
        self.tiles(snapshot, &mut emit);
        if let Some(water) = &snapshot.water {
            emit.water(water);
        }

        debug!(
            "extracted {} objects ({} texture keys) in {:?}",
            emit.objects.len(),
            emit.cache.len(),
            start.elapsed()
        );
        emit.objects
    }

    /// Billboards for every actor except the local player.
    ///
    /// Called every frame; actor keys are dynamic so the current animation
    /// frame is decoded each time.
    pub fn actor_objects(
        &self,
        actors: &[Actor],
        textures: &dyn TextureSource,
        cache: &mut TextureCache,
    ) -> Vec<WorldObject> {
        let mut emit = Emitter {
            textures,
            cache,
            objects: Vec::with_capacity(actors.len()),
        };
        for actor in actors.iter().filter(|a| !a.local_player) {
            let object = WorldObject::new(
                actor.billboard_center(),
                actor.billboard_size(),
                Color::RED,
                ObjectKind::Sprite,
            )
            .with_render_top(false);
            let key = format!("{ACTOR_KEY_PREFIX}{}", actor.name);
            emit.textured(object, &key, actor.texture.as_deref(), actor.source);
        }
        emit.objects
    }

    fn tiles(&self, snapshot: &WorldSnapshot, emit: &mut Emitter<'_>) {
        for layer in &snapshot.layers {
            for (x, y, tile) in layer.cells() {
                let class = self.classification.classify(&layer.name, tile);
                if class == TileClass::Skip {
                    trace!("skipping tile {} at ({x}, {y}) on {}", tile.index, layer.name);
                    continue;
                }
                let (kind, height) = if class.is_tall() {
                    (ObjectKind::Object, TALL_HEIGHT)
                } else {
                    (ObjectKind::Tile, GROUND_HEIGHT)
                };
                let object = WorldObject::new(
                    Vec3::new(x as f32 * TILE_SIZE, 0.0, y as f32 * TILE_SIZE),
                    Vec3::new(TILE_SIZE, height, TILE_SIZE),
                    TILE_COLOR,
                    kind,
                );
                let key = format!("{}{}", tile.sheet, tile.index);

                let sheet = snapshot.tilesheet(&tile.sheet);
                let image = sheet.and_then(|sheet| emit.textures.load(&sheet.image));
                let region = sheet
                    .zip(image.as_ref())
                    .and_then(|(sheet, image)| sheet.tile_bounds(tile.index, image.width()));
                match (image, region) {
                    (Some(image), Some(region)) => emit.attach(object, &key, &image, region),
                    _ => {
                        emit.missing(&key, &tile.sheet);
                        emit.objects.push(object);
                    }
                }
            }
        }
    }
}

/// Extraction state for one pass.
struct Emitter<'a> {
    textures: &'a dyn TextureSource,
    cache: &'a mut TextureCache,
    objects: Vec<WorldObject>,
}

impl Emitter<'_> {
    /// Push `object`, textured with `region` of `texture` under `key`.
    fn textured(
        &mut self,
        object: WorldObject,
        key: &str,
        texture: Option<&str>,
        region: TextureRegion,
    ) {
        let Some(id) = texture else {
            self.objects.push(object);
            return;
        };
        if !self.cache.is_dynamic(key) {
            if let Some(slot) = self.cache.get(key) {
                self.objects.push(object.with_texture(slot, region));
                return;
            }
        }
        match self.textures.load(id) {
            Some(image) => self.attach(object, key, &image, region),
            None => {
                self.missing(key, id);
                self.objects.push(object);
            }
        }
    }

    /// Push `object` textured from an already loaded image.
    fn attach(&mut self, object: WorldObject, key: &str, image: &RgbaImage, region: TextureRegion) {
        match self.cache.get_or_add(key, image, region) {
            Ok(slot) => self.objects.push(object.with_texture(slot, region)),
            Err(err) => {
                if self.cache.note_missing(key) {
                    warn!("{err}; using flat color");
                }
                self.objects.push(object);
            }
        }
    }

    fn missing(&mut self, key: &str, texture: &str) {
        if self.cache.note_missing(key) {
            warn!("texture `{texture}` for `{key}` not found; using flat color");
        }
    }

    fn building(&mut self, building: &Building) {
        let house = if building.is_house() { 1.0 } else { 0.0 };
        let wide = building.tiles_wide as f32;
        let high = building.tiles_high as f32;
        let position = Vec3::new(
            (building.tile_x - 1) as f32 * TILE_SIZE + wide * TILE_SIZE / 2.0,
            high * TILE_SIZE / 2.0,
            (building.tile_y - 1) as f32 * TILE_SIZE + high * TILE_SIZE / 2.0,
        );
        let size = Vec3::new(
            wide * TILE_SIZE,
            (high + house) * TILE_SIZE,
            ((high - 2.0 * house) * TILE_SIZE).max(0.0),
        );
        let object = WorldObject::new(position, size, Color::SANDY_BROWN, ObjectKind::Building)
            .with_render_top(false);
        self.textured(
            object,
            &building.building_type,
            building.texture.as_deref(),
            building.source,
        );
    }

    fn furniture(&mut self, furniture: &Furniture) {
        let rug = furniture.furniture_type == Furniture::RUG;
        let (kind, y) = if rug {
            (ObjectKind::Tile, RUG_Y)
        } else {
            (ObjectKind::Object, TILE_SIZE)
        };
        let height = if furniture.item_id.contains("bed") {
            TILE_SIZE / 2.0
        } else {
            TILE_SIZE
        };
        let object = WorldObject::new(
            cell_center(furniture.tile, y),
            Vec3::new(furniture.bounding_box[0], height, furniture.bounding_box[1]),
            WOOD_COLOR,
            kind,
        );
        let key = format!("{}{}", furniture.furniture_type, furniture.type_name);
        self.textured(object, &key, furniture.texture.as_deref(), furniture.source);
    }

    fn placed_object(&mut self, placed: &PlacedObject) {
        let [w, h] = placed.bounding_box;
        let object = WorldObject::new(
            cell_center(placed.tile, PLACED_OBJECT_Y),
            Vec3::new(w, h, w),
            Color::RED,
            ObjectKind::Sprite,
        )
        .with_render_top(false);
        self.textured(object, &placed.item_id, placed.texture.as_deref(), placed.source);
    }

    fn terrain_sprite(&mut self, feature: &TerrainFeature) {
        match feature {
            TerrainFeature::Tree {
                tile,
                tree_type,
                growth_stage,
                stump,
                bounding_box,
                texture,
            } => {
                let stage = *growth_stage;
                let region = tree_region(stage, *stump);
                let [w, h] = *bounding_box;
                let height = (h * 2.0 * stage as f32 / 6.0).clamp(16.0, 128.0);
                let y = if stage >= 6 { GROWN_TREE_Y } else { SAPLING_Y };
                let object = WorldObject::new(
                    cell_center(*tile, y),
                    Vec3::new(w, height, w),
                    Color::GREEN,
                    ObjectKind::Sprite,
                )
                .with_render_top(false);
                let key = format!("{tree_type}{stage}{stump}");
                self.textured(object, &key, texture.as_deref(), region);
            }
            TerrainFeature::HoeDirt {
                tile,
                bounding_box,
                crop: Some(crop),
            } => {
                let [w, h] = *bounding_box;
                let object = WorldObject::new(
                    cell_center(*tile, CROP_Y),
                    Vec3::new(w, h, w),
                    Color::GREEN,
                    ObjectKind::Sprite,
                )
                .with_render_top(false);
                let key = format!("{}{}", crop.harvest_index, crop.phase);
                self.textured(object, &key, crop.texture.as_deref(), crop.source);
            }
            TerrainFeature::HoeDirt { crop: None, .. } | TerrainFeature::Flooring { .. } => {}
        }
    }

    fn water(&mut self, water: &WaterGrid) {
        let color = Color { a: 255, ..water.color };
        for x in 0..water.width {
            for y in 0..water.height {
                if water.is_water(x, y) {
                    self.objects.push(WorldObject::new(
                        Vec3::new(x as f32 * TILE_SIZE, 0.0, y as f32 * TILE_SIZE),
                        Vec3::repeat(TILE_SIZE),
                        color,
                        ObjectKind::Tile,
                    ));
                }
            }
        }
    }
}

/// Source rectangle of a tree at `stage` in its sheet.
fn tree_region(stage: i32, stump: bool) -> TextureRegion {
    match stage {
        i32::MIN..=0 => TextureRegion::new(32, 128, 16, 16),
        1 => TextureRegion::new(0, 128, 16, 16),
        2 => TextureRegion::new(16, 128, 16, 16),
        3 | 4 => TextureRegion::new(0, 96, 16, 32),
        _ if stump => TREE_STUMP,
        _ => TREE_TOP,
    }
}

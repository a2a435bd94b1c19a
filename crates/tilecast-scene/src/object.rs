//! The single tagged record every piece of world geometry collapses into.

use serde::{Deserialize, Serialize};
use tilecast_math::{Aabb, Color, Vec3};

use crate::TextureSlot;

/// How an object is intersected and shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Flat ground tile.
    #[default]
    Tile,
    /// Raised box (walls, furniture).
    Object,
    /// Camera-facing billboard.
    Sprite,
    /// Building footprint box.
    Building,
}

impl ObjectKind {
    /// Numeric tag used by the GPU buffers.
    pub fn tag(self) -> u32 {
        match self {
            ObjectKind::Tile => 0,
            ObjectKind::Object => 1,
            ObjectKind::Sprite => 2,
            ObjectKind::Building => 3,
        }
    }
}

/// Pixel rectangle inside a source texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TextureRegion {
    /// Construct a region.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One box or billboard in world space.
///
/// Position and size are fixed at construction so the cached bounds can
/// never drift from them; moving an object means building a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldObject {
    position: Vec3,
    size: Vec3,
    bounds: Aabb,
    /// Flat color used when untextured or when a face is not textured.
    pub color: Color,
    /// Source rectangle of the texture (width/height drive UV wrapping).
    pub texture_region: TextureRegion,
    /// Offset into the concatenated texture buffer, `-1` if untextured.
    pub texture_start: i32,
    /// Intersection/shading kind.
    pub kind: ObjectKind,
    /// Texture cache id of the semantic key, `None` if untextured.
    pub stable_id: Option<u32>,
    /// Whether the top face samples the texture.
    pub render_top: bool,
}

impl WorldObject {
    /// An untextured object centered at `position` with full extents `size`.
    pub fn new(position: Vec3, size: Vec3, color: Color, kind: ObjectKind) -> Self {
        Self {
            position,
            size,
            bounds: Aabb::from_center_size(position, size),
            color,
            texture_region: TextureRegion::default(),
            texture_start: -1,
            kind,
            stable_id: None,
            render_top: true,
        }
    }

    /// Attach a cached texture.
    ///
    /// The region keeps its source origin for diagnostics; sampling only uses
    /// its width and height together with the slot's start offset.
    pub fn with_texture(mut self, slot: TextureSlot, region: TextureRegion) -> Self {
        self.texture_start = slot.start as i32;
        self.texture_region = TextureRegion::new(region.x, region.y, slot.width, slot.height);
        self.stable_id = Some(slot.id);
        self
    }

    /// Set whether the top face samples the texture.
    pub fn with_render_top(mut self, render_top: bool) -> Self {
        self.render_top = render_top;
        self
    }

    /// World-space center.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Full extents.
    pub fn size(&self) -> Vec3 {
        self.size
    }

    /// `position ± size / 2`.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// True if a texture span is attached.
    pub fn is_textured(&self) -> bool {
        self.texture_start >= 0
    }
}

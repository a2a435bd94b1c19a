//! Epoch-scoped texture cache.
//!
//! Decoded texture regions are concatenated into one pixel buffer so the
//! kernel can address any texture by a start offset. Entries are keyed by a
//! semantic string (kind + index + discriminator), so repeated tiles share a
//! single span. [`TextureCache::reset`] ends the epoch: every offset handed
//! out before it becomes invalid.

use std::collections::{HashMap, HashSet};

use image::RgbaImage;
use tilecast_math::Color;

use crate::{Result, TextureError, TextureRegion};

/// Default marker for keys whose pixels change every frame.
pub const DYNAMIC_MARKER: &str = "Sprite";

/// Where a cached region lives in the concatenated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSlot {
    /// Id assigned on first insertion within the epoch.
    pub id: u32,
    /// First pixel of the region in [`TextureCache::pixels`].
    pub start: u32,
    /// Region width in pixels.
    pub width: u32,
    /// Region height in pixels.
    pub height: u32,
}

impl TextureSlot {
    fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Owned cache of decoded texture regions.
#[derive(Debug)]
pub struct TextureCache {
    entries: HashMap<String, TextureSlot>,
    pixels: Vec<Color>,
    next_id: u32,
    epoch: u64,
    revision: u64,
    dynamic_marker: String,
    warned: HashSet<String>,
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureCache {
    /// Empty cache using the default dynamic marker.
    pub fn new() -> Self {
        Self::with_dynamic_marker(DYNAMIC_MARKER)
    }

    /// Empty cache treating keys that contain `marker` as per-frame.
    pub fn with_dynamic_marker(marker: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            pixels: Vec::new(),
            next_id: 0,
            epoch: 0,
            revision: 0,
            dynamic_marker: marker.into(),
            warned: HashSet::new(),
        }
    }

    /// Return the slot for `key`, decoding `region` of `texture` on a miss.
    ///
    /// Static keys decode at most once per epoch. Dynamic keys are removed
    /// and re-decoded on every call; when the new region has the same pixel
    /// count the old span and id are kept and the pixels overwritten in
    /// place instead of growing the buffer.
    pub fn get_or_add(
        &mut self,
        key: &str,
        texture: &RgbaImage,
        region: TextureRegion,
    ) -> Result<TextureSlot> {
        let dynamic = self.is_dynamic(key);
        if !dynamic {
            if let Some(slot) = self.entries.get(key) {
                return Ok(*slot);
            }
        }

        check_region(key, texture, region)?;

        let reusable = if dynamic {
            self.entries
                .remove(key)
                .filter(|old| old.len() == region.area())
        } else {
            None
        };

        let (id, start) = match reusable {
            Some(old) => {
                let start = old.start as usize;
                copy_region(texture, region, &mut self.pixels[start..start + region.area()]);
                (old.id, start)
            }
            None => {
                let start = self.pixels.len();
                if start + region.area() > i32::MAX as usize {
                    return Err(TextureError::BufferFull(start + region.area()));
                }
                self.pixels
                    .resize(start + region.area(), Color::TRANSPARENT);
                copy_region(texture, region, &mut self.pixels[start..]);
                let id = self.next_id;
                self.next_id += 1;
                (id, start)
            }
        };

        let slot = TextureSlot {
            id,
            start: start as u32,
            width: region.width,
            height: region.height,
        };
        self.revision += 1;
        self.entries.insert(key.to_owned(), slot);
        Ok(slot)
    }

    /// Look up a key without decoding.
    pub fn get(&self, key: &str) -> Option<TextureSlot> {
        self.entries.get(key).copied()
    }

    /// Drop every entry and pixel and restart id assignment.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.pixels.clear();
        self.warned.clear();
        self.next_id = 0;
        self.epoch += 1;
        self.revision += 1;
        log::debug!("texture cache reset, epoch {}", self.epoch);
    }

    /// True if `key` is re-decoded on every access.
    pub fn is_dynamic(&self, key: &str) -> bool {
        !self.dynamic_marker.is_empty() && key.contains(self.dynamic_marker.as_str())
    }

    /// Record a texture problem for `key`; returns true the first time this
    /// epoch so the caller logs it once.
    pub fn note_missing(&mut self, key: &str) -> bool {
        self.warned.insert(key.to_owned())
    }

    /// The concatenated pixel buffer.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of resets so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Changes whenever the pixel buffer changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn check_region(key: &str, texture: &RgbaImage, region: TextureRegion) -> Result<()> {
    if region.width == 0 || region.height == 0 {
        return Err(TextureError::EmptyRegion(key.to_owned()));
    }
    let (width, height) = texture.dimensions();
    let fits_x = region.x.checked_add(region.width).is_some_and(|r| r <= width);
    let fits_y = region.y.checked_add(region.height).is_some_and(|b| b <= height);
    if !fits_x || !fits_y {
        return Err(TextureError::RegionOutOfBounds {
            key: key.to_owned(),
            region,
            width,
            height,
        });
    }
    Ok(())
}

/// Copy `region` row-major into `out` (which holds exactly `region.area()` pixels).
fn copy_region(texture: &RgbaImage, region: TextureRegion, out: &mut [Color]) {
    let width = region.width as usize;
    for (row, dst) in out.chunks_exact_mut(width).enumerate() {
        let y = region.y + row as u32;
        for (col, px) in dst.iter_mut().enumerate() {
            *px = Color::from(texture.get_pixel(region.x + col as u32, y).0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    #[test]
    fn test_static_key_decodes_once() {
        let tex = checker(32, 32);
        let mut cache = TextureCache::new();
        let a = cache.get_or_add("Tile5", &tex, TextureRegion::new(0, 0, 16, 16)).unwrap();
        let rev = cache.revision();
        let b = cache.get_or_add("Tile5", &tex, TextureRegion::new(16, 16, 16, 16)).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.pixels().len(), 256);
        assert_eq!(cache.revision(), rev);
    }

    #[test]
    fn test_region_is_row_major() {
        let tex = checker(32, 32);
        let mut cache = TextureCache::new();
        let slot = cache.get_or_add("k", &tex, TextureRegion::new(4, 8, 2, 3)).unwrap();
        assert_eq!(slot.start, 0);
        let px = cache.pixels();
        assert_eq!(px[0], Color::rgba(4, 8, 7, 255));
        assert_eq!(px[1], Color::rgba(5, 8, 7, 255));
        assert_eq!(px[2], Color::rgba(4, 9, 7, 255));
        assert_eq!(px[5], Color::rgba(5, 10, 7, 255));
    }

    #[test]
    fn test_offsets_are_consecutive() {
        let tex = checker(32, 32);
        let mut cache = TextureCache::new();
        let a = cache.get_or_add("a", &tex, TextureRegion::new(0, 0, 4, 4)).unwrap();
        let b = cache.get_or_add("b", &tex, TextureRegion::new(0, 0, 8, 2)).unwrap();
        assert_eq!((a.id, a.start), (0, 0));
        assert_eq!((b.id, b.start), (1, 16));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_dynamic_key_reuses_span() {
        let tex = checker(64, 64);
        let mut cache = TextureCache::new();
        cache.get_or_add("Tile1", &tex, TextureRegion::new(0, 0, 4, 4)).unwrap();
        let first = cache.get_or_add("SpriteAbigail", &tex, TextureRegion::new(0, 0, 16, 32)).unwrap();
        let rev = cache.revision();
        let second = cache.get_or_add("SpriteAbigail", &tex, TextureRegion::new(16, 0, 16, 32)).unwrap();
        assert_eq!(first.start, second.start);
        assert_eq!(first.id, second.id);
        assert!(cache.revision() > rev);
        assert_eq!(cache.pixels().len(), 16 + 16 * 32);
        assert_eq!(cache.pixels()[second.start as usize], Color::rgba(16, 0, 7, 255));
    }

    #[test]
    fn test_dynamic_key_with_new_size_appends() {
        let tex = checker(64, 64);
        let mut cache = TextureCache::new();
        let first = cache.get_or_add("SpriteSam", &tex, TextureRegion::new(0, 0, 16, 32)).unwrap();
        let second = cache.get_or_add("SpriteSam", &tex, TextureRegion::new(0, 0, 16, 16)).unwrap();
        assert_eq!(first.start, 0);
        assert_eq!(second.start, 512);
        assert_ne!(first.id, second.id);
        assert_eq!(cache.get("SpriteSam"), Some(second));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let tex = checker(32, 32);
        let mut cache = TextureCache::new();
        let run = |cache: &mut TextureCache| {
            ["a", "b", "a", "c"]
                .iter()
                .map(|k| cache.get_or_add(k, &tex, TextureRegion::new(0, 0, 8, 8)).unwrap())
                .collect::<Vec<_>>()
        };
        let first = run(&mut cache);
        cache.reset();
        assert!(cache.is_empty());
        assert!(cache.pixels().is_empty());
        assert_eq!(cache.epoch(), 1);
        let second = run(&mut cache);
        assert_eq!(first, second);
    }

    #[test]
    fn test_bad_regions() {
        let tex = checker(16, 16);
        let mut cache = TextureCache::new();
        let err = cache.get_or_add("x", &tex, TextureRegion::new(8, 8, 16, 16)).unwrap_err();
        assert!(matches!(err, TextureError::RegionOutOfBounds { .. }));
        let err = cache.get_or_add("y", &tex, TextureRegion::new(0, 0, 0, 4)).unwrap_err();
        assert_eq!(err, TextureError::EmptyRegion("y".into()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_warned_once_per_epoch() {
        let mut cache = TextureCache::new();
        assert!(cache.note_missing("Tree3"));
        assert!(!cache.note_missing("Tree3"));
        cache.reset();
        assert!(cache.note_missing("Tree3"));
    }
}

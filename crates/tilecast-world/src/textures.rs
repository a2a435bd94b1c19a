//! Texture sources: "load image by identifier".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;

/// Resolves texture ids to decoded images.
pub trait TextureSource: Send + Sync {
    /// Load the image for `id`, or `None` if it cannot be resolved.
    fn load(&self, id: &str) -> Option<Arc<RgbaImage>>;
}

/// Images held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryTextures {
    images: HashMap<String, Arc<RgbaImage>>,
}

impl MemoryTextures {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under `id`, replacing any previous image.
    pub fn insert(&mut self, id: impl Into<String>, image: RgbaImage) {
        self.images.insert(id.into(), Arc::new(image));
    }

    /// Builder form of [`MemoryTextures::insert`].
    pub fn with(mut self, id: impl Into<String>, image: RgbaImage) -> Self {
        self.insert(id, image);
        self
    }
}

impl TextureSource for MemoryTextures {
    fn load(&self, id: &str) -> Option<Arc<RgbaImage>> {
        self.images.get(id).cloned()
    }
}

/// PNG files under a root directory.
///
/// `Maps/springobjects` resolves to `<root>/Maps/springobjects.png`. Each
/// id is decoded at most once; failures are remembered too.
#[derive(Debug)]
pub struct ImageDirectory {
    root: PathBuf,
    loaded: Mutex<HashMap<String, Option<Arc<RgbaImage>>>>,
}

impl ImageDirectory {
    /// Serve images from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// The directory images are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let path = self.root.join(id);
        if path.extension().is_some() {
            path
        } else {
            self.root.join(format!("{id}.png"))
        }
    }

    fn decode(&self, id: &str) -> Option<Arc<RgbaImage>> {
        let path = self.path_for(id);
        match image::open(&path) {
            Ok(img) => Some(Arc::new(img.to_rgba8())),
            Err(err) => {
                log::debug!("cannot load texture {}: {err}", path.display());
                None
            }
        }
    }
}

impl TextureSource for ImageDirectory {
    fn load(&self, id: &str) -> Option<Arc<RgbaImage>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        loaded
            .entry(id.to_owned())
            .or_insert_with(|| self.decode(id))
            .clone()
    }
}

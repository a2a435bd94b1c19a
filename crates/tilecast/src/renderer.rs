//! Frame orchestration.
//!
//! One frame runs extraction (only after an invalidation), the BVH build,
//! the kernel, the framebuffer copy and the sprite compositor, in that
//! order. The kernel writes into a scratch buffer; the framebuffer is only
//! touched once the kernel has succeeded, so a failed frame never reaches
//! the display.

use std::time::Instant;

use image::RgbaImage;
use log::{debug, error, info};
use tilecast_math::Color;
use tilecast_raytrace::{Bvh, BvhError, BvhSettings, FrameParams, SceneView};
use tilecast_scene::{TextureCache, WorldObject};
use tilecast_world::{GeometryExtractor, TextureSource, WorldSnapshot};

use crate::{
    ActorMode, Camera, ConfigError, CpuBackend, Framebuffer, RenderBackend, RenderError,
    RendererConfig, SpriteCompositor,
};

/// Receives finished frames.
pub trait DisplaySink {
    /// Show `image`. Called once per successful frame.
    fn present(&mut self, image: &RgbaImage);
}

/// A sink that keeps the most recent frame.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    frame: Option<RgbaImage>,
    presented: u64,
}

impl CaptureSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last presented frame.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySink for CaptureSink {
    fn present(&mut self, image: &RgbaImage) {
        match &mut self.frame {
            Some(frame) if frame.dimensions() == image.dimensions() => frame.copy_from_slice(image),
            slot => *slot = Some(image.clone()),
        }
        self.presented += 1;
    }
}

/// World changes that invalidate the extracted geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Placed objects were added, removed or changed.
    ObjectsChanged,
    /// Trees, soil or flooring changed.
    TerrainFeaturesChanged,
    /// Debris was added or cleared.
    DebrisChanged,
    /// The player moved to another location.
    PlayerWarped,
}

/// Owns every piece of per-session render state.
pub struct Renderer {
    config: RendererConfig,
    extractor: GeometryExtractor,
    compositor: SpriteCompositor,
    backend: Box<dyn RenderBackend>,
    cache: TextureCache,
    static_objects: Vec<WorldObject>,
    static_bvh: Option<Bvh>,
    dirty: bool,
    framebuffer: Framebuffer,
    scratch: Vec<Color>,
    frames: u64,
}

impl Renderer {
    /// A renderer running `backend`, after validating `config`.
    pub fn new(config: RendererConfig, backend: Box<dyn RenderBackend>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut framebuffer = Framebuffer::new(config.width, config.height);
        framebuffer.clear(Color::TRANSPARENT);
        info!(
            "renderer: {}x{} on {}, actors {:?}",
            config.width,
            config.height,
            backend.name(),
            config.actor_mode
        );
        Ok(Self {
            extractor: GeometryExtractor::new(config.classification.clone()),
            compositor: SpriteCompositor::new(config.compositor),
            backend,
            cache: TextureCache::new(),
            static_objects: Vec::new(),
            static_bvh: None,
            dirty: true,
            scratch: vec![Color::TRANSPARENT; framebuffer.pixels().len()],
            framebuffer,
            frames: 0,
            config,
        })
    }

    /// A renderer on the CPU kernel.
    pub fn with_cpu(config: RendererConfig) -> Result<Self, ConfigError> {
        Self::new(config, Box::new(CpuBackend))
    }

    /// The active configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The texture cache shared by extraction and rendering.
    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    /// Geometry extracted at the last invalidation.
    pub fn static_objects(&self) -> &[WorldObject] {
        &self.static_objects
    }

    /// The framebuffer holding the last successful frame.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// React to a world change.
    ///
    /// Resets the texture cache and drops the extracted geometry; the next
    /// frame re-extracts and rebuilds the static hierarchy.
    pub fn invalidate(&mut self, reason: Invalidation) {
        info!("world invalidated ({reason:?}); geometry will be re-extracted");
        self.cache.reset();
        self.static_objects.clear();
        self.static_bvh = None;
        self.dirty = true;
    }

    /// Render and present one frame.
    ///
    /// On failure the error is logged, nothing is presented and the
    /// framebuffer keeps the previous frame.
    pub fn render_frame(
        &mut self,
        snapshot: &WorldSnapshot,
        textures: &dyn TextureSource,
        camera: &Camera,
        sink: &mut dyn DisplaySink,
    ) -> Result<(), RenderError> {
        match self.trace(snapshot, textures, camera) {
            Ok(()) => {
                self.present(snapshot, textures, camera, sink);
                Ok(())
            }
            Err(err) => {
                error!("frame {} aborted: {err}", self.frames);
                Err(err)
            }
        }
    }

    /// Extract if needed, build the hierarchy and run the kernel into the
    /// scratch buffer.
    fn trace(
        &mut self,
        snapshot: &WorldSnapshot,
        textures: &dyn TextureSource,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        if self.dirty {
            self.static_objects = self.extractor.rebuild(snapshot, textures, &mut self.cache);
            self.static_bvh = None;
            self.dirty = false;
        }

        let frame = FrameParams::new(
            &camera.view,
            &camera.projection,
            camera.position,
            self.config.width,
            self.config.height,
        )?;
        let settings = self.config.bvh_settings();
        let limit = self.config.max_objects;

        let per_frame;
        let bvh = match self.config.actor_mode {
            ActorMode::Traced => {
                let actors = self
                    .extractor
                    .actor_objects(&snapshot.actors, textures, &mut self.cache);
                let mut objects = Vec::with_capacity(self.static_objects.len() + actors.len());
                objects.extend_from_slice(&self.static_objects);
                objects.extend(actors);
                check_limit(objects.len(), limit)?;
                per_frame = timed_build(objects, &settings)?;
                &per_frame
            }
            ActorMode::Composited => {
                check_limit(self.static_objects.len(), limit)?;
                cached_bvh(&mut self.static_bvh, &self.static_objects, &settings)?
            }
        };

        let scene = SceneView::new(bvh, self.cache.pixels(), &self.config.lights);
        self.backend
            .render(&scene, &frame, self.cache.revision(), &mut self.scratch)
    }

    fn present(
        &mut self,
        snapshot: &WorldSnapshot,
        textures: &dyn TextureSource,
        camera: &Camera,
        sink: &mut dyn DisplaySink,
    ) {
        self.framebuffer.pixels_mut().copy_from_slice(&self.scratch);
        self.framebuffer.update_texture();
        if self.config.actor_mode == ActorMode::Composited {
            let drawn = self.compositor.composite(
                self.framebuffer.image_mut(),
                &snapshot.actors,
                textures,
                camera,
            );
            debug!("composited {drawn} sprites");
        }
        sink.present(self.framebuffer.image());
        self.frames += 1;
    }
}

fn check_limit(count: usize, limit: usize) -> Result<(), RenderError> {
    if count > limit {
        return Err(RenderError::TooManyObjects { count, limit });
    }
    Ok(())
}

fn timed_build(objects: Vec<WorldObject>, settings: &BvhSettings) -> Result<Bvh, BvhError> {
    let start = Instant::now();
    let bvh = Bvh::build(objects, settings)?;
    debug!(
        "frame BVH: {} nodes, depth {}, {:?}",
        bvh.node_count(),
        bvh.depth(),
        start.elapsed()
    );
    Ok(bvh)
}

/// The static hierarchy, built on first use after an invalidation.
fn cached_bvh<'a>(
    slot: &'a mut Option<Bvh>,
    objects: &[WorldObject],
    settings: &BvhSettings,
) -> Result<&'a Bvh, BvhError> {
    let bvh = match slot.take() {
        Some(bvh) => bvh,
        None => timed_build(objects.to_vec(), settings)?,
    };
    Ok(slot.insert(bvh))
}

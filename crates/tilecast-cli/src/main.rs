//! tilecast CLI - headless renderer for world snapshots
//!
//! Renders a JSON world snapshot to a PNG and reports BVH statistics.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use tilecast::math::{Vec3, TILE_SIZE};
use tilecast::raytrace::Bvh;
use tilecast::scene::TextureCache;
use tilecast::world::{GeometryExtractor, ImageDirectory, WorldSnapshot};
use tilecast::{Camera, CaptureSink, CpuBackend, RenderBackend, Renderer, RendererConfig};

#[derive(Parser)]
#[command(name = "tilecast")]
#[command(about = "Ray-traced 3D views of tile-based worlds", long_about = None)]
struct Cli {
    /// Renderer config (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding texture PNGs; defaults to the snapshot's directory
    #[arg(short, long, global = true)]
    textures: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a snapshot to a PNG
    Render {
        /// World snapshot (.json)
        snapshot: PathBuf,
        /// Output image
        #[arg(short, long, default_value = "frame.png")]
        out: PathBuf,
        /// Eye position as x,y,z (default: above and behind the map)
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        camera: Option<Vec3>,
        /// Look-at point as x,y,z (default: map center)
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        target: Option<Vec3>,
        /// Vertical field of view in degrees
        #[arg(long, default_value_t = 70.0)]
        fov: f32,
        /// Trace on the GPU
        #[arg(long)]
        gpu: bool,
    },
    /// Extract geometry and print BVH statistics
    BvhStats {
        /// World snapshot (.json)
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RendererConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RendererConfig::default(),
    };

    match cli.command {
        Commands::Render {
            snapshot,
            out,
            camera,
            target,
            fov,
            gpu,
        } => {
            let textures = texture_dir(cli.textures, &snapshot);
            render(&snapshot, &out, config, &textures, camera, target, fov, gpu)?;
        }
        Commands::BvhStats { snapshot } => {
            let textures = texture_dir(cli.textures, &snapshot);
            bvh_stats(&snapshot, &config, &textures)?;
        }
    }

    Ok(())
}

fn texture_dir(explicit: Option<PathBuf>, snapshot: &Path) -> ImageDirectory {
    let root = explicit.unwrap_or_else(|| {
        snapshot
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });
    ImageDirectory::new(root)
}

fn load_snapshot(path: &Path) -> Result<WorldSnapshot> {
    WorldSnapshot::load(path).with_context(|| format!("loading snapshot {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn render(
    snapshot_path: &Path,
    out: &Path,
    config: RendererConfig,
    textures: &ImageDirectory,
    eye: Option<Vec3>,
    target: Option<Vec3>,
    fov: f32,
    gpu: bool,
) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path)?;
    let (center, span) = map_extent(&snapshot);
    let target = target.unwrap_or(center);
    let eye = eye.unwrap_or_else(|| center + Vec3::new(0.0, span, -span));
    let camera = Camera::look_at(
        eye,
        target,
        config.width as f32 / config.height as f32,
        fov,
    );

    let mut renderer = Renderer::new(config, backend(gpu)?)?;
    let mut sink = CaptureSink::new();
    let start = Instant::now();
    renderer.render_frame(&snapshot, textures, &camera, &mut sink)?;
    info!(
        "rendered {} objects in {:?}",
        renderer.static_objects().len(),
        start.elapsed()
    );

    let Some(frame) = sink.frame() else {
        bail!("renderer presented no frame");
    };
    frame
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote {}", out.display());
    Ok(())
}

#[cfg(feature = "gpu")]
fn backend(gpu: bool) -> Result<Box<dyn RenderBackend>> {
    if gpu {
        return Ok(Box::new(tilecast::GpuBackend::new()?));
    }
    Ok(Box::new(CpuBackend))
}

#[cfg(not(feature = "gpu"))]
fn backend(gpu: bool) -> Result<Box<dyn RenderBackend>> {
    if gpu {
        bail!("built without GPU support; rebuild with --features gpu");
    }
    Ok(Box::new(CpuBackend))
}

fn bvh_stats(snapshot_path: &Path, config: &RendererConfig, textures: &ImageDirectory) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path)?;
    let extractor = GeometryExtractor::new(config.classification.clone());
    let mut cache = TextureCache::new();

    let start = Instant::now();
    let objects = extractor.rebuild(&snapshot, textures, &mut cache);
    let extracted = start.elapsed();
    let count = objects.len();

    let start = Instant::now();
    let bvh = Bvh::build(objects, &config.bvh_settings())?;
    let built = start.elapsed();
    let bounds = bvh.bounds();

    println!("Objects:        {count}");
    println!("Textures:       {} ({} pixels)", cache.len(), cache.pixels().len());
    println!("Nodes:          {}", bvh.node_count());
    println!("Leaves:         {}", bvh.leaf_count());
    println!("Depth:          {}", bvh.depth());
    if count > 0 {
        println!(
            "Bounds:         ({:.1}, {:.1}, {:.1}) - ({:.1}, {:.1}, {:.1})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }
    println!("Extract time:   {extracted:?}");
    println!("Build time:     {built:?}");
    Ok(())
}

/// Center of the largest tile layer and its longest side, in world units.
fn map_extent(snapshot: &WorldSnapshot) -> (Vec3, f32) {
    let (width, height) = snapshot
        .layers
        .iter()
        .map(|layer| (layer.width, layer.height))
        .max_by_key(|&(w, h)| u64::from(w) * u64::from(h))
        .unwrap_or((1, 1));
    let (w, h) = (width as f32 * TILE_SIZE, height as f32 * TILE_SIZE);
    let center = Vec3::new(w / 2.0 - TILE_SIZE / 2.0, 0.0, h / 2.0 - TILE_SIZE / 2.0);
    (center, w.max(h).max(TILE_SIZE))
}

fn parse_vec3(s: &str) -> std::result::Result<Vec3, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<std::result::Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1, -2.5,3").unwrap(), Vec3::new(1.0, -2.5, 3.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("a,b,c").is_err());
    }

    #[test]
    fn test_map_extent() {
        let snapshot = WorldSnapshot::from_json_str(
            r#"{ "layers": [{ "name": "Back", "width": 4, "height": 2, "tiles": [] }] }"#,
        )
        .unwrap();
        let (center, span) = map_extent(&snapshot);
        assert_eq!(center, Vec3::new(96.0, 0.0, 32.0));
        assert_eq!(span, 256.0);
    }

    #[test]
    fn test_map_extent_picks_largest_layer() {
        let snapshot = WorldSnapshot::from_json_str(
            r#"{ "layers": [
                { "name": "Back", "width": 4, "height": 2 },
                { "name": "Front", "width": 70000, "height": 70000 }
            ] }"#,
        )
        .unwrap();
        let (_, span) = map_extent(&snapshot);
        assert_eq!(span, 70_000.0 * TILE_SIZE);
    }
}

//! Where the ray-trace kernel runs.

use tilecast_math::Color;
use tilecast_raytrace::{render, FrameParams, SceneView};

use crate::RenderError;

/// Traces one frame of a scene into a color buffer.
pub trait RenderBackend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Trace `scene` as seen by `frame` into `out` (`width * height` long).
    ///
    /// `texture_revision` changes whenever the scene's texture pixels do, so
    /// backends holding a copy can skip re-uploading them.
    fn render(
        &mut self,
        scene: &SceneView<'_>,
        frame: &FrameParams,
        texture_revision: u64,
        out: &mut [Color],
    ) -> Result<(), RenderError>;
}

/// The rayon-parallel CPU kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl RenderBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn render(
        &mut self,
        scene: &SceneView<'_>,
        frame: &FrameParams,
        _texture_revision: u64,
        out: &mut [Color],
    ) -> Result<(), RenderError> {
        Ok(render(scene, frame, out)?)
    }
}

#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;

#[cfg(feature = "gpu")]
mod gpu {
    use tilecast_gpu::GpuContext;
    use tilecast_raytrace::gpu::RayTracePipeline;

    use super::*;

    /// The wgpu compute kernel.
    pub struct GpuBackend {
        ctx: &'static GpuContext,
        pipeline: RayTracePipeline,
    }

    impl GpuBackend {
        /// Initialize the shared GPU context and compile the pipeline.
        pub fn new() -> Result<Self, RenderError> {
            let ctx = GpuContext::init_blocking()?;
            Ok(Self {
                ctx,
                pipeline: RayTracePipeline::new(ctx),
            })
        }
    }

    impl RenderBackend for GpuBackend {
        fn name(&self) -> &'static str {
            "gpu"
        }

        fn render(
            &mut self,
            scene: &SceneView<'_>,
            frame: &FrameParams,
            texture_revision: u64,
            out: &mut [Color],
        ) -> Result<(), RenderError> {
            let expected = frame.pixel_count();
            if out.len() != expected {
                return Err(tilecast_raytrace::KernelError::OutputSize {
                    expected,
                    actual: out.len(),
                }
                .into());
            }
            self.pipeline
                .render(self.ctx, scene, frame, texture_revision, out)?;
            Ok(())
        }
    }
}

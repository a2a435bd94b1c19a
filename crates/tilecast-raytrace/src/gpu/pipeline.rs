//! wgpu compute pipeline for ray tracing.
//!
//! Scene buffers persist across frames. A buffer is recreated only when its
//! element count changes, otherwise it is rewritten in place; the bind group
//! is rebuilt whenever any buffer is recreated.

use bytemuck::Pod;
use tilecast_gpu::{GpuContext, GpuError};
use tilecast_math::Color;
use wgpu::util::DeviceExt;

use super::buffers::{padded, GpuBvhNode, GpuFrameUniform, GpuLight, GpuObject};
use crate::kernel::{FrameParams, SceneView};

/// A storage buffer and the element count it was created for.
struct SizedBuffer {
    buffer: wgpu::Buffer,
    len: usize,
}

/// Upload `data` into `slot`, recreating the buffer if the length changed.
///
/// Returns true if the buffer was recreated.
fn upload<T: Pod>(
    ctx: &GpuContext,
    slot: &mut Option<SizedBuffer>,
    label: &'static str,
    data: &[T],
    usage: wgpu::BufferUsages,
) -> Result<bool, GpuError> {
    let size = std::mem::size_of_val(data) as u64;
    let limit = ctx.max_storage_binding();
    if size > limit {
        return Err(GpuError::BufferTooLarge { label, size, limit });
    }

    match slot {
        Some(existing) if existing.len == data.len() => {
            ctx.queue.write_buffer(&existing.buffer, 0, bytemuck::cast_slice(data));
            Ok(false)
        }
        _ => {
            let buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: usage | wgpu::BufferUsages::COPY_DST,
            });
            log::debug!("allocated {label}: {} elements", data.len());
            *slot = Some(SizedBuffer {
                buffer,
                len: data.len(),
            });
            Ok(true)
        }
    }
}

fn binding(slot: &Option<SizedBuffer>) -> Option<wgpu::BindingResource<'_>> {
    slot.as_ref().map(|s| s.buffer.as_entire_binding())
}

#[derive(Default)]
struct Resources {
    uniform: Option<SizedBuffer>,
    nodes: Option<SizedBuffer>,
    objects: Option<SizedBuffer>,
    textures: Option<SizedBuffer>,
    lights: Option<SizedBuffer>,
    output: Option<SizedBuffer>,
    readback: Option<SizedBuffer>,
    bind_group: Option<wgpu::BindGroup>,
    texture_revision: Option<u64>,
}

/// Ray tracing compute pipeline with persistent scene buffers.
pub struct RayTracePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    resources: Resources,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl RayTracePipeline {
    /// Create a new ray trace pipeline.
    pub fn new(ctx: &GpuContext) -> Self {
        let shader_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ray Trace Shader"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::RAYTRACE_SHADER.into()),
        });

        let bind_group_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ray Trace Bind Group Layout"),
            entries: &[
                // Frame uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),  // BVH nodes
                storage_entry(2, true),  // objects
                storage_entry(3, true),  // texture pixels
                storage_entry(4, true),  // lights
                storage_entry(5, false), // output pixels
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ray Trace Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ray Trace Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            resources: Resources::default(),
        }
    }

    /// Trace a frame on the GPU into `out`.
    ///
    /// Texture pixels are re-uploaded only when `texture_revision` differs
    /// from the previous call or the buffer size changed. Blocks until the
    /// result has been read back.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        scene: &SceneView<'_>,
        frame: &FrameParams,
        texture_revision: u64,
        out: &mut [Color],
    ) -> Result<(), GpuError> {
        let pixel_count = frame.pixel_count();
        debug_assert_eq!(out.len(), pixel_count);
        let res = &mut self.resources;
        let mut rebind = res.bind_group.is_none();

        let uniform = GpuFrameUniform::new(frame, scene.lights.len(), scene.nodes.len());
        rebind |= upload(
            ctx,
            &mut res.uniform,
            "Frame Uniform",
            std::slice::from_ref(&uniform),
            wgpu::BufferUsages::UNIFORM,
        )?;

        let nodes: Vec<GpuBvhNode> = padded(scene.nodes);
        rebind |= upload(ctx, &mut res.nodes, "BVH Buffer", &nodes, wgpu::BufferUsages::STORAGE)?;

        let objects: Vec<GpuObject> = padded(scene.objects);
        rebind |= upload(ctx, &mut res.objects, "Object Buffer", &objects, wgpu::BufferUsages::STORAGE)?;

        let texture_len = scene.textures.len().max(1);
        let textures_stale = res.texture_revision != Some(texture_revision)
            || res.textures.as_ref().map(|t| t.len) != Some(texture_len);
        if textures_stale {
            let packed: Vec<u32> = if scene.textures.is_empty() {
                vec![0]
            } else {
                scene.textures.iter().map(Color::pack).collect()
            };
            rebind |= upload(ctx, &mut res.textures, "Texture Buffer", &packed, wgpu::BufferUsages::STORAGE)?;
            res.texture_revision = Some(texture_revision);
        }

        let lights: Vec<GpuLight> = padded(scene.lights);
        rebind |= upload(ctx, &mut res.lights, "Light Buffer", &lights, wgpu::BufferUsages::STORAGE)?;

        if res.output.as_ref().map(|o| o.len) != Some(pixel_count) {
            let size = (pixel_count * std::mem::size_of::<u32>()) as u64;
            let limit = ctx.max_storage_binding();
            if size > limit {
                return Err(GpuError::BufferTooLarge {
                    label: "Output Buffer",
                    size,
                    limit,
                });
            }
            res.output = Some(SizedBuffer {
                buffer: ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Output Buffer"),
                    size,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                }),
                len: pixel_count,
            });
            res.readback = Some(SizedBuffer {
                buffer: ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Readback Buffer"),
                    size,
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                }),
                len: pixel_count,
            });
            rebind = true;
        }

        if rebind {
            let entries: Vec<wgpu::BindGroupEntry<'_>> = [
                binding(&res.uniform),
                binding(&res.nodes),
                binding(&res.objects),
                binding(&res.textures),
                binding(&res.lights),
                binding(&res.output),
            ]
            .into_iter()
            .enumerate()
            .filter_map(|(i, resource)| {
                resource.map(|resource| wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource,
                })
            })
            .collect();
            res.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Ray Trace Bind Group"),
                layout: &self.bind_group_layout,
                entries: &entries,
            }));
        }

        let (Some(bind_group), Some(output), Some(readback)) = (&res.bind_group, &res.output, &res.readback)
        else {
            return Err(GpuError::BufferMapping);
        };

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Ray Trace Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ray Trace Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(frame.width.div_ceil(8), frame.height.div_ceil(8), 1);
        }
        encoder.copy_buffer_to_buffer(&output.buffer, 0, &readback.buffer, 0, readback.buffer.size());
        ctx.queue.submit(Some(encoder.finish()));

        let buffer_slice = readback.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::BufferMapping)?
            .map_err(|_| GpuError::BufferMapping)?;

        {
            let data = buffer_slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data));
        }
        readback.buffer.unmap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{Bvh, BvhSettings};
    use crate::kernel::render;
    use tilecast_math::{up, Mat4, Vec3};
    use tilecast_scene::{Light, ObjectKind, WorldObject};

    fn frame() -> FrameParams {
        let eye = Vec3::new(64.0, 200.0, -100.0);
        let view = Mat4::look_at_rh(&eye.into(), &Vec3::new(32.0, 0.0, 32.0).into(), &up());
        let projection = Mat4::new_perspective(16.0 / 9.0, 70f32.to_radians(), 0.05, 1000.0);
        FrameParams::new(&view, &projection, eye, 64, 36).unwrap()
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_gpu_matches_cpu() {
        let Ok(ctx) = GpuContext::init_blocking() else {
            return;
        };
        let objects = (0..4)
            .map(|i| {
                WorldObject::new(
                    Vec3::new((i % 2) as f32 * 64.0, 0.0, (i / 2) as f32 * 64.0),
                    Vec3::repeat(64.0),
                    Color::rgba(36, 36, 36, 255),
                    ObjectKind::Tile,
                )
            })
            .collect();
        let bvh = Bvh::build(objects, &BvhSettings::default()).unwrap();
        let lights = [Light::sun()];
        let scene = SceneView::new(&bvh, &[], &lights);
        let frame = frame();

        let mut cpu = vec![Color::TRANSPARENT; frame.pixel_count()];
        render(&scene, &frame, &mut cpu).unwrap();

        let mut pipeline = RayTracePipeline::new(ctx);
        let mut gpu = vec![Color::TRANSPARENT; frame.pixel_count()];
        pipeline.render(ctx, &scene, &frame, 0, &mut gpu).unwrap();

        let differing = cpu
            .iter()
            .zip(&gpu)
            .filter(|(a, b)| a.a != b.a || a.r.abs_diff(b.r) > 2)
            .count();
        // Silhouette pixels may flip on float differences.
        assert!(differing < cpu.len() / 50);

        // Second frame reuses buffers.
        pipeline.render(ctx, &scene, &frame, 0, &mut gpu).unwrap();
    }
}

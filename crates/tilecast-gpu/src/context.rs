//! GPU context management for wgpu device and queue.

use std::sync::OnceLock;
use thiserror::Error;
use wgpu::{Device, Instance, Queue};

static GPU_CONTEXT: OnceLock<GpuContext> = OnceLock::new();

/// Errors that can occur during GPU operations.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Buffer mapping failed.
    #[error("Buffer mapping failed")]
    BufferMapping,

    /// A buffer would exceed the device's storage binding limit.
    #[error("{label} needs {size} bytes, device limit is {limit}")]
    BufferTooLarge {
        /// Which buffer.
        label: &'static str,
        /// Requested size in bytes.
        size: u64,
        /// Device limit in bytes.
        limit: u64,
    },
}

/// Process-wide GPU context holding device and queue.
pub struct GpuContext {
    /// The wgpu device for creating resources and pipelines.
    pub device: Device,
    /// The command queue for submitting work.
    pub queue: Queue,
}

impl GpuContext {
    /// Initialize the GPU context asynchronously.
    ///
    /// Subsequent calls return the existing context.
    pub async fn init() -> Result<&'static Self, GpuError> {
        if let Some(ctx) = GPU_CONTEXT.get() {
            return Ok(ctx);
        }

        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!(
            "using GPU adapter {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        // A racing initializer may have won; either context is usable.
        Ok(GPU_CONTEXT.get_or_init(|| GpuContext { device, queue }))
    }

    /// Get the GPU context if it has been initialized.
    pub fn get() -> Option<&'static Self> {
        GPU_CONTEXT.get()
    }

    /// Initialize the GPU context synchronously.
    pub fn init_blocking() -> Result<&'static Self, GpuError> {
        pollster::block_on(Self::init())
    }

    /// Largest storage buffer binding the device accepts.
    pub fn max_storage_binding(&self) -> u64 {
        u64::from(self.device.limits().max_storage_buffer_binding_size)
    }
}

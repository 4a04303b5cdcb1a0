//! wgpu backend
//!
//! Device setup, meshes, the three wall render targets, the stereo eye
//! buffer, the renderer that executes a [`FramePlan`](crate::driver::FramePlan)
//! and the desktop mirror compositor.

pub mod mesh;
pub mod mirror;
pub mod renderer;
pub mod targets;

pub use mirror::MirrorCompositor;
pub use renderer::Renderer;
pub use targets::{EyeBuffers, RenderTarget, WallTargets};

use log::info;
use wgpu::{Adapter, Device, DeviceDescriptor, Instance, Queue, Surface};

use crate::error::GpuError;

/// Adapter, device and queue shared by every GPU component
pub struct GpuContext {
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    pub async fn new(instance: &Instance, surface: Option<&Surface<'_>>) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("Using GPU adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Cave Device"),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| GpuError::RequestDevice(e.to_string()))?;

        Ok(Self { adapter, device, queue })
    }

    /// Largest square texture the device accepts
    pub fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

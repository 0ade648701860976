//! Device setup
//!
//! Generic adapter/device acquisition shared by the viewer and the GPU
//! tests. The device asks for the adapter's own limits so large meshes can
//! use the full storage binding size.

use super::error_recovery::GpuErrorMonitor;
use crate::error::{VisibilityError, VisibilityResult};
use std::sync::Arc;

/// Device, queue and the adapter they came from
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub monitor: GpuErrorMonitor,
}

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::util::backend_bits_from_env().unwrap_or(wgpu::Backends::PRIMARY),
        ..Default::default()
    })
}

/// Request an adapter (compatible with `surface` when given) and a device
pub async fn request_context(
    instance: wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> VisibilityResult<GpuContext> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(VisibilityError::AdapterNotFound)?;

    let info = adapter.get_info();
    log::info!(
        "[GPU] Using adapter {} ({:?}, {:?})",
        info.name,
        info.device_type,
        info.backend
    );

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Visibility Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        )
        .await?;

    let monitor = GpuErrorMonitor::install(&device);

    Ok(GpuContext {
        instance,
        adapter,
        device: Arc::new(device),
        queue: Arc::new(queue),
        monitor,
    })
}

/// Device without a surface, for offscreen rendering and tests
pub fn request_headless_context() -> VisibilityResult<GpuContext> {
    pollster::block_on(request_context(create_instance(), None))
}

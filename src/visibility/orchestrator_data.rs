//! Frame orchestrator data - Pure DOP
//!
//! NO METHODS. Just data.
//! Resources are grouped by lifetime: device-wide, per mesh, per screen size.

use super::depth_pyramid_data::DepthPyramid;
use super::hiz_data::HizOutput;
use super::octree_data::OctreeIndex;
use super::pipeline_data::VisibilityPipelines;
use super::scanline_data::{PixelBuffers, SpanBuffers};
use crate::geometry::{GeometryStore, AABB};
use crate::gpu::GpuErrorMonitor;
use cgmath::Vector3;
use std::sync::Arc;

/// One dispatch of the strided fill kernel over a fixed buffer range
pub struct FillJob {
    pub params_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub groups: (u32, u32),
}

/// Mesh-dependent values of the frame uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSizing {
    pub bounds: AABB,
    pub triangle_count: u32,
    pub span_capacity: u32,
    pub pool_capacity: u32,
}

/// Recreated on every mesh load
pub struct MeshResources {
    pub sizing: MeshSizing,
    pub geometry: GeometryStore,
    pub spans: SpanBuffers,
    pub octree: OctreeIndex,
    pub hiz: HizOutput,
    pub octree_head_fill: FillJob,
    pub octree_marker_fill: FillJob,
}

/// Recreated on every resize
pub struct ScreenResources {
    pub width: u32,
    pub height: u32,
    pub pyramid: DepthPyramid,
    pub pixels: PixelBuffers,

    /// Fresh depth buffer for the survivor draw; the pyramid still holds the prepass
    pub empty_depth: wgpu::Buffer,

    pub pyramid_fill: FillJob,
    pub empty_depth_fill: FillJob,
}

/// Group 0 bind groups; depend on both mesh and screen resources
pub struct FrameBindGroups {
    pub wireframe: wgpu::BindGroup,
    /// Depth at binding 3 is pyramid mip 0
    pub mesh_surface: wgpu::BindGroup,
    /// Depth at binding 3 is the empty depth buffer
    pub survivor_surface: wgpu::BindGroup,
    pub blit: wgpu::BindGroup,
    pub scanline_init: wgpu::BindGroup,
    pub scanline_work: wgpu::BindGroup,
    pub reduce: wgpu::BindGroup,
    pub hiz_naive: wgpu::BindGroup,
    pub octree_build: wgpu::BindGroup,
    pub hiz_octree: wgpu::BindGroup,
}

/// Runs one render mode per frame over the loaded mesh
pub struct FrameOrchestrator {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub monitor: GpuErrorMonitor,
    pub pipelines: VisibilityPipelines,

    /// `FrameUniforms`, rewritten at the start of every frame
    pub uniform_buffer: wgpu::Buffer,

    /// `SPAN_COUNTER_RESET` then `DRAW_ARGS_RESET`, copied over the live counters
    pub reset_templates: wgpu::Buffer,

    pub light_direction: Vector3<f32>,
    pub clear_color: wgpu::Color,

    pub mesh: Option<MeshResources>,
    pub screen: ScreenResources,
    pub bind_groups: Option<FrameBindGroups>,

    pub frame_count: u64,
}

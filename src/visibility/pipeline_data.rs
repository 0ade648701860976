//! Pipeline data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Every pipeline is compiled once per device and target format.

/// Bind group layouts, one per kernel family
pub struct VisibilityLayouts {
    /// frame, vertices, indices, depth (fragment writable)
    pub surface: wgpu::BindGroupLayout,
    /// frame only
    pub wireframe: wgpu::BindGroupLayout,
    /// frame, packed colour
    pub blit: wgpu::BindGroupLayout,
    pub scanline_init: wgpu::BindGroupLayout,
    pub scanline_work: wgpu::BindGroupLayout,
    /// frame, pyramid
    pub reduce: wgpu::BindGroupLayout,
    /// Group 1 single-value uniform shared by reduction and octree level tests
    pub pass_params: wgpu::BindGroupLayout,
    pub hiz_naive: wgpu::BindGroupLayout,
    pub octree_build: wgpu::BindGroupLayout,
    pub hiz_octree: wgpu::BindGroupLayout,
    pub fill: wgpu::BindGroupLayout,
}

pub struct VisibilityPipelines {
    pub layouts: VisibilityLayouts,
    pub target_format: wgpu::TextureFormat,

    pub wireframe: wgpu::RenderPipeline,
    pub mesh_depth: wgpu::RenderPipeline,
    pub mesh_shade: wgpu::RenderPipeline,
    pub survivor_depth: wgpu::RenderPipeline,
    pub survivor_shade: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,

    pub fill: wgpu::ComputePipeline,
    pub scanline_init: wgpu::ComputePipeline,
    pub scanline_work: wgpu::ComputePipeline,
    pub reduce: wgpu::ComputePipeline,
    pub test_triangles: wgpu::ComputePipeline,
    pub build_octree: wgpu::ComputePipeline,
    pub test_octree_level: wgpu::ComputePipeline,
}

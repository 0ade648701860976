//! Depth pyramid data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Layout math and GPU recording live in depth_pyramid_operations.rs

/// One mip of the pyramid inside its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    /// Word offset of texel (0, 0) in the near channel
    pub offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Mip chain geometry for one screen size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidLayout {
    pub width: u32,
    pub height: u32,
    /// Finest first, never more than `MAX_MIP_LEVELS`
    pub levels: Vec<MipLevel>,
    /// Texels per channel across all levels
    pub texel_count: u32,
}

/// One reduction dispatch and its source-level uniform
pub struct ReductionPass {
    pub source_level: u32,
    pub groups: (u32, u32),
    pub params_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// GPU depth pyramid, recreated on every resize
pub struct DepthPyramid {
    pub layout: PyramidLayout,

    /// Near channel in `[0, texel_count)`, far channel in `[texel_count, 2 * texel_count)`.
    /// Mip 0 of the near channel doubles as the depth buffer of the non-Hi-Z modes.
    pub buffer: wgpu::Buffer,

    pub reduction_passes: Vec<ReductionPass>,
}

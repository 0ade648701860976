//! Host mirrors of the structs declared in the WGSL kernels.
//!
//! Layouts must match byte for byte; the size assertions below pin them.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

/// Per-frame uniform read by every kernel and pass (`FrameUniforms` in common.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub bound_min: [f32; 4],
    pub bound_max: [f32; 4],
    /// width, height, mip count, triangle count
    pub screen: [u32; 4],
    /// span capacity, node pool capacity, pyramid texels per channel, octree cells
    pub capacity: [u32; 4],
    /// offset, width, height, unused
    pub mips: [[u32; 4]; 12],
    /// cell offset, resolution, unused, unused
    pub octree_levels: [[u32; 4]; 8],
}

/// One row of one triangle
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSpan {
    pub normal: [f32; 3],
    pub x_start: i32,
    pub x_end: i32,
    pub y: i32,
    pub z_start: f32,
    pub dzdx: f32,
}

/// Span counter, laid out as `DispatchIndirectArgs` followed by the raw count
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SpanCounter {
    pub dispatch_x: u32,
    pub dispatch_y: u32,
    pub dispatch_z: u32,
    pub span_count: u32,
}

/// Per-cell list head and marker word
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OctreeCell {
    pub head: u32,
    pub marker: u32,
}

/// Node pool record
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OctreeNode {
    pub face: u32,
    pub next: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OctreeCounters {
    pub allocated: u32,
    pub dropped: u32,
    pub per_level: [u32; 8],
}

/// Survivor vertex fed to the final indirect draw
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct HizVertex {
    pub clip: [f32; 4],
    pub normal: [f32; 4],
}

/// `DrawIndirectArgs` with an atomically bumped vertex count
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Parameters of one fill dispatch
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FillParams {
    pub value: u32,
    pub count: u32,
    pub stride: u32,
    pub first: u32,
}

/// Single-value uniform selecting a reduction source mip or an octree level
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PassParams {
    pub value: [u32; 4],
}

pub const SPAN_COUNTER_RESET: SpanCounter = SpanCounter {
    dispatch_x: 0,
    dispatch_y: 1,
    dispatch_z: 1,
    span_count: 0,
};

pub const DRAW_ARGS_RESET: DrawArgs = DrawArgs {
    vertex_count: 0,
    instance_count: 1,
    first_vertex: 0,
    first_instance: 0,
};

const_assert_eq!(size_of::<FrameUniforms>(), 464);
const_assert_eq!(size_of::<GpuSpan>(), 32);
const_assert_eq!(size_of::<SpanCounter>(), 16);
const_assert_eq!(size_of::<OctreeCell>(), 8);
const_assert_eq!(size_of::<OctreeNode>(), 8);
const_assert_eq!(size_of::<OctreeCounters>(), 40);
const_assert_eq!(size_of::<HizVertex>(), 32);
const_assert_eq!(size_of::<DrawArgs>(), 16);
const_assert_eq!(size_of::<FillParams>(), 16);

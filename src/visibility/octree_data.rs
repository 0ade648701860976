//! Octree data structures - Pure DOP
//!
//! NO METHODS. Just data.

use crate::constants::octree::LEVEL_COUNT;

/// Placement of one level's cells inside the cell buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeLevel {
    pub offset: u32,
    pub resolution: u32,
}

/// Cell buffer layout; levels below the start level stay zeroed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctreeLayout {
    pub levels: [OctreeLevel; LEVEL_COUNT as usize],
    pub cell_count: u32,
}

/// Where a triangle is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    pub level: u32,
    pub cell: [u32; 3],
    pub oversize: bool,
}

/// One per-level tester dispatch
pub struct LevelPass {
    pub level: u32,
    pub groups: (u32, u32),
    pub params_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// GPU octree index, recreated on every mesh load
pub struct OctreeIndex {
    pub layout: OctreeLayout,

    /// `OctreeCell` per cell: list head (sentinel when empty) and marker word
    pub cells: wgpu::Buffer,

    /// `OctreeNode` pool, one slot per triangle
    pub pool: wgpu::Buffer,
    pub pool_capacity: u32,

    /// `OctreeCounters`: bump allocator, drops, per-level insert counts
    pub counters: wgpu::Buffer,

    /// Coarsest level first
    pub level_passes: Vec<LevelPass>,
}

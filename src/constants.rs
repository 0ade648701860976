//! Compile-time constants shared by the host code and the WGSL kernels.
//!
//! Every value here has a twin in `shaders/common.wgsl`; change both together.

/// Depth pyramid constants
pub mod pyramid {
    /// Size of the mip table in the frame uniform. Mips past the computed
    /// count alias the last valid level.
    pub const MAX_MIP_LEVELS: u32 = 12;

    /// Stored depth meaning "nothing written yet" (bits of `f32::MAX`).
    pub const DEPTH_SENTINEL: u32 = 0x7F7F_FFFF;

    /// Square workgroup edge of the reduction kernel.
    pub const REDUCE_TILE: u32 = 8;

    /// Mip levels produced by one reduction dispatch (8 -> 4 -> 2 -> 1).
    pub const LEVELS_PER_DISPATCH: u32 = 4;

    /// Slack subtracted from a box's nearest depth before the pyramid
    /// comparison; rasterized depth may round below the nearest corner.
    pub const HIZ_DEPTH_BIAS: f32 = 1.0e-6;
}

/// Octree constants
pub mod octree {
    /// Number of octree levels, counting the unused root levels.
    pub const LEVEL_COUNT: u32 = 8;

    /// Coarsest resident level. Levels below it are never allocated.
    pub const START_LEVEL: u32 = 3;

    /// Head pointer value of an empty cell list.
    pub const EMPTY_HEAD: u32 = 0xFFFF_FFFF;

    /// Marker word layout
    pub const MARKER_COUNT_MASK: u32 = 0x0FFF_FFFF;
    pub const MARKER_OVERSIZE: u32 = 1 << 28;
    pub const MARKER_OCCUPIED: u32 = 1 << 29;
    pub const MARKER_CULLED: u32 = 1 << 30;

    /// Resolution (cells per axis) of a level.
    pub const fn resolution(level: u32) -> u32 {
        1 << level
    }
}

/// Scanline rasterizer constants
pub mod scanline {
    /// Span budget per triangle per unit of bounding-box diagonal.
    pub const SPANS_PER_TRIANGLE_UNIT: u64 = 1024;

    /// Lower bound on the span buffer, enough for a handful of full-screen triangles.
    pub const MIN_SPAN_CAPACITY: u64 = 1 << 16;

    /// Hard cap: the indirect dispatch may not exceed 65535 workgroups.
    pub const MAX_SPAN_CAPACITY: u64 = 65_535 * super::workgroup::LINEAR as u64;

    /// Pixel lock word values
    pub const UNLOCKED: u32 = 0;
    pub const LOCKED: u32 = 1;
}

/// Workgroup sizes
pub mod workgroup {
    /// One-dimensional kernels (per triangle, per span, per cell, fills).
    pub const LINEAR: u32 = 256;

    /// WebGPU default limit on workgroups per dispatch dimension.
    pub const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;
}

/// Camera defaults
pub mod camera {
    pub const FOV_DEGREES: f32 = 90.0;
    pub const NEAR_PLANE: f32 = 0.01;
    pub const FAR_PLANE: f32 = 1000.0;
}

/// Projected points with `w` at or below this are treated as behind the eye.
pub const CLIP_W_EPSILON: f32 = 1.0e-5;

//! Octree operations
//!
//! Placement math here is the host twin of octree_common.wgsl and
//! octree_build.wgsl and must stay numerically identical to it.

use super::gpu_types::{OctreeCell, OctreeCounters, OctreeNode, PassParams};
use super::octree_data::{CellPlacement, LevelPass, OctreeIndex, OctreeLayout, OctreeLevel};
use crate::constants::octree::{
    resolution, LEVEL_COUNT, MARKER_COUNT_MASK, MARKER_CULLED, MARKER_OCCUPIED,
    MARKER_OVERSIZE, START_LEVEL,
};
use crate::geometry::aabb::{aabb_extent, AABB};
use crate::gpu::{create_buffer_bind_group, linear_dispatch};
use cgmath::Point3;
use std::mem::size_of;
use wgpu::util::DeviceExt;

// ============================================================================
// LAYOUT
// ============================================================================

pub fn create_octree_layout() -> OctreeLayout {
    let mut levels = [OctreeLevel::default(); LEVEL_COUNT as usize];
    let mut offset = 0;
    for level in START_LEVEL..LEVEL_COUNT {
        let r = resolution(level);
        levels[level as usize] = OctreeLevel {
            offset,
            resolution: r,
        };
        offset += r * r * r;
    }
    OctreeLayout {
        levels,
        cell_count: offset,
    }
}

pub fn octree_level_table(layout: &OctreeLayout) -> [[u32; 4]; LEVEL_COUNT as usize] {
    let mut table = [[0u32; 4]; LEVEL_COUNT as usize];
    for (entry, level) in table.iter_mut().zip(layout.levels.iter()) {
        *entry = [level.offset, level.resolution, 0, 0];
    }
    table
}

pub fn cell_index(layout: &OctreeLayout, level: u32, cell: [u32; 3]) -> u32 {
    let info = layout.levels[level as usize];
    info.offset + cell[0] + cell[1] * info.resolution + cell[2] * info.resolution * info.resolution
}

/// Inverse of `cell_index` within one level
pub fn cell_coords(resolution: u32, local: u32) -> [u32; 3] {
    [
        local % resolution,
        (local / resolution) % resolution,
        local / (resolution * resolution),
    ]
}

// ============================================================================
// PLACEMENT
// ============================================================================

/// Bounds-relative coordinates in [0, 1]; flat axes map to 0
pub fn to_unit(point: Point3<f32>, bounds: &AABB) -> [f32; 3] {
    let extent = aabb_extent(bounds);
    let axis = |p: f32, min: f32, e: f32| {
        let safe = if e <= 0.0 { 1.0 } else { e };
        ((p - min) / safe).clamp(0.0, 1.0)
    };
    [
        axis(point.x, bounds.min.x, extent.x),
        axis(point.y, bounds.min.y, extent.y),
        axis(point.z, bounds.min.z, extent.z),
    ]
}

/// Deepest level whose cell edge covers `extent`, never coarser than the start level
pub fn insertion_level(extent: f32) -> u32 {
    let mut level = LEVEL_COUNT - 1;
    while level > START_LEVEL && extent > 1.0 / resolution(level) as f32 {
        level -= 1;
    }
    level
}

/// Cell for a triangle given its bounds in unit coordinates
pub fn place_triangle(lo: [f32; 3], hi: [f32; 3]) -> CellPlacement {
    let extent = (0..3).map(|i| hi[i] - lo[i]).fold(0.0f32, f32::max);
    let level = insertion_level(extent);
    let r = resolution(level);
    let axis = |i: usize| (((lo[i] + hi[i]) * 0.5 * r as f32) as u32).min(r - 1);
    CellPlacement {
        level,
        cell: [axis(0), axis(1), axis(2)],
        oversize: extent > 1.0 / r as f32,
    }
}

/// Cell bound grown by half a cell on every side
pub fn loose_cell_bounds(bounds: &AABB, level: u32, cell: [u32; 3]) -> AABB {
    let size = 1.0 / resolution(level) as f32;
    let extent = aabb_extent(bounds);
    let lo = |i: usize| cell[i] as f32 * size - 0.5 * size;
    let hi = |i: usize| (cell[i] as f32 + 1.0) * size + 0.5 * size;
    AABB {
        min: Point3::new(
            bounds.min.x + extent.x * lo(0),
            bounds.min.y + extent.y * lo(1),
            bounds.min.z + extent.z * lo(2),
        ),
        max: Point3::new(
            bounds.min.x + extent.x * hi(0),
            bounds.min.y + extent.y * hi(1),
            bounds.min.z + extent.z * hi(2),
        ),
    }
}

// ============================================================================
// MARKERS
// ============================================================================

pub fn marker_count(marker: u32) -> u32 {
    marker & MARKER_COUNT_MASK
}

pub fn marker_is_occupied(marker: u32) -> bool {
    marker & MARKER_OCCUPIED != 0
}

pub fn marker_is_oversize(marker: u32) -> bool {
    marker & MARKER_OVERSIZE != 0
}

pub fn marker_is_culled(marker: u32) -> bool {
    marker & MARKER_CULLED != 0
}

// ============================================================================
// GPU RESOURCES
// ============================================================================

pub fn create_octree_index(
    device: &wgpu::Device,
    triangle_count: u32,
    params_layout: &wgpu::BindGroupLayout,
) -> OctreeIndex {
    let layout = create_octree_layout();

    let cells = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Octree Cell Buffer"),
        size: layout.cell_count as u64 * size_of::<OctreeCell>() as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let pool_capacity = triangle_count.max(1);
    let pool = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Octree Node Pool"),
        size: pool_capacity as u64 * size_of::<OctreeNode>() as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let counters = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Octree Counters"),
        size: size_of::<OctreeCounters>() as u64,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let level_passes = (START_LEVEL..LEVEL_COUNT)
        .map(|level| {
            let params = PassParams {
                value: [level, 0, 0, 0],
            };
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Octree Level Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = create_buffer_bind_group(
                device,
                "Octree Level Params Bind Group",
                params_layout,
                &[(0, &params_buffer)],
            );
            let r = resolution(level);
            LevelPass {
                level,
                groups: linear_dispatch(r * r * r),
                params_buffer,
                bind_group,
            }
        })
        .collect();

    log::info!(
        "[Octree] Levels {}..{} ({} cells), pool capacity {}",
        START_LEVEL,
        LEVEL_COUNT - 1,
        layout.cell_count,
        pool_capacity
    );

    OctreeIndex {
        layout,
        cells,
        pool,
        pool_capacity,
        counters,
        level_passes,
    }
}

/// Insert every triangle, one thread each
pub fn record_octree_build<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    pipeline: &'a wgpu::ComputePipeline,
    bind_group: &'a wgpu::BindGroup,
    triangle_count: u32,
) {
    let (x, y) = linear_dispatch(triangle_count);
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(x, y, 1);
}

/// Test one level, one thread per cell
pub fn record_level_test<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    pipeline: &'a wgpu::ComputePipeline,
    frame_bind_group: &'a wgpu::BindGroup,
    level_pass: &'a LevelPass,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, frame_bind_group, &[]);
    pass.set_bind_group(1, &level_pass.bind_group, &[]);
    pass.dispatch_workgroups(level_pass.groups.0, level_pass.groups.1, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::aabb::aabb_contains_aabb;

    #[test]
    fn test_layout_is_packed_from_start_level() {
        let layout = create_octree_layout();
        assert_eq!(layout.levels[0], OctreeLevel::default());
        assert_eq!(layout.levels[START_LEVEL as usize].offset, 0);
        assert_eq!(layout.levels[4].offset, 8 * 8 * 8);
        let expected: u32 = (START_LEVEL..LEVEL_COUNT).map(|l| resolution(l).pow(3)).sum();
        assert_eq!(layout.cell_count, expected);
    }

    #[test]
    fn test_cell_index_round_trip() {
        let layout = create_octree_layout();
        let cell = [5, 17, 30];
        let index = cell_index(&layout, 6, cell);
        let local = index - layout.levels[6].offset;
        assert_eq!(cell_coords(64, local), cell);
    }

    #[test]
    fn test_insertion_level() {
        assert_eq!(insertion_level(0.0), LEVEL_COUNT - 1);
        assert_eq!(insertion_level(1.0 / 128.0), 7);
        assert_eq!(insertion_level(1.0 / 100.0), 6);
        assert_eq!(insertion_level(1.0 / 8.0), START_LEVEL);
        assert_eq!(insertion_level(0.9), START_LEVEL);
    }

    #[test]
    fn test_oversize_only_at_start_level() {
        let small = place_triangle([0.1, 0.1, 0.1], [0.11, 0.11, 0.11]);
        assert!(!small.oversize);
        let big = place_triangle([0.0, 0.0, 0.0], [1.0, 0.5, 0.5]);
        assert!(big.oversize);
        assert_eq!(big.level, START_LEVEL);
    }

    #[test]
    fn test_loose_bound_contains_placed_triangle() {
        let bounds = AABB {
            min: Point3::new(-1.0, -2.0, 0.0),
            max: Point3::new(3.0, 2.0, 1.0),
        };
        let triangles = [
            (Point3::new(0.0, 0.0, 0.5), Point3::new(0.02, 0.03, 0.51)),
            (Point3::new(2.9, 1.9, 0.9), Point3::new(3.0, 2.0, 1.0)),
            (Point3::new(-1.0, -2.0, 0.0), Point3::new(-0.6, -1.6, 0.1)),
        ];
        for (min, max) in triangles {
            let placement = place_triangle(to_unit(min, &bounds), to_unit(max, &bounds));
            assert!(!placement.oversize);
            let loose = loose_cell_bounds(&bounds, placement.level, placement.cell);
            let tri = AABB { min, max };
            let grown = AABB {
                min: loose.min - cgmath::Vector3::new(1e-5, 1e-5, 1e-5),
                max: loose.max + cgmath::Vector3::new(1e-5, 1e-5, 1e-5),
            };
            assert!(aabb_contains_aabb(&grown, &tri), "{:?} not in {:?}", tri, loose);
        }
    }

    #[test]
    fn test_flat_axis_maps_to_zero() {
        let bounds = AABB {
            min: Point3::new(0.0, 0.0, 2.0),
            max: Point3::new(1.0, 1.0, 2.0),
        };
        assert_eq!(to_unit(Point3::new(0.5, 1.0, 2.0), &bounds), [0.5, 1.0, 0.0]);
    }
}

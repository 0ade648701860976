//! Depth pyramid operations - Pure DOP functions
//!
//! Sizing follows ceil halving, so a coarse texel may have fewer than four
//! children at odd edges; missing children are neutral in the reduction.

use super::depth_pyramid_data::{DepthPyramid, MipLevel, PyramidLayout, ReductionPass};
use super::gpu_types::PassParams;
use crate::constants::pyramid::{LEVELS_PER_DISPATCH, MAX_MIP_LEVELS, REDUCE_TILE};
use crate::gpu::{create_buffer_bind_group, div_ceil};
use wgpu::util::DeviceExt;

// ============================================================================
// LAYOUT
// ============================================================================

/// floor(log2(max(width, height))) + 1, capped at `MAX_MIP_LEVELS`
pub fn compute_mip_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    (32 - largest.leading_zeros()).min(MAX_MIP_LEVELS)
}

/// Size of mip `level`: ceil(size / 2^level), at least 1
pub fn mip_extent(size: u32, level: u32) -> u32 {
    ((size.max(1) - 1) >> level) + 1
}

pub fn create_pyramid_layout(width: u32, height: u32) -> PyramidLayout {
    let (width, height) = (width.max(1), height.max(1));
    let mut levels = Vec::new();
    let mut offset = 0;

    for level in 0..compute_mip_count(width, height) {
        let mip = MipLevel {
            offset,
            width: mip_extent(width, level),
            height: mip_extent(height, level),
        };
        offset += mip.width * mip.height;
        levels.push(mip);
    }

    PyramidLayout {
        width,
        height,
        levels,
        texel_count: offset,
    }
}

/// Fixed-size mip table; slots past the last level repeat it
pub fn mip_table(layout: &PyramidLayout) -> [[u32; 4]; MAX_MIP_LEVELS as usize] {
    let mut table = [[0u32; 4]; MAX_MIP_LEVELS as usize];
    for (slot, entry) in table.iter_mut().enumerate() {
        let mip = layout.levels[slot.min(layout.levels.len() - 1)];
        *entry = [mip.offset, mip.width, mip.height, 0];
    }
    table
}

/// Source mip of every reduction dispatch, in recording order
pub fn reduction_sources(mip_count: u32) -> Vec<u32> {
    (0..mip_count.saturating_sub(1))
        .step_by(LEVELS_PER_DISPATCH as usize)
        .collect()
}

/// Workgroups covering the first level a dispatch writes
pub fn reduction_groups(layout: &PyramidLayout, source_level: u32) -> (u32, u32) {
    let target = layout.levels[source_level as usize + 1];
    (
        div_ceil(target.width, REDUCE_TILE),
        div_ceil(target.height, REDUCE_TILE),
    )
}

// ============================================================================
// GPU RESOURCES
// ============================================================================

pub fn create_depth_pyramid(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    params_layout: &wgpu::BindGroupLayout,
) -> DepthPyramid {
    let layout = create_pyramid_layout(width, height);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Depth Pyramid Buffer"),
        size: layout.texel_count as u64 * 2 * 4,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let reduction_passes = reduction_sources(layout.levels.len() as u32)
        .into_iter()
        .map(|source_level| {
            let params = PassParams {
                value: [source_level, 0, 0, 0],
            };
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Pyramid Reduction Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = create_buffer_bind_group(
                device,
                "Pyramid Reduction Params Bind Group",
                params_layout,
                &[(0, &params_buffer)],
            );
            ReductionPass {
                source_level,
                groups: reduction_groups(&layout, source_level),
                params_buffer,
                bind_group,
            }
        })
        .collect();

    log::info!(
        "[Depth Pyramid] {}x{} with {} mips, {} texels per channel",
        layout.width,
        layout.height,
        layout.levels.len(),
        layout.texel_count
    );

    DepthPyramid {
        layout,
        buffer,
        reduction_passes,
    }
}

/// Record one reduction dispatch
pub fn record_reduction<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    pipeline: &'a wgpu::ComputePipeline,
    frame_bind_group: &'a wgpu::BindGroup,
    reduction: &'a ReductionPass,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, frame_bind_group, &[]);
    pass.set_bind_group(1, &reduction.bind_group, &[]);
    pass.dispatch_workgroups(reduction.groups.0, reduction.groups.1, 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_count() {
        assert_eq!(compute_mip_count(1, 1), 1);
        assert_eq!(compute_mip_count(2, 1), 2);
        assert_eq!(compute_mip_count(1280, 720), 11);
        assert_eq!(compute_mip_count(2048, 2048), 12);
        assert_eq!(compute_mip_count(8192, 4096), MAX_MIP_LEVELS);
    }

    #[test]
    fn test_layout_offsets_are_packed() {
        let layout = create_pyramid_layout(5, 3);
        let dims: Vec<(u32, u32)> = layout.levels.iter().map(|m| (m.width, m.height)).collect();
        assert_eq!(dims, vec![(5, 3), (3, 2), (2, 1)]);
        assert_eq!(layout.levels[1].offset, 15);
        assert_eq!(layout.levels[2].offset, 21);
        assert_eq!(layout.texel_count, 23);
    }

    #[test]
    fn test_mip_table_repeats_last_level() {
        let layout = create_pyramid_layout(4, 4);
        let table = mip_table(&layout);
        let last = layout.levels[2];
        for entry in &table[3..] {
            assert_eq!(*entry, [last.offset, last.width, last.height, 0]);
        }
    }

    #[test]
    fn test_reduction_sources() {
        assert!(reduction_sources(1).is_empty());
        assert_eq!(reduction_sources(2), vec![0]);
        assert_eq!(reduction_sources(5), vec![0]);
        assert_eq!(reduction_sources(6), vec![0, 4]);
        assert_eq!(reduction_sources(12), vec![0, 4, 8]);
    }

    #[test]
    fn test_reduction_groups_cover_first_written_level() {
        let layout = create_pyramid_layout(1280, 720);
        assert_eq!(reduction_groups(&layout, 0), (80, 45));
        let (gx, gy) = reduction_groups(&layout, 4);
        assert!(gx * REDUCE_TILE >= layout.levels[5].width);
        assert!(gy * REDUCE_TILE >= layout.levels[5].height);
    }

    #[test]
    fn test_one_by_one_layout() {
        let layout = create_pyramid_layout(0, 0);
        assert_eq!(layout.levels.len(), 1);
        assert_eq!(layout.texel_count, 1);
        assert_eq!(mip_table(&layout)[11], [0, 1, 1, 0]);
    }
}

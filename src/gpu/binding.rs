//! Bind group layout helpers and dispatch sizing

use crate::constants::workgroup;

pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn storage_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind whole buffers to the given slots
pub fn create_buffer_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffers: &[(u32, &wgpu::Buffer)],
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry> = buffers
        .iter()
        .map(|&(binding, buffer)| wgpu::BindGroupEntry {
            binding,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

pub fn div_ceil(value: u32, divisor: u32) -> u32 {
    (value + divisor - 1) / divisor
}

/// Workgroup grid for `count` threads of a linear kernel. Counts beyond one
/// dimension's limit spill into y; kernels flatten with `linear_index`.
pub fn linear_dispatch(count: u32) -> (u32, u32) {
    let groups = div_ceil(count.max(1), workgroup::LINEAR);
    if groups <= workgroup::MAX_GROUPS_PER_DIMENSION {
        (groups, 1)
    } else {
        let rows = div_ceil(groups, workgroup::MAX_GROUPS_PER_DIMENSION);
        (div_ceil(groups, rows), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_dispatch_small() {
        assert_eq!(linear_dispatch(0), (1, 1));
        assert_eq!(linear_dispatch(256), (1, 1));
        assert_eq!(linear_dispatch(257), (2, 1));
    }

    #[test]
    fn test_linear_dispatch_spills_into_y() {
        let count = 40_000_000;
        let (x, y) = linear_dispatch(count);
        assert!(x <= workgroup::MAX_GROUPS_PER_DIMENSION);
        assert!(y > 1);
        assert!(x as u64 * y as u64 * workgroup::LINEAR as u64 >= count as u64);
    }
}

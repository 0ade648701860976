//! Hierarchical visibility tester operations
//!
//! The output arena holds one slot per input vertex, so it cannot overflow
//! as long as each face is emitted at most once.

use super::gpu_types::{HizVertex, DRAW_ARGS_RESET};
use super::hiz_data::HizOutput;
use crate::gpu::linear_dispatch;
use std::mem::size_of;
use wgpu::util::DeviceExt;

pub fn create_hiz_output(device: &wgpu::Device, triangle_count: u32) -> HizOutput {
    let vertex_capacity = triangle_count.max(1) * 3;

    let survivors = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Hi-Z Survivor Vertices"),
        size: vertex_capacity as u64 * size_of::<HizVertex>() as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
        mapped_at_creation: false,
    });

    let draw_args = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Hi-Z Draw Args"),
        contents: bytemuck::bytes_of(&DRAW_ARGS_RESET),
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::INDIRECT
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
    });

    log::info!(
        "[Hi-Z] Survivor arena: {} vertices ({} KB)",
        vertex_capacity,
        vertex_capacity as usize * size_of::<HizVertex>() / 1024
    );

    HizOutput {
        survivors,
        draw_args,
        vertex_capacity,
    }
}

/// Vertex layout of the survivor draw
pub fn survivor_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];
    wgpu::VertexBufferLayout {
        array_stride: size_of::<HizVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Naive Hi-Z, one thread per triangle
pub fn record_triangle_test<'a>(
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

/// Final draw of whatever the tester emitted
pub fn record_survivor_draw<'a>(
    pass: &mut wgpu::RenderPass<'a>,
    pipeline: &'a wgpu::RenderPipeline,
    bind_group: &'a wgpu::BindGroup,
    output: &'a HizOutput,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.set_vertex_buffer(0, output.survivors.slice(..));
    pass.draw_indirect(&output.draw_args, 0);
}

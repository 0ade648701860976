//! Scanline rasterizer operations
//!
//! Phase Init appends spans and builds the indirect arguments of Phase
//! Work on the GPU; the host never learns how many spans a frame produced.

use super::gpu_types::{GpuSpan, SpanCounter, SPAN_COUNTER_RESET};
use super::scanline_data::{PixelBuffers, SpanBuffers};
use crate::constants::scanline::{MAX_SPAN_CAPACITY, MIN_SPAN_CAPACITY, SPANS_PER_TRIANGLE_UNIT};
use crate::geometry::aabb::{aabb_diagonal_length, AABB};
use crate::gpu::linear_dispatch;
use std::mem::size_of;
use wgpu::util::DeviceExt;

/// Span budget from triangle count and bounds diagonal, clamped to the
/// device's storage binding size and the indirect dispatch limit
pub fn span_capacity(triangle_count: u32, bounds: &AABB, max_binding_size: u64) -> u32 {
    let diagonal = aabb_diagonal_length(bounds).max(1.0) as f64;
    let estimate = (SPANS_PER_TRIANGLE_UNIT as f64 * triangle_count as f64 / diagonal) as u64;
    let binding_cap = max_binding_size / size_of::<GpuSpan>() as u64;
    let upper = binding_cap.min(MAX_SPAN_CAPACITY);
    estimate.clamp(MIN_SPAN_CAPACITY.min(upper), upper) as u32
}

pub fn create_span_buffers(
    device: &wgpu::Device,
    triangle_count: u32,
    bounds: &AABB,
) -> SpanBuffers {
    let max_binding = device.limits().max_storage_buffer_binding_size as u64;
    let capacity = span_capacity(triangle_count, bounds, max_binding);

    let spans = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scanline Span Buffer"),
        size: capacity as u64 * size_of::<GpuSpan>() as u64,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    });

    let counter = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Scanline Span Counter"),
        contents: bytemuck::bytes_of(&SPAN_COUNTER_RESET),
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::INDIRECT
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
    });

    log::info!(
        "[Scanline] Span capacity {} ({} MiB)",
        capacity,
        capacity as u64 * size_of::<GpuSpan>() as u64 / (1024 * 1024)
    );

    SpanBuffers {
        spans,
        counter,
        capacity,
    }
}

pub fn create_pixel_buffers(device: &wgpu::Device, width: u32, height: u32) -> PixelBuffers {
    let size = width.max(1) as u64 * height.max(1) as u64 * 4;
    let storage = |label| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    };

    PixelBuffers {
        locks: storage("Scanline Pixel Locks"),
        color: storage("Scanline Color Buffer"),
    }
}

/// Spans beyond capacity that Phase Init had to drop
pub fn dropped_spans(counter: &SpanCounter, capacity: u32) -> u32 {
    counter.span_count.saturating_sub(capacity)
}

/// Phase Init, one thread per triangle
pub fn record_scanline_init<'a>(
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

/// Phase Work, one thread per stored span, sized by Phase Init
pub fn record_scanline_work<'a>(
    pass: &mut wgpu::ComputePass<'a>,
    pipeline: &'a wgpu::ComputePipeline,
    bind_group: &'a wgpu::BindGroup,
    spans: &'a SpanBuffers,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups_indirect(&spans.counter, 0);
}

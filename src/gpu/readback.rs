//! Blocking buffer and texture readback
//!
//! Used for statistics and tests only; the frame loop never reads back.

use crate::error::{ErrorContext, VisibilityError, VisibilityResult};

fn map_staging(device: &wgpu::Device, staging: &wgpu::Buffer, label: &str) -> VisibilityResult<()> {
    let slice = staging.slice(..);
    let (sender, receiver) = flume::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device.poll(wgpu::Maintain::Wait);

    // A closed channel means the callback was dropped unrun: the device is gone
    receiver
        .recv()
        .gpu_context(&format!("{} readback: map callback never ran", label))?
        .map_err(|e| VisibilityError::BufferMapping {
            buffer: label.to_string(),
            message: e.to_string(),
        })
}

/// Copy `size` bytes at `offset` of `source` back to the host as words
pub fn read_buffer_words(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    offset: u64,
    size: u64,
    label: &str,
) -> VisibilityResult<Vec<u32>> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, offset, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    map_staging(device, &staging, label)?;
    let words = {
        let data = staging.slice(..).get_mapped_range();
        bytemuck::cast_slice::<u8, u32>(&data).to_vec()
    };
    staging.unmap();
    Ok(words)
}

/// Read an RGBA8 texture, dropping row padding
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> VisibilityResult<Vec<[u8; 4]>> {
    let (width, height) = (texture.width(), texture.height());
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = (unpadded + align - 1) / align * align;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Texture Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(Some(encoder.finish()));

    map_staging(device, &staging, "render target")?;
    let pixels = {
        let data = staging.slice(..).get_mapped_range();
        data.chunks(padded as usize)
            .flat_map(|row| row[..unpadded as usize].chunks_exact(4))
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect()
    };
    staging.unmap();
    Ok(pixels)
}

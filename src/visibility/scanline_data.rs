//! Scanline rasterizer data structures - Pure DOP
//!
//! NO METHODS. Just data.

/// Span list and its counter, sized per mesh
pub struct SpanBuffers {
    /// `GpuSpan` records, `capacity` of them
    pub spans: wgpu::Buffer,

    /// `SpanCounter`: indirect dispatch arguments of Phase Work plus the raw count.
    /// The count keeps growing past capacity so overflow stays observable.
    pub counter: wgpu::Buffer,

    pub capacity: u32,
}

/// Per-pixel state of Phase Work, sized per screen
pub struct PixelBuffers {
    /// One lock word per pixel, cleared to unlocked every frame
    pub locks: wgpu::Buffer,

    /// Packed RGBA8 per pixel, blitted to the target at the end of the frame
    pub color: wgpu::Buffer,
}

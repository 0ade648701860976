//! Hierarchical visibility tester data - Pure DOP
//!
//! NO METHODS. Just data.

/// Visible-geometry output shared by both Hi-Z testers
pub struct HizOutput {
    /// `HizVertex` records, three per surviving triangle
    pub survivors: wgpu::Buffer,

    /// `DrawArgs`; testers bump `vertex_count`, the final pass draws indirectly from it
    pub draw_args: wgpu::Buffer,

    pub vertex_capacity: u32,
}
